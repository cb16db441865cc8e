//! Drawing for the main screen, the preview and the modal popups.

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::{
    events::{Pane, Screen},
    input, layout,
    preview::view::draw_preview,
    session::{Confirmation, NoticeLevel, PreviewSlot},
    shortcuts::{Shortcuts, format_keys},
    status::Indicator,
};

use super::App;

const ACCENT: Color = Color::Rgb(255, 140, 0);

/// Draw the whole frame.
pub fn draw(f: &mut Frame, app: &App) {
    // The screen underneath.
    match app.screen() {
        Screen::Main => draw_main(f, app),
        Screen::Preview => draw_preview_screen(f, app),
    }

    // Popups go on top of either screen.
    if let Some(confirm) = app.session.confirmation() {
        draw_confirmation(f, confirm, &app.shortcuts);
    }
    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

fn draw_main(f: &mut Frame, app: &App) {
    // Split into upload panel, body, help and status.
    let main_layout = layout::create_main_layout(f.area(), app.ui.show_log);
    let body_layout = layout::create_body_layout(main_layout.body);

    // Tenant, category and selection.
    f.render_widget(build_upload_panel(app), main_layout.upload_panel);

    // Uploaded files for the current (GSTIN, category).
    let files = app.session.files();
    let files_title = match files.key() {
        Some(key) => format!("UPLOADED FILES ({key})"),
        None => "UPLOADED FILES".to_string(),
    };
    draw_list(
        f,
        body_layout.files,
        list_title(files_title, files.is_loading()),
        files.entries().iter().map(|a| a.name.as_str()),
        app.ui.file_selected,
        app.ui.pane == Pane::Files,
    );

    // Generated reports for the GSTIN.
    let reports = app.session.reports();
    draw_list(
        f,
        body_layout.reports,
        list_title("REPORTS".to_string(), reports.is_loading()),
        reports.entries().iter().map(|a| a.name.as_str()),
        app.ui.report_selected,
        app.ui.pane == Pane::Reports,
    );

    // The notice log replaces the help text while it is open.
    if app.ui.show_log {
        f.render_widget(build_notice_log(app, main_layout.help_bar.height), main_layout.help_bar);
    } else {
        let help = Paragraph::new(main_help(&app.shortcuts))
            .block(Block::default().borders(Borders::ALL).title("HELP"))
            .wrap(Wrap { trim: true });
        f.render_widget(help, main_layout.help_bar);
    }

    // Status and the newest notice.
    f.render_widget(build_status_bar(app), main_layout.status_bar);
}

fn list_title(title: String, loading: bool) -> String {
    if loading {
        format!("{title} loading...")
    } else {
        title
    }
}

/// One bordered list with the selection highlighted while it has focus.
fn draw_list<'a>(
    f: &mut Frame,
    area: Rect,
    title: String,
    names: impl Iterator<Item = &'a str>,
    selected: usize,
    focused: bool,
) {
    // Numbered rows.
    let rows: Vec<Row> = names
        .enumerate()
        .map(|(i, name)| Row::new(vec![format!("{}", i + 1), name.to_string()]))
        .collect();
    let empty = rows.is_empty();

    // The focused list gets the accent border.
    let border = if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default()
    };
    let table = Table::new(rows, [Constraint::Length(4), Constraint::Min(10)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        )
        .row_highlight_style(
            Style::default()
                .bg(ACCENT)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );

    // Only the focused list shows its selection.
    let mut state = TableState::default();
    if focused && !empty {
        state.select(Some(selected));
    }
    f.render_stateful_widget(table, area, &mut state);
}

fn build_upload_panel(app: &App) -> Paragraph<'static> {
    let tenant = app.session.tenant();
    let category = tenant.category;

    // GSTIN in green when valid, red when not.
    let gstin_line = match tenant.gstin() {
        Ok(g) => Line::from(vec![
            Span::raw("GSTIN:    "),
            Span::styled(g.to_string(), Style::default().fg(Color::Green)),
        ]),
        Err(_) if tenant.gstin_input.trim().is_empty() => Line::from(vec![
            Span::raw("GSTIN:    "),
            Span::styled("(not set)", Style::default().fg(Color::Gray)),
        ]),
        Err(_) => Line::from(vec![
            Span::raw("GSTIN:    "),
            Span::styled(tenant.gstin_input.clone(), Style::default().fg(Color::Red)),
            Span::styled("  invalid format", Style::default().fg(Color::Red)),
        ]),
    };

    // Pending selection summary.
    let pending = app.session.pending();
    let selection = if pending.is_empty() {
        "none".to_string()
    } else {
        let names: Vec<&str> = pending.files().iter().map(|f| f.name.as_str()).collect();
        format!(
            "{} file(s), {} KB: {}",
            pending.len(),
            pending.total_size().div_ceil(1024),
            names.join(", ")
        )
    };

    let lines = vec![
        gstin_line,
        Line::from(format!(
            "Category: < {} >  {}",
            category.tag(),
            category.description()
        )),
        Line::from(format!("Accepts:  {}", category.format_rule().accept_hint())),
        Line::from(format!("Selected: {selection}")),
        Line::from(format!(
            "Reports:  {}",
            app.session
                .reports_location()
                .unwrap_or_else(|| "-".to_string())
        )),
    ];

    // Title shows which triggers are live.
    let ready = |ok: bool| if ok { "ready" } else { "-" };
    let title = format!(
        "UPLOAD  upload: {}  generate: {}",
        ready(app.session.can_upload()),
        ready(app.session.can_generate())
    );
    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title))
}

fn build_notice_log(app: &App, height: u16) -> Paragraph<'static> {
    // Newest notices that fit inside the border.
    let shown = usize::from(height.saturating_sub(2));
    let notices = app.session.notices();
    let lines: Vec<Line> = notices
        .iter()
        .skip(notices.len().saturating_sub(shown))
        .map(|n| {
            let mut text = format!("{} {}", n.at.format("%H:%M:%S"), n.title);
            if let Some(detail) = &n.detail {
                text.push_str(" - ");
                text.push_str(detail);
            }
            Line::styled(text, Style::default().fg(level_color(n.level)))
        })
        .collect();
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("LOG"))
        .wrap(Wrap { trim: true })
}

fn build_status_bar(app: &App) -> Paragraph<'static> {
    // Indicator derived from the status tag.
    let status = app.session.status();
    let (marker, color) = match status.indicator() {
        Indicator::Info => ("i", Color::Gray),
        Indicator::Busy => ("…", Color::Yellow),
        Indicator::Success => ("✓", Color::Green),
        Indicator::Failure => ("✗", Color::Red),
    };

    let mut spans = vec![Span::styled(
        format!("{marker} {}", status.label()),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    // Then the toast, if one is up.
    if let Some(n) = app.session.toast() {
        let mut text = format!(" | {} {}", n.at.format("%H:%M:%S"), n.title);
        if let Some(detail) = &n.detail {
            text.push(' ');
            text.push_str(detail);
        }
        spans.push(Span::styled(text, Style::default().fg(level_color(n.level))));
    }

    Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true })
}

fn level_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::White,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    }
}

fn draw_preview_screen(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),    // preview
            Constraint::Length(3), // help
            Constraint::Length(3), // status
        ])
        .split(f.area());

    // Table once parsed, a placeholder while loading.
    match app.session.preview() {
        PreviewSlot::Open(state) => {
            draw_preview(f, chunks[0], state, app.cfg.preview.overscan);
        }
        PreviewSlot::Loading(name) => {
            let loading = Paragraph::new(format!("Loading {name}..."))
                .block(Block::default().borders(Borders::ALL).title("PREVIEW"));
            f.render_widget(loading, chunks[0]);
        }
        PreviewSlot::Closed => {}
    }

    // Key help from the active bindings.
    let sc = &app.shortcuts.preview;
    let help = format!(
        "{}: close | {}/{}: row | {}/{}: page | {}/{}: top/bottom | {}/{}: column | {}/{}: sheet",
        format_keys(&sc.close),
        format_keys(&sc.up),
        format_keys(&sc.down),
        format_keys(&sc.page_up),
        format_keys(&sc.page_down),
        format_keys(&sc.top),
        format_keys(&sc.bottom),
        format_keys(&sc.left),
        format_keys(&sc.right),
        format_keys(&sc.prev_sheet),
        format_keys(&sc.next_sheet),
    );
    f.render_widget(
        Paragraph::new(help)
            .block(Block::default().borders(Borders::ALL).title("HELP"))
            .wrap(Wrap { trim: true }),
        chunks[1],
    );
    f.render_widget(build_status_bar(app), chunks[2]);
}

fn draw_confirmation(f: &mut Frame, confirm: &Confirmation, shortcuts: &Shortcuts) {
    // Clear the area under the popup.
    let area = layout::centered_popup(f.area(), 60, 9);
    f.render_widget(Clear, area);

    // Message, then the two buttons with their keys.

    let (dismiss, accept) = confirm.buttons();
    let lines = vec![
        Line::from(confirm.message()),
        Line::default(),
        Line::from(vec![
            Span::styled(
                format!("[{}] {dismiss}", format_keys(&shortcuts.confirm.cancel)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("    "),
            Span::styled(
                format!("[{}] {accept}", format_keys(&shortcuts.confirm.accept)),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];
    let dialog = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .title(confirm.title()),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(dialog, area);
}

fn main_help(sc: &Shortcuts) -> String {
    let m = &sc.main;
    format!(
        "{}: GSTIN | {}/{}: category | {}: add files | {}: clear | {}: upload | {}: generate | \
         {}: refresh | {}: pane | {}: delete | {}: preview | {}: log | {}: quit",
        format_keys(&m.gstin),
        format_keys(&m.prev_category),
        format_keys(&m.next_category),
        format_keys(&m.add_files),
        format_keys(&m.clear_files),
        format_keys(&m.upload),
        format_keys(&m.generate),
        format_keys(&m.refresh),
        format_keys(&m.switch_pane),
        format_keys(&m.delete),
        format_keys(&m.preview),
        format_keys(&m.toggle_log),
        format_keys(&m.quit),
    )
}
