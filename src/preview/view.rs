//! Draws the tab strip and the visible window of the active sheet.

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs},
};

use super::{
    PreviewState,
    viewport::{ROW_HEIGHT, materialize, visible_rows},
};

/// Minimum column width in terminal cells.
const COL_WIDTH: u16 = 16;

/// Render the preview into `area`; returns how many body rows were built.
pub fn draw_preview(f: &mut Frame, area: Rect, state: &PreviewState, overscan: usize) -> usize {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // tabs
            Constraint::Min(4),    // grid
            Constraint::Length(1), // position
        ])
        .split(area);

    let tabs = Tabs::new(state.sheet_names())
        .select(state.active_index())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("PREVIEW: {}", state.title)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(255, 140, 0))
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, chunks[0]);

    let sheet = state.active_sheet();
    let vp = state.viewport();
    let total = sheet.body_len();

    // Borders take two lines, the pinned header one more.
    let body_height = chunks[1].height.saturating_sub(3);
    let visible = visible_rows(body_height);
    state.set_page_rows(visible);

    let window = vp.window(total, visible, overscan);
    let rows = materialize(sheet, window.clone());
    let built = rows.len();

    let columns = usize::from(chunks[1].width.saturating_sub(2) / COL_WIDTH).max(1);
    let col_start = vp.col_offset();
    let visible_cells = |cells: &[String]| -> Vec<Cell<'static>> {
        cells
            .iter()
            .skip(col_start)
            .take(columns)
            .map(|c| Cell::from(c.clone()))
            .collect()
    };

    let header = Row::new(visible_cells(sheet.header()))
        .style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .height(ROW_HEIGHT);
    let body = rows.iter().map(|r| {
        let row = Row::new(visible_cells(r.cells)).height(ROW_HEIGHT);
        if r.index % 2 == 0 {
            row.style(Style::default().bg(Color::Rgb(30, 30, 30)))
        } else {
            row
        }
    });

    let widths = vec![Constraint::Min(COL_WIDTH); columns];
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(sheet.name.clone()))
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(255, 140, 0))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );

    // Offsets inside the materialized slice, not the whole sheet.
    let mut table_state = TableState::default().with_offset(vp.offset() - window.start);
    if total > 0 {
        table_state = table_state.with_selected(Some(vp.cursor() - window.start));
    }
    f.render_stateful_widget(table, chunks[1], &mut table_state);

    let position = if total == 0 {
        "empty sheet".to_string()
    } else {
        format!(
            "row {}/{} | col {}+ of {} | sheet {}/{}",
            vp.cursor() + 1,
            total,
            col_start + 1,
            sheet.width(),
            state.active_index() + 1,
            state.sheet_names().len()
        )
    };
    f.render_widget(
        Paragraph::new(position).style(Style::default().fg(Color::Gray)),
        chunks[2],
    );

    built
}
