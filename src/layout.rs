//! Layout helpers for the main screen.

use ratatui::prelude::*;

/// The main screen's horizontal bands.
pub struct MainLayout {
    /// GSTIN, category and pending selection.
    pub upload_panel: Rect,
    /// Uploaded files and reports.
    pub body: Rect,
    /// Help bar, or the notice log when toggled.
    pub help_bar: Rect,
    pub status_bar: Rect,
}

/// The body's two lists side by side.
pub struct BodyLayout {
    pub files: Rect,
    pub reports: Rect,
}

/// Split the screen into upload panel, body, help and status.
pub fn create_main_layout(area: Rect, log_open: bool) -> MainLayout {
    let help_height = if log_open { 10 } else { 3 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),           // upload panel
            Constraint::Min(5),              // lists
            Constraint::Length(help_height), // help / log
            Constraint::Length(3),           // status
        ])
        .split(area);

    MainLayout {
        upload_panel: chunks[0],
        body: chunks[1],
        help_bar: chunks[2],
        status_bar: chunks[3],
    }
}

/// Split the body into uploaded files (55%) and reports (45%).
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    BodyLayout {
        files: chunks[0],
        reports: chunks[1],
    }
}

/// A rectangle of `width_percent` x `height` centered in `area`.
pub fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
