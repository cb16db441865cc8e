//! UI state for screen switching and list selection.

/// Which screen the TUI is showing; derived from the preview slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Upload panel with the uploaded-files and reports lists.
    Main,
    /// Spreadsheet preview of one report.
    Preview,
}

/// Which list on the main screen receives navigation keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Files,
    Reports,
}

impl Pane {
    pub fn toggle(self) -> Self {
        match self {
            Pane::Files => Pane::Reports,
            Pane::Reports => Pane::Files,
        }
    }
}

/// UI-only state shared with the renderer.
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub pane: Pane,
    /// Selected row in the uploaded-files list.
    pub file_selected: usize,
    /// Selected row in the reports list.
    pub report_selected: usize,
    /// Whether the notice log replaces the help bar.
    pub show_log: bool,
}

impl UiState {
    /// Keep both selections inside their lists after a listing changed.
    pub fn clamp(&mut self, files: usize, reports: usize) {
        self.file_selected = self.file_selected.min(files.saturating_sub(1));
        self.report_selected = self.report_selected.min(reports.saturating_sub(1));
    }

    /// Move the active pane's selection by one row.
    pub fn step(&mut self, down: bool, files: usize, reports: usize) {
        let (sel, len) = match self.pane {
            Pane::Files => (&mut self.file_selected, files),
            Pane::Reports => (&mut self.report_selected, reports),
        };
        if down {
            if *sel + 1 < len {
                *sel += 1;
            }
        } else if *sel > 0 {
            *sel -= 1;
        }
    }
}
