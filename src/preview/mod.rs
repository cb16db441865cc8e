//! Spreadsheet preview: parse once, then page through sheets as tabs.

/// Workbook decoding.
pub mod parse;
/// ratatui drawing of the visible window.
pub mod view;
/// Row window bookkeeping.
pub mod viewport;

use std::cell::Cell;

pub use parse::{PreviewError, SheetGrid, WorkbookPreview};
use viewport::Viewport;

/// An open preview of one generated report.
#[derive(Debug)]
pub struct PreviewState {
    /// Report name shown in the title.
    pub title: String,
    workbook: WorkbookPreview,
    active: usize,
    /// One scroll position per sheet, so switching tabs keeps each place.
    viewports: Vec<Viewport>,
    /// Body rows that fitted on screen in the last frame.
    page_rows: Cell<usize>,
}

impl PreviewState {
    pub fn open(title: String, workbook: WorkbookPreview) -> Self {
        let viewports = vec![Viewport::default(); workbook.sheets().len()];
        Self {
            title,
            workbook,
            active: 0,
            viewports,
            page_rows: Cell::new(1),
        }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.workbook.sheets().iter().map(|s| s.name.as_str()).collect()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_sheet(&self) -> &SheetGrid {
        &self.workbook.sheets()[self.active]
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewports[self.active]
    }

    pub fn next_sheet(&mut self) {
        self.active = (self.active + 1) % self.viewports.len();
    }

    pub fn prev_sheet(&mut self) {
        let n = self.viewports.len();
        self.active = (self.active + n - 1) % n;
    }

    pub fn page_rows(&self) -> usize {
        self.page_rows.get()
    }

    /// Called by the renderer with the height it actually had.
    pub fn set_page_rows(&self, rows: usize) {
        self.page_rows.set(rows.max(1));
    }

    pub fn scroll(&mut self, delta: isize) {
        let (total, page) = (self.active_sheet().body_len(), self.page_rows());
        self.viewports[self.active].scroll(delta, total, page);
    }

    pub fn page_down(&mut self) {
        let (total, page) = (self.active_sheet().body_len(), self.page_rows());
        self.viewports[self.active].page_down(total, page);
    }

    pub fn page_up(&mut self) {
        let (total, page) = (self.active_sheet().body_len(), self.page_rows());
        self.viewports[self.active].page_up(total, page);
    }

    pub fn home(&mut self) {
        self.viewports[self.active].home();
    }

    pub fn end(&mut self) {
        let (total, page) = (self.active_sheet().body_len(), self.page_rows());
        self.viewports[self.active].end(total, page);
    }

    pub fn scroll_columns(&mut self, delta: isize) {
        let width = self.active_sheet().width();
        self.viewports[self.active].scroll_columns(delta, width);
    }
}
