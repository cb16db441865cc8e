//! Windowed access to a sheet's body rows.
//!
//! Only the rows inside the visible window plus a small overscan are turned
//! into view rows, so the cost of a frame depends on the terminal height and
//! not on how many rows the sheet has.

use std::ops::Range;

use super::parse::SheetGrid;

/// Terminal lines per row. Fixed so the window can be computed by division.
pub const ROW_HEIGHT: u16 = 1;

/// Scroll position within one sheet's body (rows after the header).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    /// First body row on screen.
    offset: usize,
    /// Highlighted body row.
    cursor: usize,
    /// First column on screen.
    col_offset: usize,
}

/// A body row handed to the renderer, keyed by its index in the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializedRow<'a> {
    /// Absolute row index (the header is row 0).
    pub index: usize,
    pub cells: &'a [String],
}

/// Body rows that fit into `height` terminal lines.
pub fn visible_rows(height: u16) -> usize {
    usize::from(height / ROW_HEIGHT).max(1)
}

impl Viewport {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn col_offset(&self) -> usize {
        self.col_offset
    }

    /// Body-row range to materialize for this frame.
    pub fn window(&self, total: usize, visible: usize, overscan: usize) -> Range<usize> {
        let start = self.offset.saturating_sub(overscan).min(total);
        let end = self
            .offset
            .saturating_add(visible)
            .saturating_add(overscan)
            .min(total);
        start..end
    }

    /// Move the cursor by `delta` rows and keep it on screen.
    pub fn scroll(&mut self, delta: isize, total: usize, visible: usize) {
        if total == 0 {
            *self = Self {
                col_offset: self.col_offset,
                ..Self::default()
            };
            return;
        }
        let target = if delta.is_negative() {
            self.cursor.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor.saturating_add(delta.unsigned_abs())
        };
        self.cursor = target.min(total - 1);
        self.follow_cursor(visible);
    }

    pub fn page_down(&mut self, total: usize, visible: usize) {
        self.scroll(visible as isize, total, visible);
    }

    pub fn page_up(&mut self, total: usize, visible: usize) {
        self.scroll(-(visible as isize), total, visible);
    }

    pub fn home(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }

    pub fn end(&mut self, total: usize, visible: usize) {
        self.cursor = total.saturating_sub(1);
        self.follow_cursor(visible);
    }

    pub fn scroll_columns(&mut self, delta: isize, width: usize) {
        let target = if delta.is_negative() {
            self.col_offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.col_offset.saturating_add(delta.unsigned_abs())
        };
        self.col_offset = target.min(width.saturating_sub(1));
    }

    fn follow_cursor(&mut self, visible: usize) {
        let visible = visible.max(1);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + visible {
            self.offset = self.cursor + 1 - visible;
        }
    }
}

/// Borrow the body rows of `window` from `grid`. Nothing outside it is touched.
pub fn materialize(grid: &SheetGrid, window: Range<usize>) -> Vec<MaterializedRow<'_>> {
    window
        .filter_map(|body_idx| {
            let index = body_idx + 1;
            grid.rows.get(index).map(|cells| MaterializedRow {
                index,
                cells: cells.as_slice(),
            })
        })
        .collect()
}
