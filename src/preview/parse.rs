//! Workbook bytes to an immutable in-memory grid.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{Duration, NaiveDate};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    #[error("cannot open workbook: {0}")]
    Open(String),
    #[error("cannot read sheet '{sheet}': {message}")]
    Sheet { sheet: String, message: String },
    #[error("workbook has no sheets")]
    NoSheets,
}

/// One sheet's cell text, row by row. Rows may be of different lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl SheetGrid {
    /// Row 0, shown pinned above the body. It stays part of `rows`.
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rows below the header.
    pub fn body_len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Widest row, for horizontal scrolling bounds.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Every sheet of a workbook, in workbook order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookPreview {
    sheets: Vec<SheetGrid>,
}

impl WorkbookPreview {
    pub fn new(sheets: Vec<SheetGrid>) -> Result<Self, PreviewError> {
        if sheets.is_empty() {
            return Err(PreviewError::NoSheets);
        }
        Ok(Self { sheets })
    }

    pub fn sheets(&self) -> &[SheetGrid] {
        &self.sheets
    }
}

/// Decode an `.xlsx`/`.xls` container into a [`WorkbookPreview`].
pub fn parse(bytes: &[u8]) -> Result<WorkbookPreview, PreviewError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| PreviewError::Open(e.to_string()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| PreviewError::Sheet {
                sheet: name.clone(),
                message: e.to_string(),
            })?;

        // Keep cells at their sheet positions even when data starts below A1.
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells: Vec<String> = vec![String::new(); start_col as usize];
            cells.extend(row.iter().map(cell_text));
            while cells.last().is_some_and(String::is_empty) {
                cells.pop();
            }
            rows.push(cells);
        }
        tracing::debug!(sheet = %name, rows = rows.len(), "sheet parsed");
        sheets.push(SheetGrid { name, rows });
    }
    WorkbookPreview::new(sheets)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => serial_to_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{e:?}"),
    }
}

/// Excel 1900-system serial to `YYYY-MM-DD[ HH:MM:SS]`.
fn serial_to_text(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return serial.to_string();
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    let Some(at) = epoch.checked_add_signed(Duration::milliseconds(millis)) else {
        return serial.to_string();
    };
    if serial.fract().abs() < 1e-9 {
        at.format("%Y-%m-%d").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
