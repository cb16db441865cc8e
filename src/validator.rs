//! File-set acceptance rules for the selected return category.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::tenant::{FormatRule, ReturnCategory};

pub const PDF_MIME: &str = "application/pdf";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
const OCTET_MIME: &str = "application/octet-stream";

/// A file the user picked but has not uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Where the bytes are read from at upload time.
    pub path: PathBuf,
    /// File name sent to the backend.
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl CandidateFile {
    /// Stat a local file and derive its name and content type.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            mime_type: mime_for_name(&name).to_string(),
            name,
            size: meta.len(),
        })
    }
}

/// Content type inferred from the file extension.
pub fn mime_for_name(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        PDF_MIME
    } else if lower.ends_with(".xlsx") {
        XLSX_MIME
    } else if lower.ends_with(".xls") {
        XLS_MIME
    } else {
        OCTET_MIME
    }
}

fn is_document(file: &CandidateFile) -> bool {
    file.mime_type == PDF_MIME
}

fn is_spreadsheet(file: &CandidateFile) -> bool {
    file.name.to_ascii_lowercase().ends_with(".xlsx") && file.mime_type == XLSX_MIME
}

fn is_legacy_spreadsheet(file: &CandidateFile) -> bool {
    file.name.to_ascii_lowercase().ends_with(".xls")
}

/// The one predicate every rule is evaluated through.
pub fn accepts(rule: FormatRule, file: &CandidateFile) -> bool {
    match rule {
        FormatRule::DocumentOnly => is_document(file),
        FormatRule::SpreadsheetOnly => is_spreadsheet(file),
        FormatRule::SpreadsheetOrLegacySpreadsheet => {
            is_spreadsheet(file) || is_legacy_spreadsheet(file)
        }
    }
}

/// A rejected candidate set. The whole set is refused, never a subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub category: ReturnCategory,
    /// Names of the files that failed the rule, in selection order.
    pub offending: Vec<String>,
}

impl Rejection {
    /// Category-specific headline shown to the user.
    pub fn title(&self) -> String {
        match self.category.format_rule() {
            FormatRule::DocumentOnly => {
                format!("Only PDF files are allowed for {}", self.category)
            }
            FormatRule::SpreadsheetOnly => {
                format!("Only Excel (.xlsx) files are allowed for {}", self.category)
            }
            FormatRule::SpreadsheetOrLegacySpreadsheet => format!(
                "Only Excel (.xlsx or .xls) files are allowed for {}",
                self.category
            ),
        }
    }

    pub fn detail(&self) -> String {
        format!("Not accepted: {}", self.offending.join(", "))
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

impl std::error::Error for Rejection {}

/// Files chosen for the current category, all satisfying its rule.
///
/// Only [`validate`] builds a non-empty selection, so holding one means the
/// invariant already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSelection {
    files: Vec<CandidateFile>,
}

impl PendingSelection {
    pub fn files(&self) -> &[CandidateFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Accept all of `files` for `category`, or reject all of them.
pub fn validate(
    category: ReturnCategory,
    files: Vec<CandidateFile>,
) -> Result<PendingSelection, Rejection> {
    let rule = category.format_rule();
    let offending: Vec<String> = files
        .iter()
        .filter(|f| !accepts(rule, f))
        .map(|f| f.name.clone())
        .collect();
    if !offending.is_empty() {
        tracing::warn!(
            category = %category,
            rejected = offending.len(),
            total = files.len(),
            "file selection rejected"
        );
        return Err(Rejection {
            category,
            offending,
        });
    }
    Ok(PendingSelection { files })
}
