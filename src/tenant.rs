//! Tenant identity (GSTIN) and the return-type categories it is managed under.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 2 digits, 5 letters, 4 digits, 1 letter, 1 alphanumeric, literal Z, 1 alphanumeric.
static GSTIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][A-Z0-9]Z[A-Z0-9]$").expect("static GSTIN pattern")
});

/// Why a raw GSTIN string cannot be used for a mutating action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GstinError {
    #[error("GSTIN is empty")]
    Empty,
    #[error("GSTIN {0:?} does not match the 15-character format")]
    Malformed(String),
}

/// A normalized GSTIN that passed the format check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gstin(String);

impl Gstin {
    /// Trim and upper-case `raw`, then check it against the fixed pattern.
    pub fn parse(raw: &str) -> Result<Self, GstinError> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return Err(GstinError::Empty);
        }
        if !GSTIN_PATTERN.is_match(&normalized) {
            return Err(GstinError::Malformed(normalized));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Gstin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalization applied to everything typed into the GSTIN field.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Which file family a category accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRule {
    /// Scanned/paginated returns: PDF only.
    DocumentOnly,
    /// Structured returns: `.xlsx` only.
    SpreadsheetOnly,
    /// Waybills: `.xlsx` or the legacy `.xls`.
    SpreadsheetOrLegacySpreadsheet,
}

impl FormatRule {
    /// Extensions shown next to the file prompt.
    pub fn accept_hint(self) -> &'static str {
        match self {
            FormatRule::DocumentOnly => ".pdf",
            FormatRule::SpreadsheetOnly => ".xlsx",
            FormatRule::SpreadsheetOrLegacySpreadsheet => ".xlsx, .xls",
        }
    }
}

/// Closed set of return-type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnCategory {
    #[serde(rename = "GSTR-1")]
    Gstr1,
    #[serde(rename = "GSTR-2A")]
    Gstr2a,
    #[serde(rename = "GSTR-3B")]
    Gstr3b,
    #[serde(rename = "GSTR-9")]
    Gstr9,
    #[serde(rename = "EWB-IN")]
    EwbIn,
    #[serde(rename = "EWB-OUT")]
    EwbOut,
    #[serde(rename = "RECON")]
    Recon,
}

impl ReturnCategory {
    /// Display/selection order.
    pub const ALL: [ReturnCategory; 7] = [
        ReturnCategory::Gstr1,
        ReturnCategory::Gstr2a,
        ReturnCategory::Gstr3b,
        ReturnCategory::Gstr9,
        ReturnCategory::EwbIn,
        ReturnCategory::EwbOut,
        ReturnCategory::Recon,
    ];

    /// Tag sent to the backend as `return_type`.
    pub fn tag(self) -> &'static str {
        match self {
            ReturnCategory::Gstr1 => "GSTR-1",
            ReturnCategory::Gstr2a => "GSTR-2A",
            ReturnCategory::Gstr3b => "GSTR-3B",
            ReturnCategory::Gstr9 => "GSTR-9",
            ReturnCategory::EwbIn => "EWB-IN",
            ReturnCategory::EwbOut => "EWB-OUT",
            ReturnCategory::Recon => "RECON",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ReturnCategory::Gstr1 => "Outward supplies return",
            ReturnCategory::Gstr2a => "Auto-drafted inward supplies",
            ReturnCategory::Gstr3b => "Summary return",
            ReturnCategory::Gstr9 => "Annual return",
            ReturnCategory::EwbIn => "Inbound e-way bills",
            ReturnCategory::EwbOut => "Outbound e-way bills",
            ReturnCategory::Recon => "Comparison summary",
        }
    }

    /// The single mapping from category to accepted file family.
    pub fn format_rule(self) -> FormatRule {
        match self {
            ReturnCategory::Gstr3b | ReturnCategory::Gstr9 => FormatRule::DocumentOnly,
            ReturnCategory::EwbIn | ReturnCategory::EwbOut => {
                FormatRule::SpreadsheetOrLegacySpreadsheet
            }
            ReturnCategory::Gstr1 | ReturnCategory::Gstr2a | ReturnCategory::Recon => {
                FormatRule::SpreadsheetOnly
            }
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl Default for ReturnCategory {
    fn default() -> Self {
        ReturnCategory::Gstr1
    }
}

impl fmt::Display for ReturnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The (tenant, category) pair the session is currently keyed on.
///
/// `gstin_input` keeps whatever the user typed (already upper-cased); it is
/// only turned into a [`Gstin`] when an action needs a valid identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantContext {
    pub gstin_input: String,
    pub category: ReturnCategory,
}

impl TenantContext {
    pub fn new(gstin_input: &str, category: ReturnCategory) -> Self {
        Self {
            gstin_input: gstin_input.to_uppercase(),
            category,
        }
    }

    pub fn gstin(&self) -> Result<Gstin, GstinError> {
        Gstin::parse(&self.gstin_input)
    }

    /// Registry key for the current pair, if the GSTIN is usable.
    pub fn registry_key(&self) -> Option<RegistryKey> {
        self.gstin().ok().map(|gstin| RegistryKey {
            gstin,
            category: self.category,
        })
    }
}

/// Identity under which uploaded artifacts are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryKey {
    pub gstin: Gstin,
    pub category: ReturnCategory,
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.gstin, self.category)
    }
}
