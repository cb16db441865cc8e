//! Config model and persistence helpers.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::tenant::ReturnCategory;

/// Environment variable that overrides `backend.base_url`.
pub const BACKEND_URL_ENV: &str = "GST_DESK_BACKEND_URL";

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the document-processing service lives.
    pub backend: BackendCfg,
    /// Values the session starts with.
    pub session: SessionCfg,
    /// Spreadsheet preview tuning.
    pub preview: PreviewCfg,
    pub logging: LoggingCfg,
}

/// Backend endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendCfg {
    /// Base URL; endpoints are appended as `/<name>/`.
    pub base_url: String,
    /// Per-request timeout. Generation can take a while.
    pub timeout_secs: u64,
}

/// Initial tenant context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    /// Category selected at startup.
    pub default_category: ReturnCategory,
    /// GSTIN pre-filled at startup, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
}

/// Preview rendering knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewCfg {
    /// Rows materialized above and below the visible window.
    pub overscan: usize,
}

/// Log file location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingCfg {
    pub file: String,
}

impl Default for BackendCfg {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout_secs: 120,
        }
    }
}

impl Default for PreviewCfg {
    fn default() -> Self {
        Self { overscan: 4 }
    }
}

impl Default for LoggingCfg {
    fn default() -> Self {
        Self {
            file: "gst_desk.log".into(),
        }
    }
}

impl BackendCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&s).with_context(|| format!("failed to parse {}", path.display()))
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }

    /// Apply an environment override of the backend URL, if set and non-empty.
    pub fn with_env_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            tracing::info!(%url, "backend url overridden from {BACKEND_URL_ENV}");
            self.backend.base_url = url;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_or_default(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert_eq!(cfg.backend.timeout(), Duration::from_secs(120));
        assert!(path.exists());
        assert_eq!(Config::load_or_default(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[session]\ndefault_category = \"EWB-IN\"\ngstin = \"22abcde1234f1z5\"\n",
        )
        .unwrap();
        let cfg = Config::load_or_default(&path).unwrap();
        assert_eq!(cfg.session.default_category, ReturnCategory::EwbIn);
        assert_eq!(cfg.session.gstin.as_deref(), Some("22abcde1234f1z5"));
        assert_eq!(cfg.preview.overscan, 4);
        assert_eq!(cfg.logging.file, "gst_desk.log");
    }

    #[test]
    fn broken_file_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[backend\n").unwrap();
        let err = Config::load_or_default(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn env_override_replaces_base_url() {
        let cfg = Config::default().with_env_override(Some(" http://10.0.0.5:9000 ".into()));
        assert_eq!(cfg.backend.base_url, "http://10.0.0.5:9000");
        let cfg = Config::default().with_env_override(Some("  ".into()));
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
    }
}
