//! Failure taxonomy for backend calls.

use thiserror::Error;

/// Why a backend call did not produce a usable result.
///
/// Kept `Clone` so it can ride inside worker events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request never completed (connection refused, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),
    /// The backend answered with a non-2xx status.
    #[error("server error: {status} {body}")]
    Rejected { status: u16, body: String },
    /// 2xx, but the payload was not what the endpoint promises.
    #[error("unexpected response: {0}")]
    Decode(String),
    /// A selected file could not be read before the transfer.
    #[error("cannot read {path}: {message}")]
    LocalFile { path: String, message: String },
}

impl BackendError {
    /// Short tag used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Transport(_) => "transport",
            BackendError::Rejected { .. } => "rejected",
            BackendError::Decode(_) => "decode",
            BackendError::LocalFile { .. } => "local_file",
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}
