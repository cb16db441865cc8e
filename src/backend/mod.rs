//! Client side of the document-processing backend.

/// reqwest implementation of [`Backend`].
pub mod client;
/// Error taxonomy shared by every call.
pub mod error;
#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::tenant::{Gstin, RegistryKey};

pub use client::HttpBackend;
pub use error::BackendError;

/// One file's bytes ready for the multipart upload.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Every backend operation the client consumes. Tenant and category are
/// always passed explicitly.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Store `parts` under `key` in one request; returns the stored paths.
    async fn upload(&self, key: &RegistryKey, parts: Vec<UploadPart>)
    -> Result<Vec<String>, BackendError>;

    /// Names of the files already uploaded under `key`.
    async fn list_files(&self, key: &RegistryKey) -> Result<Vec<String>, BackendError>;

    async fn delete_file(&self, key: &RegistryKey, name: &str) -> Result<(), BackendError>;

    /// Whether a generated report for `gstin` is held open elsewhere.
    async fn check_open_reports(&self, gstin: &Gstin) -> Result<bool, BackendError>;

    /// Synthesize the reports for `gstin`; returns their names.
    async fn generate(&self, gstin: &Gstin) -> Result<Vec<String>, BackendError>;

    async fn list_reports(&self, gstin: &Gstin) -> Result<Vec<String>, BackendError>;

    /// Raw bytes of one generated report.
    async fn fetch_report(&self, gstin: &Gstin, name: &str) -> Result<Vec<u8>, BackendError>;
}
