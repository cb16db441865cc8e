//! Background worker executing backend calls for the UI.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    backend::{Backend, BackendError, UploadPart},
    preview::{self, PreviewError, WorkbookPreview},
    registry::ListingSeq,
    status::OpId,
    tenant::{Gstin, RegistryKey},
    validator::CandidateFile,
};

/// Commands sent from the UI to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCmd {
    /// Transfer the pending selection in one request.
    Upload {
        op: OpId,
        key: RegistryKey,
        files: Vec<CandidateFile>,
    },
    /// Re-fetch the uploaded-file listing.
    ListFiles { key: RegistryKey, seq: ListingSeq },
    DeleteFile { key: RegistryKey, name: String },
    /// Ask whether any generated report is held open.
    CheckConflict { op: OpId, gstin: Gstin },
    Generate { op: OpId, gstin: Gstin },
    ListReports { gstin: Gstin, seq: ListingSeq },
    /// Download and parse a report for the preview screen.
    FetchPreview { gstin: Gstin, name: String },
}

/// Why a preview could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewLoadError {
    #[error(transparent)]
    Fetch(#[from] BackendError),
    #[error(transparent)]
    Parse(#[from] PreviewError),
    #[error("preview task aborted: {0}")]
    Aborted(String),
}

/// Events emitted by the worker for UI updates.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    UploadFinished {
        op: OpId,
        key: RegistryKey,
        result: Result<Vec<String>, BackendError>,
    },
    FilesListed {
        key: RegistryKey,
        seq: ListingSeq,
        result: Result<Vec<String>, BackendError>,
    },
    FileDeleted {
        key: RegistryKey,
        name: String,
        result: Result<(), BackendError>,
    },
    ConflictChecked {
        op: OpId,
        result: Result<bool, BackendError>,
    },
    GenerationFinished {
        op: OpId,
        result: Result<Vec<String>, BackendError>,
    },
    ReportsListed {
        gstin: Gstin,
        seq: ListingSeq,
        result: Result<Vec<String>, BackendError>,
    },
    PreviewLoaded {
        name: String,
        result: Result<WorkbookPreview, PreviewLoadError>,
    },
}

/// Main worker loop. Every command runs in its own task so a slow
/// generation never holds up a listing; nothing here cancels a started call.
pub async fn run(
    mut rx: mpsc::Receiver<WorkerCmd>,
    tx: mpsc::Sender<WorkerEvent>,
    backend: Arc<dyn Backend>,
) {
    tracing::info!("worker started");
    while let Some(cmd) = rx.recv().await {
        let backend = Arc::clone(&backend);
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = execute(backend.as_ref(), cmd).await;
            if tx.send(ev).await.is_err() {
                tracing::warn!("ui gone; dropping worker event");
            }
        });
    }
    tracing::info!("worker stopped");
}

/// Run one command against the backend and describe the outcome.
pub async fn execute(backend: &dyn Backend, cmd: WorkerCmd) -> WorkerEvent {
    match cmd {
        WorkerCmd::Upload { op, key, files } => {
            tracing::info!(op, %key, count = files.len(), "upload start");
            let result = match read_parts(&files).await {
                Ok(parts) => backend.upload(&key, parts).await,
                Err(e) => Err(e),
            };
            log_outcome("upload", &result);
            WorkerEvent::UploadFinished { op, key, result }
        }

        WorkerCmd::ListFiles { key, seq } => {
            tracing::info!(%key, seq, "list files");
            let result = backend.list_files(&key).await;
            log_outcome("list files", &result);
            WorkerEvent::FilesListed { key, seq, result }
        }

        WorkerCmd::DeleteFile { key, name } => {
            tracing::info!(%key, file = %name, "delete file");
            let result = backend.delete_file(&key, &name).await;
            log_outcome("delete file", &result);
            WorkerEvent::FileDeleted { key, name, result }
        }

        WorkerCmd::CheckConflict { op, gstin } => {
            tracing::info!(op, %gstin, "check open reports");
            let result = backend.check_open_reports(&gstin).await;
            if let Err(e) = &result {
                // Generation proceeds anyway; this only warns.
                tracing::warn!(kind = e.kind(), "open-report check failed: {e}");
            }
            WorkerEvent::ConflictChecked { op, result }
        }

        WorkerCmd::Generate { op, gstin } => {
            tracing::info!(op, %gstin, "generation start");
            let result = backend.generate(&gstin).await;
            log_outcome("generation", &result);
            WorkerEvent::GenerationFinished { op, result }
        }

        WorkerCmd::ListReports { gstin, seq } => {
            let result = backend.list_reports(&gstin).await;
            log_outcome("list reports", &result);
            WorkerEvent::ReportsListed { gstin, seq, result }
        }

        WorkerCmd::FetchPreview { gstin, name } => {
            tracing::info!(%gstin, report = %name, "preview fetch");
            let result = load_preview(backend, &gstin, &name).await;
            if let Err(e) = &result {
                tracing::error!(report = %name, "preview failed: {e}");
            }
            WorkerEvent::PreviewLoaded { name, result }
        }
    }
}

/// Read every selected file; the first unreadable one fails the whole upload.
async fn read_parts(files: &[CandidateFile]) -> Result<Vec<UploadPart>, BackendError> {
    let mut parts = Vec::with_capacity(files.len());
    for f in files {
        let bytes = tokio::fs::read(&f.path)
            .await
            .map_err(|e| BackendError::LocalFile {
                path: f.path.display().to_string(),
                message: e.to_string(),
            })?;
        parts.push(UploadPart {
            name: f.name.clone(),
            mime_type: f.mime_type.clone(),
            bytes,
        });
    }
    Ok(parts)
}

/// Fetch the bytes, then parse off the async threads.
async fn load_preview(
    backend: &dyn Backend,
    gstin: &Gstin,
    name: &str,
) -> Result<WorkbookPreview, PreviewLoadError> {
    let bytes = backend.fetch_report(gstin, name).await?;
    let parsed = tokio::task::spawn_blocking(move || preview::parse::parse(&bytes))
        .await
        .map_err(|e| PreviewLoadError::Aborted(e.to_string()))??;
    Ok(parsed)
}

fn log_outcome<T>(what: &str, result: &Result<T, BackendError>) {
    match result {
        Ok(_) => tracing::info!("{what} ok"),
        Err(BackendError::Rejected { status, body }) => {
            tracing::error!(status, body = %body, "{what} rejected by backend")
        }
        Err(e) => tracing::error!(kind = e.kind(), "{what} failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::tenant::ReturnCategory;

    fn key() -> RegistryKey {
        RegistryKey {
            gstin: Gstin::parse("22ABCDE1234F1Z5").unwrap(),
            category: ReturnCategory::Gstr1,
        }
    }

    #[tokio::test]
    async fn unreadable_file_fails_upload_without_request() {
        let backend = FakeBackend::default();
        let missing = CandidateFile {
            path: "/definitely/not/here.xlsx".into(),
            name: "here.xlsx".into(),
            mime_type: crate::validator::XLSX_MIME.into(),
            size: 0,
        };
        let ev = execute(
            &backend,
            WorkerCmd::Upload {
                op: 1,
                key: key(),
                files: vec![missing],
            },
        )
        .await;
        match ev {
            WorkerEvent::UploadFinished { result, .. } => {
                assert!(matches!(result, Err(BackendError::LocalFile { .. })));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(backend.calls("upload"), 0);
    }

    #[tokio::test]
    async fn preview_of_non_workbook_reports_parse_error() {
        let backend = FakeBackend::default();
        backend.put_report("22ABCDE1234F1Z5", "broken.xlsx", b"nope".to_vec());
        let ev = execute(
            &backend,
            WorkerCmd::FetchPreview {
                gstin: Gstin::parse("22ABCDE1234F1Z5").unwrap(),
                name: "broken.xlsx".into(),
            },
        )
        .await;
        match ev {
            WorkerEvent::PreviewLoaded { result, .. } => {
                assert!(matches!(result, Err(PreviewLoadError::Parse(_))));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_loop_answers_each_command() {
        let backend = Arc::new(FakeBackend::default());
        backend.seed_files(&key(), &["a.xlsx"]);
        let (tx_cmd, rx_cmd) = mpsc::channel(8);
        let (tx_ev, mut rx_ev) = mpsc::channel(8);
        let handle = tokio::spawn(run(rx_cmd, tx_ev, backend.clone()));

        tx_cmd
            .send(WorkerCmd::ListFiles { key: key(), seq: 7 })
            .await
            .unwrap();
        match rx_ev.recv().await.unwrap() {
            WorkerEvent::FilesListed { seq, result, .. } => {
                assert_eq!(seq, 7);
                assert_eq!(result.unwrap(), vec!["a.xlsx".to_string()]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        drop(tx_cmd);
        handle.await.unwrap();
    }
}
