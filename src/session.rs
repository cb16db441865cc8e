//! Session state and the upload/generation orchestration.
//!
//! Every user action and every worker event goes through [`Session`], which
//! updates local state and returns the commands the worker should run. It
//! does no I/O itself.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::{
    preview::PreviewState,
    registry::{FileRegistry, ListingOutcome, ReportShelf},
    status::{GenerationEvent, GenerationPhase, OpId, StatusBoard, WorkflowStatus},
    tenant::{Gstin, GstinError, RegistryKey, ReturnCategory, TenantContext},
    validator::{self, CandidateFile, PendingSelection},
    worker::{WorkerCmd, WorkerEvent},
};

/// Oldest notices are dropped past this many.
const NOTICE_LOG_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A time-stamped message for the user.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub detail: Option<String>,
    pub at: DateTime<Local>,
}

/// A question the user must answer before anything proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    DeleteFile { key: RegistryKey, name: String },
    /// Generated reports are open elsewhere; regenerate anyway?
    Regenerate,
}

impl Confirmation {
    pub fn title(&self) -> &'static str {
        match self {
            Confirmation::DeleteFile { .. } => "Delete file",
            Confirmation::Regenerate => "Report files open",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Confirmation::DeleteFile { name, .. } => format!("Delete {name}?"),
            Confirmation::Regenerate => "Some report files appear to be open in Excel. Please close \
                 them before generating new reports to avoid \"Permission Denied\" errors."
                .to_string(),
        }
    }

    /// Labels for the (dismiss, accept) buttons.
    pub fn buttons(&self) -> (&'static str, &'static str) {
        match self {
            Confirmation::DeleteFile { .. } => ("Cancel", "Delete"),
            Confirmation::Regenerate => ("Cancel", "Proceed Anyway"),
        }
    }
}

/// What the preview screen is showing.
#[derive(Debug, Default)]
pub enum PreviewSlot {
    #[default]
    Closed,
    Loading(String),
    Open(PreviewState),
}

/// The upload in flight and the selection it sent.
#[derive(Debug, Clone)]
struct UploadJob {
    op: OpId,
    files: Vec<CandidateFile>,
}

/// The generation run in flight.
#[derive(Debug, Clone)]
struct GenerationJob {
    op: OpId,
    gstin: Gstin,
}

#[derive(Debug, Default)]
pub struct Session {
    tenant: TenantContext,
    pending: PendingSelection,
    board: StatusBoard,
    upload: Option<UploadJob>,
    phase: GenerationPhase,
    job: Option<GenerationJob>,
    files: FileRegistry,
    reports: ReportShelf,
    confirm: Option<Confirmation>,
    notices: VecDeque<Notice>,
    /// Newest notice stays on the status bar until dismissed.
    toast: Option<Notice>,
    preview: PreviewSlot,
}

impl Session {
    /// Start keyed on `tenant`; returns the initial listing fetches.
    pub fn new(tenant: TenantContext) -> (Self, Vec<WorkerCmd>) {
        let mut session = Self {
            tenant,
            ..Self::default()
        };
        let cmds = session.sync_listings();
        (session, cmds)
    }

    // ---- read side ----

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    pub fn pending(&self) -> &PendingSelection {
        &self.pending
    }

    pub fn status(&self) -> WorkflowStatus {
        self.board.status()
    }

    pub fn files(&self) -> &FileRegistry {
        &self.files
    }

    pub fn reports(&self) -> &ReportShelf {
        &self.reports
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirm.as_ref()
    }

    /// Oldest first.
    pub fn notices(&self) -> &VecDeque<Notice> {
        &self.notices
    }

    pub fn toast(&self) -> Option<&Notice> {
        self.toast.as_ref()
    }

    pub fn preview(&self) -> &PreviewSlot {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> Option<&mut PreviewState> {
        match &mut self.preview {
            PreviewSlot::Open(state) => Some(state),
            _ => None,
        }
    }

    pub fn upload_in_flight(&self) -> bool {
        self.upload.is_some()
    }

    pub fn can_upload(&self) -> bool {
        !self.upload_in_flight() && !self.pending.is_empty() && self.tenant.gstin().is_ok()
    }

    pub fn can_generate(&self) -> bool {
        !self.phase.in_progress() && self.tenant.gstin().is_ok()
    }

    /// Where generated reports end up on the backend host.
    pub fn reports_location(&self) -> Option<String> {
        self.tenant.gstin().ok().map(|g| format!("reports/{g}"))
    }

    // ---- user actions ----

    /// Replace the typed GSTIN. Listings follow the new value.
    pub fn set_gstin(&mut self, raw: &str) -> Vec<WorkerCmd> {
        let upper = raw.to_uppercase();
        if upper == self.tenant.gstin_input {
            return Vec::new();
        }
        self.tenant.gstin_input = upper;
        self.sync_listings()
    }

    /// Switch category. The pending selection was validated for the old rule,
    /// so it is dropped.
    pub fn select_category(&mut self, category: ReturnCategory) -> Vec<WorkerCmd> {
        if category == self.tenant.category {
            return Vec::new();
        }
        self.tenant.category = category;
        if !self.pending.is_empty() {
            self.pending.clear();
            self.notify(
                NoticeLevel::Info,
                "Selection cleared.",
                Some(format!("{category} accepts {}", category.format_rule().accept_hint())),
            );
        }
        self.sync_listings()
    }

    /// Validate a fresh set of picked files against the current category.
    pub fn choose_files(&mut self, files: Vec<CandidateFile>) {
        if files.is_empty() {
            self.pending.clear();
            return;
        }
        match validator::validate(self.tenant.category, files) {
            Ok(selection) => {
                let msg = format!("{} file(s) selected.", selection.len());
                self.pending = selection;
                self.notify(NoticeLevel::Info, msg, None);
            }
            Err(rejection) => {
                self.pending.clear();
                self.notify(NoticeLevel::Error, rejection.title(), Some(rejection.detail()));
            }
        }
    }

    /// Send the pending selection under the current (GSTIN, category).
    pub fn upload(&mut self) -> Vec<WorkerCmd> {
        if let Some(job) = &self.upload {
            tracing::debug!(op = job.op, "upload already in flight; ignoring");
            return Vec::new();
        }
        let gstin = match self.tenant.gstin() {
            Ok(g) => g,
            Err(e) => {
                self.warn_gstin(&e, "Enter GSTIN before uploading.");
                return Vec::new();
            }
        };
        if self.pending.is_empty() {
            self.notify(NoticeLevel::Warning, "Select at least one file to upload.", None);
            return Vec::new();
        }

        let op = self.board.begin();
        self.board.publish(op, WorkflowStatus::Uploading);
        let files = self.pending.files().to_vec();
        self.upload = Some(UploadJob {
            op,
            files: files.clone(),
        });
        let key = RegistryKey {
            gstin,
            category: self.tenant.category,
        };
        tracing::info!(op, %key, files = files.len(), "upload requested");
        vec![WorkerCmd::Upload { op, key, files }]
    }

    /// Start report generation; it first checks for open reports.
    pub fn generate(&mut self) -> Vec<WorkerCmd> {
        if self.phase.in_progress() {
            tracing::debug!(phase = ?self.phase, "generation already in progress; ignoring");
            return Vec::new();
        }
        let gstin = match self.tenant.gstin() {
            Ok(g) => g,
            Err(e) => {
                self.warn_gstin(&e, "Enter GSTIN to generate reports.");
                return Vec::new();
            }
        };

        let op = self.board.begin();
        if !self.advance(op, GenerationEvent::Start) {
            return Vec::new();
        }
        tracing::info!(op, %gstin, "generation requested");
        self.job = Some(GenerationJob {
            op,
            gstin: gstin.clone(),
        });
        vec![WorkerCmd::CheckConflict { op, gstin }]
    }

    /// Ask before deleting an uploaded file.
    pub fn request_delete(&mut self, name: &str) {
        let Some(key) = self.files.key().cloned() else {
            return;
        };
        if !self.files.contains(name) {
            return;
        }
        self.confirm = Some(Confirmation::DeleteFile {
            key,
            name: name.to_string(),
        });
    }

    /// The user accepted the open dialog.
    pub fn confirm(&mut self) -> Vec<WorkerCmd> {
        match self.confirm.take() {
            Some(Confirmation::DeleteFile { key, name }) => {
                vec![WorkerCmd::DeleteFile { key, name }]
            }
            Some(Confirmation::Regenerate) => {
                let Some(job) = self.job.clone() else {
                    return Vec::new();
                };
                if !self.advance(job.op, GenerationEvent::UserConfirmed) {
                    return Vec::new();
                }
                tracing::info!(op = job.op, "generation confirmed despite open reports");
                vec![WorkerCmd::Generate {
                    op: job.op,
                    gstin: job.gstin,
                }]
            }
            None => Vec::new(),
        }
    }

    /// The user dismissed the open dialog.
    pub fn dismiss_confirmation(&mut self) {
        if let Some(Confirmation::Regenerate) = self.confirm.take() {
            if let Some(job) = self.job.take() {
                self.advance(job.op, GenerationEvent::UserCancelled);
                tracing::info!(op = job.op, "generation cancelled");
            }
        }
    }

    /// Re-fetch both listings for the current key.
    pub fn refresh(&mut self) -> Vec<WorkerCmd> {
        let mut cmds = Vec::new();
        if let Some((key, seq)) = self.files.refresh() {
            cmds.push(WorkerCmd::ListFiles { key, seq });
        }
        if let Some((gstin, seq)) = self.reports.refresh() {
            cmds.push(WorkerCmd::ListReports { gstin, seq });
        }
        cmds
    }

    pub fn open_preview(&mut self, name: &str) -> Vec<WorkerCmd> {
        let Some(gstin) = self.reports.key().cloned() else {
            return Vec::new();
        };
        if !self.reports.contains(name) {
            return Vec::new();
        }
        self.preview = PreviewSlot::Loading(name.to_string());
        vec![WorkerCmd::FetchPreview {
            gstin,
            name: name.to_string(),
        }]
    }

    pub fn close_preview(&mut self) {
        self.preview = PreviewSlot::Closed;
    }

    pub fn dismiss_notice(&mut self) {
        self.toast = None;
    }

    // ---- worker events ----

    pub fn handle_worker_event(&mut self, ev: WorkerEvent) -> Vec<WorkerCmd> {
        match ev {
            WorkerEvent::UploadFinished { op, key, result } => {
                let sent = match self.upload.take() {
                    Some(job) if job.op == op => Some(job.files),
                    other => {
                        self.upload = other;
                        None
                    }
                };
                match result {
                    Ok(paths) => {
                        tracing::info!(op, %key, stored = paths.len(), "upload finished");
                        self.board.publish(op, WorkflowStatus::UploadComplete);
                        self.notify(NoticeLevel::Success, "Files uploaded successfully.", None);
                        // A selection picked after the upload started stays.
                        if sent.is_some_and(|files| files.as_slice() == self.pending.files()) {
                            self.pending.clear();
                        }
                        // The listing is the source of truth, not the returned paths.
                        if self.files.key() != Some(&key) {
                            return Vec::new();
                        }
                        self.files
                            .refresh()
                            .map(|(key, seq)| vec![WorkerCmd::ListFiles { key, seq }])
                            .unwrap_or_default()
                    }
                    Err(e) => {
                        self.board.publish(op, WorkflowStatus::UploadFailed);
                        self.notify(NoticeLevel::Error, "Upload failed.", Some(e.to_string()));
                        Vec::new()
                    }
                }
            }

            WorkerEvent::FilesListed { key, seq, result } => {
                if let ListingOutcome::Failed(e) = self.files.apply_listing(&key, seq, result) {
                    self.notify(
                        NoticeLevel::Warning,
                        "Could not load uploaded files.",
                        Some(e.to_string()),
                    );
                }
                Vec::new()
            }

            WorkerEvent::FileDeleted { key, name, result } => {
                match result {
                    Ok(()) => {
                        self.files.remove(&key, &name);
                        self.notify(NoticeLevel::Info, "File deleted.", Some(name));
                    }
                    Err(e) => {
                        self.notify(
                            NoticeLevel::Error,
                            "Failed to delete file.",
                            Some(format!("{name}: {e}")),
                        );
                    }
                }
                Vec::new()
            }

            WorkerEvent::ConflictChecked { op, result } => {
                let Some(job) = self.current_job(op) else {
                    return Vec::new();
                };
                match result {
                    Ok(true) => {
                        if self.advance(op, GenerationEvent::ConflictFound) {
                            self.confirm = Some(Confirmation::Regenerate);
                        }
                        Vec::new()
                    }
                    Ok(false) => self.start_generation(job, GenerationEvent::NoConflict),
                    Err(e) => {
                        self.notify(
                            NoticeLevel::Warning,
                            "Failed to check for open files.",
                            Some(format!("Proceeding with report generation. ({e})")),
                        );
                        self.start_generation(job, GenerationEvent::CheckFailed)
                    }
                }
            }

            WorkerEvent::GenerationFinished { op, result } => {
                let Some(job) = self.current_job(op) else {
                    return Vec::new();
                };
                self.job = None;
                match result {
                    Ok(names) => {
                        self.advance(op, GenerationEvent::BackendSucceeded);
                        tracing::info!(op, reports = names.len(), "generation finished");
                        self.notify(
                            NoticeLevel::Success,
                            "Reports generated.",
                            Some(format!("Saved under reports/{}", job.gstin)),
                        );
                        if self.reports.key() != Some(&job.gstin) {
                            return Vec::new();
                        }
                        self.reports
                            .refresh()
                            .map(|(gstin, seq)| vec![WorkerCmd::ListReports { gstin, seq }])
                            .unwrap_or_default()
                    }
                    Err(e) => {
                        self.advance(op, GenerationEvent::BackendFailed);
                        self.notify(
                            NoticeLevel::Error,
                            "Failed to generate reports.",
                            Some(e.to_string()),
                        );
                        Vec::new()
                    }
                }
            }

            WorkerEvent::ReportsListed { gstin, seq, result } => {
                if let ListingOutcome::Failed(e) = self.reports.apply_listing(&gstin, seq, result)
                {
                    self.notify(
                        NoticeLevel::Warning,
                        "Could not load generated reports.",
                        Some(e.to_string()),
                    );
                }
                Vec::new()
            }

            WorkerEvent::PreviewLoaded { name, result } => {
                let waiting = matches!(&self.preview, PreviewSlot::Loading(n) if *n == name);
                if !waiting {
                    tracing::debug!(report = %name, "preview no longer wanted");
                    return Vec::new();
                }
                match result {
                    Ok(workbook) => {
                        self.preview = PreviewSlot::Open(PreviewState::open(name, workbook));
                    }
                    Err(e) => {
                        self.preview = PreviewSlot::Closed;
                        self.notify(
                            NoticeLevel::Error,
                            "Could not open report preview.",
                            Some(format!("{name}: {e}")),
                        );
                    }
                }
                Vec::new()
            }
        }
    }

    // ---- internals ----

    /// Re-key both listings on the current tenant. An unusable GSTIN clears
    /// them without any request.
    fn sync_listings(&mut self) -> Vec<WorkerCmd> {
        let mut cmds = Vec::new();
        if let Some((key, seq)) = self.files.sync(self.tenant.registry_key()) {
            cmds.push(WorkerCmd::ListFiles { key, seq });
        }
        if let Some((gstin, seq)) = self.reports.sync(self.tenant.gstin().ok()) {
            cmds.push(WorkerCmd::ListReports { gstin, seq });
        }
        cmds
    }

    fn current_job(&self, op: OpId) -> Option<GenerationJob> {
        match &self.job {
            Some(job) if job.op == op => Some(job.clone()),
            _ => {
                tracing::debug!(op, "event for a generation run that is no longer current");
                None
            }
        }
    }

    fn start_generation(&mut self, job: GenerationJob, event: GenerationEvent) -> Vec<WorkerCmd> {
        if !self.advance(job.op, event) {
            return Vec::new();
        }
        vec![WorkerCmd::Generate {
            op: job.op,
            gstin: job.gstin,
        }]
    }

    /// Step the generation flow and publish its status on behalf of `op`.
    fn advance(&mut self, op: OpId, event: GenerationEvent) -> bool {
        match self.phase.next(event) {
            Ok((phase, status)) => {
                self.phase = phase;
                self.board.publish(op, status);
                true
            }
            Err(e) => {
                tracing::warn!("{e}");
                false
            }
        }
    }

    fn warn_gstin(&mut self, err: &GstinError, empty_msg: &str) {
        match err {
            GstinError::Empty => self.notify(NoticeLevel::Warning, empty_msg, None),
            GstinError::Malformed(_) => self.notify(
                NoticeLevel::Warning,
                "Invalid GSTIN format.",
                Some(err.to_string()),
            ),
        }
    }

    pub fn notify(&mut self, level: NoticeLevel, title: impl Into<String>, detail: Option<String>) {
        let notice = Notice {
            level,
            title: title.into(),
            detail,
            at: Local::now(),
        };
        match level {
            NoticeLevel::Error => tracing::error!(title = %notice.title, detail = ?notice.detail, "notice"),
            NoticeLevel::Warning => tracing::warn!(title = %notice.title, detail = ?notice.detail, "notice"),
            _ => tracing::info!(title = %notice.title, "notice"),
        }
        if self.notices.len() >= NOTICE_LOG_LIMIT {
            self.notices.pop_front();
        }
        self.notices.push_back(notice.clone());
        self.toast = Some(notice);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::backend::{BackendError, fake::FakeBackend};
    use crate::worker;

    const GSTIN: &str = "22ABCDE1234F1Z5";

    fn gstin() -> Gstin {
        Gstin::parse(GSTIN).unwrap()
    }

    fn key(category: ReturnCategory) -> RegistryKey {
        RegistryKey {
            gstin: gstin(),
            category,
        }
    }

    /// Feed commands to the worker until nothing is left to run.
    async fn settle(session: &mut Session, backend: &FakeBackend, cmds: Vec<WorkerCmd>) {
        let mut queue: VecDeque<WorkerCmd> = cmds.into();
        while let Some(cmd) = queue.pop_front() {
            let ev = worker::execute(backend, cmd).await;
            queue.extend(session.handle_worker_event(ev));
        }
    }

    fn write_files(dir: &Path, names: &[&str]) -> Vec<CandidateFile> {
        names
            .iter()
            .map(|n| {
                let path = dir.join(n);
                std::fs::write(&path, b"payload").unwrap();
                CandidateFile::from_path(&path).unwrap()
            })
            .collect()
    }

    async fn started(backend: &FakeBackend, category: ReturnCategory) -> Session {
        let (mut session, cmds) = Session::new(TenantContext::new(GSTIN, category));
        settle(&mut session, backend, cmds).await;
        session
    }

    fn names(session: &Session) -> Vec<String> {
        session.files().entries().iter().map(|a| a.name.clone()).collect()
    }

    #[tokio::test]
    async fn upload_then_list_shows_every_file() {
        let backend = FakeBackend::default();
        let dir = TempDir::new().unwrap();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;

        session.choose_files(write_files(dir.path(), &["a.xlsx", "b.xlsx"]));
        assert!(session.can_upload());
        let cmds = session.upload();
        assert_eq!(session.status(), WorkflowStatus::Uploading);
        settle(&mut session, &backend, cmds).await;

        assert_eq!(session.status(), WorkflowStatus::UploadComplete);
        assert_eq!(names(&session), vec!["a.xlsx".to_string(), "b.xlsx".to_string()]);
        assert!(session.pending().is_empty());
        assert!(!session.upload_in_flight());
        assert_eq!(backend.calls("upload"), 1);
    }

    #[tokio::test]
    async fn listing_twice_yields_the_same_set() {
        let backend = FakeBackend::default();
        backend.seed_files(&key(ReturnCategory::Gstr1), &["a.xlsx", "b.xlsx"]);
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        let first = names(&session);

        let cmds = session.refresh();
        settle(&mut session, &backend, cmds).await;
        assert_eq!(names(&session), first);
        assert_eq!(backend.calls("list_files"), 2);
    }

    #[tokio::test]
    async fn reupload_overwrites_by_name() {
        let backend = FakeBackend::default();
        let dir = TempDir::new().unwrap();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;

        for _ in 0..2 {
            session.choose_files(write_files(dir.path(), &["a.xlsx"]));
            let cmds = session.upload();
            settle(&mut session, &backend, cmds).await;
        }
        assert_eq!(names(&session), vec!["a.xlsx".to_string()]);
    }

    #[tokio::test]
    async fn upload_preconditions_raise_distinct_warnings() {
        let backend = FakeBackend::default();
        let (mut session, _) = Session::new(TenantContext::new("", ReturnCategory::Gstr1));
        assert!(session.upload().is_empty());
        assert_eq!(session.toast().unwrap().title, "Enter GSTIN before uploading.");

        session.set_gstin("22ABC");
        assert!(session.upload().is_empty());
        assert_eq!(session.toast().unwrap().title, "Invalid GSTIN format.");

        let cmds = session.set_gstin(GSTIN);
        settle(&mut session, &backend, cmds).await;
        assert!(session.upload().is_empty());
        assert_eq!(session.toast().unwrap().title, "Select at least one file to upload.");
        assert_eq!(session.status(), WorkflowStatus::Idle);
        assert_eq!(backend.calls("upload"), 0);
    }

    #[tokio::test]
    async fn second_upload_is_ignored_while_one_is_in_flight() {
        let backend = FakeBackend::default();
        let dir = TempDir::new().unwrap();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        session.choose_files(write_files(dir.path(), &["a.xlsx"]));

        let first = session.upload();
        assert_eq!(first.len(), 1);
        assert!(session.upload().is_empty());
        assert!(!session.can_upload());
        settle(&mut session, &backend, first).await;
        assert_eq!(backend.calls("upload"), 1);
    }

    #[tokio::test]
    async fn rejected_selection_reports_offending_names() {
        let backend = FakeBackend::default();
        let dir = TempDir::new().unwrap();
        let mut session = started(&backend, ReturnCategory::Gstr3b).await;

        session.choose_files(write_files(dir.path(), &["ok.pdf", "bad.xlsx"]));
        assert!(session.pending().is_empty());
        let toast = session.toast().unwrap();
        assert_eq!(toast.level, NoticeLevel::Error);
        assert_eq!(toast.title, "Only PDF files are allowed for GSTR-3B");
        assert!(toast.detail.as_deref().unwrap().contains("bad.xlsx"));
    }

    #[tokio::test]
    async fn category_change_clears_selection_and_relists() {
        let backend = FakeBackend::default();
        backend.seed_files(&key(ReturnCategory::Gstr9), &["annual.pdf"]);
        let dir = TempDir::new().unwrap();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        session.choose_files(write_files(dir.path(), &["a.xlsx"]));

        let cmds = session.select_category(ReturnCategory::Gstr9);
        assert!(session.pending().is_empty());
        assert_eq!(
            cmds,
            vec![WorkerCmd::ListFiles {
                key: key(ReturnCategory::Gstr9),
                seq: 2,
            }]
        );
        settle(&mut session, &backend, cmds).await;
        assert_eq!(names(&session), vec!["annual.pdf".to_string()]);
    }

    #[tokio::test]
    async fn invalid_gstin_clears_listings_without_requests() {
        let backend = FakeBackend::default();
        backend.seed_files(&key(ReturnCategory::Gstr1), &["a.xlsx"]);
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        assert_eq!(names(&session).len(), 1);

        let cmds = session.set_gstin("22ABCDE");
        assert!(cmds.is_empty());
        assert!(session.files().entries().is_empty());
        assert!(session.reports().key().is_none());
    }

    #[tokio::test]
    async fn stale_listing_after_category_switch_is_dropped() {
        let backend = FakeBackend::default();
        backend.seed_files(&key(ReturnCategory::Gstr1), &["old.xlsx"]);
        let (mut session, first) = Session::new(TenantContext::new(GSTIN, ReturnCategory::Gstr1));
        let switched = session.select_category(ReturnCategory::Gstr2a);

        // The GSTR-1 listing lands after the switch.
        settle(&mut session, &backend, first).await;
        assert!(session.files().entries().is_empty());
        settle(&mut session, &backend, switched).await;
        assert!(session.files().entries().is_empty());
        assert_eq!(session.files().key(), Some(&key(ReturnCategory::Gstr2a)));
    }

    #[tokio::test]
    async fn upload_failure_keeps_selection() {
        let backend = FakeBackend::default();
        backend.fail_upload(BackendError::Rejected {
            status: 500,
            body: "disk full".into(),
        });
        let dir = TempDir::new().unwrap();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        session.choose_files(write_files(dir.path(), &["a.xlsx"]));
        let cmds = session.upload();
        settle(&mut session, &backend, cmds).await;

        assert_eq!(session.status(), WorkflowStatus::UploadFailed);
        assert_eq!(session.pending().len(), 1);
        let toast = session.toast().unwrap();
        assert_eq!(toast.title, "Upload failed.");
        assert!(toast.detail.as_deref().unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn delete_waits_for_confirmation() {
        let backend = FakeBackend::default();
        backend.seed_files(&key(ReturnCategory::Gstr1), &["a.xlsx", "b.xlsx"]);
        let mut session = started(&backend, ReturnCategory::Gstr1).await;

        session.request_delete("a.xlsx");
        assert_eq!(session.confirmation().unwrap().message(), "Delete a.xlsx?");
        session.dismiss_confirmation();
        assert!(session.confirmation().is_none());
        assert_eq!(backend.calls("delete_file"), 0);

        session.request_delete("a.xlsx");
        let cmds = session.confirm();
        settle(&mut session, &backend, cmds).await;
        assert_eq!(names(&session), vec!["b.xlsx".to_string()]);
        assert_eq!(backend.files(&key(ReturnCategory::Gstr1)), vec!["b.xlsx".to_string()]);
        assert_eq!(session.toast().unwrap().title, "File deleted.");
    }

    #[tokio::test]
    async fn generation_without_open_reports_runs_straight_through() {
        let backend = FakeBackend::default();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;

        let cmds = session.generate();
        assert_eq!(session.status(), WorkflowStatus::CheckingConflict);
        assert!(session.generate().is_empty(), "double trigger ignored");
        settle(&mut session, &backend, cmds).await;

        assert_eq!(session.status(), WorkflowStatus::GenerationComplete);
        assert_eq!(backend.calls("check_open_reports"), 1);
        assert_eq!(backend.calls("generate"), 1);
        assert_eq!(
            session.reports().entries()[0].name,
            format!("{GSTIN}_master.xlsx")
        );
        assert!(session.can_generate());
    }

    #[tokio::test]
    async fn open_reports_gate_generation_until_confirmed() {
        let backend = FakeBackend::default();
        backend.set_open_reports(true);
        let mut session = started(&backend, ReturnCategory::Gstr1).await;

        let cmds = session.generate();
        settle(&mut session, &backend, cmds).await;
        assert_eq!(session.status(), WorkflowStatus::AwaitingConfirmation);
        assert_eq!(session.confirmation(), Some(&Confirmation::Regenerate));
        assert_eq!(backend.calls("generate"), 0);

        let cmds = session.confirm();
        assert_eq!(session.status(), WorkflowStatus::Generating);
        settle(&mut session, &backend, cmds).await;
        assert_eq!(backend.calls("generate"), 1);
        assert_eq!(session.status(), WorkflowStatus::GenerationComplete);
    }

    #[tokio::test]
    async fn cancelling_the_gate_never_generates() {
        let backend = FakeBackend::default();
        backend.set_open_reports(true);
        let mut session = started(&backend, ReturnCategory::Gstr1).await;

        let cmds = session.generate();
        settle(&mut session, &backend, cmds).await;
        session.dismiss_confirmation();

        assert_eq!(session.status(), WorkflowStatus::Idle);
        assert_eq!(backend.calls("generate"), 0);
        assert!(session.can_generate());
    }

    #[tokio::test]
    async fn failed_check_warns_and_proceeds() {
        let backend = FakeBackend::default();
        backend.fail_check(BackendError::Transport("connection reset".into()));
        let mut session = started(&backend, ReturnCategory::Gstr1).await;

        let cmds = session.generate();
        settle(&mut session, &backend, cmds).await;

        assert_eq!(backend.calls("generate"), 1);
        assert_eq!(session.status(), WorkflowStatus::GenerationComplete);
        let warning = session
            .notices()
            .iter()
            .find(|n| n.level == NoticeLevel::Warning)
            .unwrap();
        assert_eq!(warning.title, "Failed to check for open files.");
        assert!(warning.detail.as_deref().unwrap().starts_with("Proceeding"));
    }

    #[tokio::test]
    async fn backend_generation_failure_is_reported() {
        let backend = FakeBackend::default();
        backend.fail_generate(BackendError::Rejected {
            status: 500,
            body: "Permission denied".into(),
        });
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        let cmds = session.generate();
        settle(&mut session, &backend, cmds).await;

        assert_eq!(session.status(), WorkflowStatus::GenerationFailed);
        assert_eq!(session.toast().unwrap().title, "Failed to generate reports.");
        assert!(session.can_generate());
    }

    #[tokio::test]
    async fn late_upload_result_does_not_overwrite_generation_status() {
        let backend = FakeBackend::default();
        let dir = TempDir::new().unwrap();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        session.choose_files(write_files(dir.path(), &["a.xlsx"]));

        let upload = session.upload();
        let gen_cmds = session.generate();
        settle(&mut session, &backend, gen_cmds).await;
        assert_eq!(session.status(), WorkflowStatus::GenerationComplete);

        settle(&mut session, &backend, upload).await;
        assert_eq!(session.status(), WorkflowStatus::GenerationComplete);
        // The upload still lands in the listing.
        assert_eq!(names(&session), vec!["a.xlsx".to_string()]);
    }

    #[tokio::test]
    async fn preview_opens_only_listed_reports() {
        let backend = FakeBackend::default();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        assert!(session.open_preview("missing.xlsx").is_empty());

        backend.put_report(GSTIN, "bad.xlsx", b"zzz".to_vec());
        let cmds = session.refresh();
        settle(&mut session, &backend, cmds).await;
        let cmds = session.open_preview("bad.xlsx");
        assert!(matches!(session.preview(), PreviewSlot::Loading(_)));
        settle(&mut session, &backend, cmds).await;

        assert!(matches!(session.preview(), PreviewSlot::Closed));
        assert_eq!(session.toast().unwrap().title, "Could not open report preview.");
    }

    #[tokio::test]
    async fn startup_listing_landing_after_upload_refresh_is_dropped() {
        let backend = FakeBackend::default();
        let dir = TempDir::new().unwrap();
        let (mut session, initial) = Session::new(TenantContext::new(GSTIN, ReturnCategory::Gstr1));

        // The startup listing runs against an empty backend but is slow to land.
        let mut held = Vec::new();
        for cmd in initial {
            held.push(worker::execute(&backend, cmd).await);
        }

        session.choose_files(write_files(dir.path(), &["a.xlsx"]));
        let cmds = session.upload();
        settle(&mut session, &backend, cmds).await;
        assert_eq!(names(&session), vec!["a.xlsx".to_string()]);

        for ev in held {
            assert!(session.handle_worker_event(ev).is_empty());
        }
        assert_eq!(names(&session), vec!["a.xlsx".to_string()]);
        assert!(!session.files().is_loading());
    }

    #[tokio::test]
    async fn upload_success_clears_selection_after_gstin_change() {
        let backend = FakeBackend::default();
        let dir = TempDir::new().unwrap();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        session.choose_files(write_files(dir.path(), &["a.xlsx"]));

        let upload = session.upload();
        let relist = session.set_gstin("27ABCDE1234F1Z5");
        settle(&mut session, &backend, upload).await;
        settle(&mut session, &backend, relist).await;

        assert_eq!(session.status(), WorkflowStatus::UploadComplete);
        assert!(session.pending().is_empty());
        assert!(session.files().entries().is_empty());
        assert_eq!(backend.files(&key(ReturnCategory::Gstr1)), vec!["a.xlsx".to_string()]);
    }

    #[tokio::test]
    async fn selection_picked_during_upload_survives_its_success() {
        let backend = FakeBackend::default();
        let dir = TempDir::new().unwrap();
        let mut session = started(&backend, ReturnCategory::Gstr1).await;
        session.choose_files(write_files(dir.path(), &["a.xlsx"]));

        let upload = session.upload();
        session.choose_files(write_files(dir.path(), &["b.xlsx"]));
        settle(&mut session, &backend, upload).await;

        assert_eq!(session.pending().len(), 1);
        assert_eq!(session.pending().files()[0].name, "b.xlsx");
        assert!(session.can_upload());
    }

    #[test]
    fn notice_log_keeps_the_newest_entries() {
        let (mut session, _) = Session::new(TenantContext::new("", ReturnCategory::Gstr1));
        for i in 0..NOTICE_LOG_LIMIT + 5 {
            session.notify(NoticeLevel::Info, format!("notice {i}"), None);
        }
        assert_eq!(session.notices().len(), NOTICE_LOG_LIMIT);
        assert_eq!(session.notices().front().unwrap().title, "notice 5");
        assert_eq!(
            session.notices().back().unwrap().title,
            format!("notice {}", NOTICE_LOG_LIMIT + 4)
        );
    }
}
