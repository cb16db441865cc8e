//! Workflow status vocabulary and the generation state machine.

use std::fmt;

/// Monotonic id handed to every status-writing operation.
pub type OpId = u64;

/// The single live status surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowStatus {
    #[default]
    Idle,
    Uploading,
    UploadComplete,
    UploadFailed,
    CheckingConflict,
    AwaitingConfirmation,
    Generating,
    GenerationComplete,
    GenerationFailed,
}

/// How the status bar decorates a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Info,
    Busy,
    Success,
    Failure,
}

impl WorkflowStatus {
    /// User-facing text, derived from the tag.
    pub fn label(self) -> &'static str {
        match self {
            WorkflowStatus::Idle => "No report status yet.",
            WorkflowStatus::Uploading => "Uploading...",
            WorkflowStatus::UploadComplete => "Upload complete. Ready to process.",
            WorkflowStatus::UploadFailed => "Upload failed.",
            WorkflowStatus::CheckingConflict => "Checking for open report files...",
            WorkflowStatus::AwaitingConfirmation => "Report files are open. Waiting for confirmation.",
            WorkflowStatus::Generating => "Generating reports...",
            WorkflowStatus::GenerationComplete => "Reports generated successfully.",
            WorkflowStatus::GenerationFailed => "Error generating reports.",
        }
    }

    pub fn indicator(self) -> Indicator {
        match self {
            WorkflowStatus::Idle | WorkflowStatus::AwaitingConfirmation => Indicator::Info,
            WorkflowStatus::Uploading
            | WorkflowStatus::CheckingConflict
            | WorkflowStatus::Generating => Indicator::Busy,
            WorkflowStatus::UploadComplete | WorkflowStatus::GenerationComplete => {
                Indicator::Success
            }
            WorkflowStatus::UploadFailed | WorkflowStatus::GenerationFailed => Indicator::Failure,
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared status plus the id of the operation that last wrote it.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    status: WorkflowStatus,
    owner: OpId,
    last_issued: OpId,
}

impl StatusBoard {
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Allocate the id for a newly started operation.
    pub fn begin(&mut self) -> OpId {
        self.last_issued += 1;
        self.last_issued
    }

    /// Write `status` on behalf of `op`. Completions of operations older than
    /// the current owner are dropped; returns whether the write happened.
    pub fn publish(&mut self, op: OpId, status: WorkflowStatus) -> bool {
        if op < self.owner {
            tracing::debug!(op, owner = self.owner, ?status, "stale status update ignored");
            return false;
        }
        self.owner = op;
        self.status = status;
        true
    }
}

/// Where the generation flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPhase {
    #[default]
    Idle,
    CheckingConflict,
    AwaitingConfirmation,
    Generating,
}

/// Inputs that move the generation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationEvent {
    Start,
    ConflictFound,
    NoConflict,
    /// The conflict check itself could not complete; the flow fails open.
    CheckFailed,
    UserConfirmed,
    UserCancelled,
    BackendSucceeded,
    BackendFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{event:?} is not valid while generation is {phase:?}")]
pub struct InvalidTransition {
    pub phase: GenerationPhase,
    pub event: GenerationEvent,
}

impl GenerationPhase {
    /// True while the trigger control should stay disabled.
    pub fn in_progress(self) -> bool {
        self != GenerationPhase::Idle
    }

    /// Apply `event`, returning the next phase and the status to publish.
    pub fn next(
        self,
        event: GenerationEvent,
    ) -> Result<(GenerationPhase, WorkflowStatus), InvalidTransition> {
        use GenerationEvent as E;
        use GenerationPhase as P;
        let step = match (self, event) {
            (P::Idle, E::Start) => (P::CheckingConflict, WorkflowStatus::CheckingConflict),
            (P::CheckingConflict, E::ConflictFound) => {
                (P::AwaitingConfirmation, WorkflowStatus::AwaitingConfirmation)
            }
            (P::CheckingConflict, E::NoConflict | E::CheckFailed) => {
                (P::Generating, WorkflowStatus::Generating)
            }
            (P::AwaitingConfirmation, E::UserCancelled) => (P::Idle, WorkflowStatus::Idle),
            (P::AwaitingConfirmation, E::UserConfirmed) => {
                (P::Generating, WorkflowStatus::Generating)
            }
            (P::Generating, E::BackendSucceeded) => (P::Idle, WorkflowStatus::GenerationComplete),
            (P::Generating, E::BackendFailed) => (P::Idle, WorkflowStatus::GenerationFailed),
            (phase, event) => return Err(InvalidTransition { phase, event }),
        };
        Ok(step)
    }
}
