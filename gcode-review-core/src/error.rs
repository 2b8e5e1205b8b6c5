use thiserror::Error;

use crate::types::PatchAction;

/// Errors returned by engine operations.
///
/// Every variant is a caller bug rather than a user-facing condition: indexes are
/// validated by the caller against the current buffer length, and the UI disables
/// mutation while a confirmation prompt is open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("line {index} is out of range (buffer has {len} lines)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no issue with index {0}")]
    UnknownIssue(usize),

    #[error("issue {0} is not the active issue")]
    NotActiveIssue(usize),

    #[error("no patch with index {0}")]
    UnknownPatch(usize),

    #[error("patch {0} is no longer proposed")]
    PatchNotActive(usize),

    #[error("one-click apply is not supported for `{0}` patches")]
    UnsupportedPatchAction(PatchAction),

    #[error("a context switch is waiting for confirm, discard or cancel")]
    SwitchGateOpen,

    #[error("no context switch is pending")]
    NoSwitchPending,

    #[error("a divergent patch apply is waiting for confirm, keep editing or discard")]
    PendingApplyOpen,

    #[error("no patch apply is pending")]
    NoPendingApply,
}

/// Failure reported by an [`AuditStore`](crate::audit::AuditStore).
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit store: {0}")]
    Store(#[from] tokio_rusqlite::Error),

    #[error("audit store rejected the batch: {0}")]
    Rejected(String),
}

/// Failure while reading the analysis report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot read report: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed report: {0}")]
    Parse(#[from] serde_json::Error),
}
