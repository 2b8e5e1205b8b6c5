//! gcode-review-core: the annotated-document edit engine behind G-code review.
//!
//! A G-code file is loaded into a line-addressed buffer next to machine-generated
//! annotations (issues and suggested patches) that refer to line positions in that
//! buffer. Every edit keeps the annotations pointing at the right physical line,
//! is classified against the patch suggestions, and is handed to an audit store.
//!
//! # Layout
//!
//! - [`buffer`]: current lines plus the immutable baseline taken at load time.
//! - [`annotations`]: issues, patches and applied-line markers.
//! - [`document`]: buffer and annotations mutated together.
//! - [`rebase`]: line reference updates after a deletion.
//! - [`classify`]: tags an edit as an issue edit, `patch_success` or `matching_failed`.
//! - [`patch`]: revert history and the pending divergent-apply sub-state.
//! - [`session`]: the single focused issue and its switch-confirmation gate.
//! - [`viewport`]: the bounded window of lines materialized around the focus line.
//! - [`audit`]: the audit store boundary and the best-effort emitter queue.
//! - [`db`] / [`schema`]: the WAL-mode SQLite audit store.
//! - [`report`]: ingestion of the analysis collaborator's JSON report.
//! - [`engine`]: [`ReviewEngine`], which wires all of the above together.

pub mod annotations;
pub mod audit;
pub mod buffer;
pub mod classify;
pub mod db;
pub mod document;
pub mod engine;
pub mod error;
pub mod patch;
pub mod rebase;
pub mod report;
pub mod schema;
pub mod session;
pub mod types;
pub mod viewport;

pub use audit::{AuditEmitter, AuditStats, AuditStore, FlushOutcome, MemoryAuditStore};
pub use engine::{EditOutcome, EngineConfig, ReviewEngine};
pub use error::{AuditError, EngineError, ReportError};
pub use report::{AnalysisReport, Annotations, NormalizeReport};
pub use session::SwitchRequest;
pub use types::{
    AuditBatch, AuditMetadata, ContextRef, EditAction, EditRecord, EditTag, Issue, LineBadges,
    Patch, PatchAction, Severity,
};
pub use viewport::ViewportWindow;
