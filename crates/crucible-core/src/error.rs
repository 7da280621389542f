use thiserror::Error;

use crucible_trace::TraceError;
use crucible_types::StoreError;

/// Errors that either propagate straight out of a run (the store/trace/
/// cancellation/port cases — fatal, because the engine's view of the task
/// graph or the audit log can no longer be trusted) or are classified by
/// [`crate::orchestrator`] into a [`crate::orchestrator::TaskOutcome::Failed`]
/// for the offending task without aborting the run (the resolver case; the
/// depth cap is likewise surfaced as a `TaskOutcome::Failed` rather than
/// this error type, since exceeding it fails only the offending subtree).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("unresolved dependency `{0}` in subtask split")]
    UnresolvedDependency(String),

    #[error("duplicate local id `{0}` in subtask split")]
    DuplicateLocalId(String),

    #[error("subtask `{0}` cannot depend on itself")]
    SelfDependency(String),

    #[error("dependency cycle detected among subtasks: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("run canceled")]
    Canceled,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("port call failed: {0}")]
    Port(#[from] anyhow::Error),
}
