use thiserror::Error;

use crate::task::TaskId;

/// Errors surfaced by a [`crate::Task`]-store adapter. Store failures are
/// fatal to the current run: they mean the engine's view of the task graph
/// can no longer be trusted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("store io error: {0}")]
    Io(String),
}
