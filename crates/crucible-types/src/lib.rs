mod error;
mod run_summary;
mod subtask;
mod task;
mod trace;
mod worker;

pub use error::StoreError;
pub use run_summary::{RunStatus, RunSummary};
pub use subtask::SubtaskDefinition;
pub use task::{Size, Task, TaskId, TaskPatch, TaskStatus, TaskType, ValidationOutcome};
pub use trace::{TraceEvent, TraceEventKind};
pub use worker::{
    EscalationAction, EscalationDecision, PlannerOutput, ValidationResult, WorkerResult,
};
