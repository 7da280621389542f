use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Size, TaskId, TaskStatus};
use crate::worker::EscalationAction;

/// One line of `runs/<run-id>/trace.jsonl`. Append-only, never mutated once
/// written. `event_type` and the event-specific fields come from
/// [`TraceEventKind`] via `#[serde(flatten)]`; `task_id` and `timestamp` are
/// required on every event regardless of kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub task_id: TaskId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

impl TraceEvent {
    pub fn new(task_id: TaskId, kind: TraceEventKind) -> Self {
        Self {
            task_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TraceEventKind {
    RunStarted {
        run_id: String,
        spec_file: Option<String>,
    },
    TaskStarted {
        depth: u32,
    },
    TaskCompleted {
        success: bool,
        #[serde(default)]
        reason: Option<String>,
    },
    PlanningStarted,
    PlanningCompleted {
        size: Size,
        should_split: bool,
        subtask_count: usize,
    },
    ExecutionStarted {
        attempt: u32,
    },
    ExecutionCompleted {
        attempt: u32,
        success: bool,
        duration_ms: u64,
    },
    ValidationStarted {
        attempt: u32,
    },
    ValidationCompleted {
        passed: bool,
        message: String,
    },
    Escalation {
        action: EscalationAction,
        reason: String,
    },
    BeadCreated {
        local_id: String,
    },
    BeadStatusChanged {
        status: TaskStatus,
    },
}
