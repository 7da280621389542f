use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// `runs/<run-id>/run.json`. Lives for the whole run; `tasks_total`/
/// `tasks_completed`/`tasks_failed` are filled in once, by replaying
/// `trace.jsonl` after the run (`crucible-core::coordinator`), and the
/// terminal fields are set by [`RunSummary::finalize`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub root_task_id: TaskId,
    pub spec_file: Option<String>,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub tasks_total: u64,
    #[serde(default)]
    pub tasks_completed: u64,
    #[serde(default)]
    pub tasks_failed: u64,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RunSummary {
    pub fn new(run_id: String, root_task_id: TaskId, spec_file: Option<String>) -> Self {
        Self {
            run_id,
            root_task_id,
            spec_file,
            status: RunStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            tasks_total: 0,
            tasks_completed: 0,
            tasks_failed: 0,
            success: false,
            error_message: None,
        }
    }

    pub fn finalize(&mut self, success: bool, error_message: Option<String>) {
        let end_time = Utc::now();
        self.duration_ms = (end_time - self.start_time).num_milliseconds().try_into().ok();
        self.end_time = Some(end_time);
        self.success = success;
        self.status = if success {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.error_message = error_message;
    }
}
