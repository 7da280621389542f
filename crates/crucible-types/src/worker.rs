use serde::{Deserialize, Serialize};

use crate::subtask::SubtaskDefinition;
use crate::task::Size;

/// Output of a single Planner call. `should_split` and `subtasks` are
/// validated together by the orchestrator: if `should_split` is true,
/// `subtasks` must be non-empty (see `crucible-core::resolver`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerOutput {
    pub reasoning: String,
    pub size: Size,
    pub should_split: bool,
    #[serde(default)]
    pub subtasks: Vec<SubtaskDefinition>,
}

/// Result of one Executor attempt. Immutable after construction; owned by
/// the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub success: bool,
    pub summary: String,
    #[serde(default)]
    pub output_files: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Result of one Validator call. Produced by the Validator, consumed only by
/// the orchestrator; the Validator itself must not mutate the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub message: String,
    #[serde(default)]
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    Fix,
    Human,
    Skip,
}

/// Disposition returned by the Escalator once a leaf task has exhausted its
/// attempts, or failed validation. `fixer_prompt` is only ever populated
/// alongside `EscalationAction::Fix`; `human_question` only alongside
/// `EscalationAction::Human`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub action: EscalationAction,
    pub reason: String,
    #[serde(default)]
    pub fixer_prompt: Option<String>,
    #[serde(default)]
    pub human_question: Option<String>,
}
