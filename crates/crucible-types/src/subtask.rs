use serde::{Deserialize, Serialize};

use crate::task::TaskType;

/// A planner-proposed child task. Ephemeral: the local identifier is only
/// meaningful within the `Vec<SubtaskDefinition>` it was declared in, and is
/// discarded once the dependency resolver has materialized store-backed
/// `Task`s and wired their edges (see `crucible-core::resolver`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskDefinition {
    pub local_id: String,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub priority: u8,
    #[serde(default)]
    pub depends_on: Vec<String>,
}
