use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier assigned by the store on creation. A thin newtype over
/// `String` rather than a `Uuid` wrapper: the store is free to mint ids
/// however it likes (the in-tree adapters use `Uuid::new_v4`), the engine
/// only ever treats them as comparable, hashable, cloneable handles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Work,
    Bug,
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    Xs,
    S,
    M,
    L,
    Xl,
}

impl Size {
    /// Only `Xs` tasks are executable; everything else must be decomposed.
    pub fn is_executable(self) -> bool {
        matches!(self, Size::Xs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Blocked,
    Closed,
}

/// A unit of work tracked by the external store, mirrored into the engine.
///
/// Invariants enforced by the store adapter and the orchestrator together
/// (see `crucible-store` and `crucible-core`):
/// - exactly one parent per task; parent/child forms a tree.
/// - `depends_on` is acyclic within a sibling group.
/// - a task closes only once its dependencies and (for non-leaves) children
///   are closed.
/// - `attempts` never exceeds `max_attempts + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub notes: String,
    pub task_type: TaskType,
    pub priority: u8,
    pub size: Option<Size>,
    pub status: TaskStatus,
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub children: Vec<TaskId>,
    /// Tasks this task depends on; it cannot start until all of these close.
    #[serde(default)]
    pub depends_on: BTreeSet<TaskId>,
    /// Inverse view: tasks that declared a dependency on this one.
    #[serde(default)]
    pub blocked_by: BTreeSet<TaskId>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_validation_passed: Option<bool>,
    #[serde(default)]
    pub last_validation_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_leaf_ready(&self) -> bool {
        self.size.is_some_and(Size::is_executable)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.status, TaskStatus::Closed)
    }

    pub fn dependencies_satisfied<F>(&self, is_closed: F) -> bool
    where
        F: Fn(&TaskId) -> bool,
    {
        self.depends_on.iter().all(is_closed)
    }
}

/// The run-scoped bookkeeping fields the orchestrator records against a
/// task's last attempt: both halves of this pair are always set together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub message: String,
}

/// Partial update accepted by `TaskStore::update_task`. `None` fields are
/// left untouched, which makes a no-op update (all fields `None`)
/// trivially valid. Beyond the user-facing `{title, description, notes,
/// status, priority, size, assignee}` fields, this also carries the
/// run-bookkeeping fields the orchestrator itself needs to persist
/// (`attempts`, `max_attempts`, `last_error`, `last_validation`).
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<u8>,
    pub size: Option<Size>,
    pub assignee: Option<String>,
    pub attempts: Option<u32>,
    pub max_attempts: Option<u32>,
    pub last_error: Option<String>,
    pub last_validation: Option<ValidationOutcome>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
