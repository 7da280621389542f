mod file_store;
mod memory_store;
mod mutate;

pub use file_store::FileTaskStore;
pub use memory_store::InMemoryTaskStore;

use async_trait::async_trait;
use crucible_types::{StoreError, Task, TaskId, TaskPatch, TaskStatus, TaskType};

/// Wraps the external task-tracker. The engine never caches writes: every
/// mutation goes through one of these operations and must be visible to the
/// very next read. Implementors are responsible for any concurrency
/// protection the backing tracker itself needs; callers may treat
/// operations as linearizable.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(
        &self,
        title: &str,
        description: &str,
        task_type: TaskType,
        priority: u8,
        parent_id: Option<TaskId>,
    ) -> Result<Task, StoreError>;

    async fn get_task(&self, id: &TaskId) -> Result<Task, StoreError>;

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError>;

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<Task, StoreError>;

    async fn close_task(&self, id: &TaskId, reason: Option<&str>) -> Result<Task, StoreError>;

    /// Makes `task_id` blocked by `depends_on_id`. Idempotent: repeating the
    /// same call is a no-op. Rejects self-dependency and unknown ids.
    async fn add_dependency(&self, task_id: &TaskId, depends_on_id: &TaskId)
        -> Result<(), StoreError>;

    /// Every open task all of whose declared dependencies are closed.
    /// Ordering is unspecified but stable within one call.
    async fn list_ready(&self) -> Result<Vec<Task>, StoreError>;
}

pub(crate) fn validate_priority(priority: u8) -> Result<(), StoreError> {
    if priority > 4 {
        return Err(StoreError::InvalidArgument(format!(
            "priority must be 0..=4, got {priority}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_title(title: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::InvalidArgument(
            "title must not be empty".to_string(),
        ));
    }
    Ok(())
}
