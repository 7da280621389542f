use std::collections::HashMap;

use async_trait::async_trait;
use crucible_types::{StoreError, Task, TaskId, TaskPatch, TaskStatus, TaskType};
use tokio::sync::RwLock;

use crate::{mutate, TaskStore};

/// Zero-I/O task store, the store-side analogue of a `NoopMissionReducer`:
/// used by unit tests and by the `crucible-engine` demo binary's quick-start
/// path where persistence across process restarts is not needed.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(
        &self,
        title: &str,
        description: &str,
        task_type: TaskType,
        priority: u8,
        parent_id: Option<TaskId>,
    ) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        mutate::create_task(&mut tasks, title, description, task_type, priority, parent_id)
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        let tasks = self.tasks.read().await;
        mutate::get_task(&tasks, id)
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        mutate::update_task(&mut tasks, id, patch)
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        mutate::update_status(&mut tasks, id, status)
    }

    async fn close_task(&self, id: &TaskId, reason: Option<&str>) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        mutate::close_task(&mut tasks, id, reason)
    }

    async fn add_dependency(
        &self,
        task_id: &TaskId,
        depends_on_id: &TaskId,
    ) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        mutate::add_dependency(&mut tasks, task_id, depends_on_id)
    }

    async fn list_ready(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(mutate::list_ready(&tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_task_rejects_empty_title() {
        let store = InMemoryTaskStore::new();
        let err = store
            .create_task("", "desc", TaskType::Work, 2, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn create_task_rejects_bad_priority() {
        let store = InMemoryTaskStore::new();
        let err = store
            .create_task("title", "desc", TaskType::Work, 9, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn get_task_missing_is_not_found() {
        let store = InMemoryTaskStore::new();
        let err = store.get_task(&TaskId::new("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn add_dependency_is_idempotent_and_keeps_inverse_view() {
        let store = InMemoryTaskStore::new();
        let a = store
            .create_task("a", "", TaskType::Work, 2, None)
            .await
            .unwrap();
        let b = store
            .create_task("b", "", TaskType::Work, 2, None)
            .await
            .unwrap();

        store.add_dependency(&b.id, &a.id).await.unwrap();
        store.add_dependency(&b.id, &a.id).await.unwrap();

        let b = store.get_task(&b.id).await.unwrap();
        let a = store.get_task(&a.id).await.unwrap();
        assert_eq!(b.depends_on.len(), 1);
        assert!(b.depends_on.contains(&a.id));
        assert!(a.blocked_by.contains(&b.id));
    }

    #[tokio::test]
    async fn add_dependency_rejects_self_reference() {
        let store = InMemoryTaskStore::new();
        let a = store
            .create_task("a", "", TaskType::Work, 2, None)
            .await
            .unwrap();
        let err = store.add_dependency(&a.id, &a.id).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn list_ready_only_returns_open_tasks_with_closed_dependencies() {
        let store = InMemoryTaskStore::new();
        let a = store
            .create_task("a", "", TaskType::Work, 2, None)
            .await
            .unwrap();
        let b = store
            .create_task("b", "", TaskType::Work, 2, None)
            .await
            .unwrap();
        store.add_dependency(&b.id, &a.id).await.unwrap();

        let ready = store.list_ready().await.unwrap();
        let ready_ids: Vec<_> = ready.iter().map(|t| t.id.clone()).collect();
        assert!(ready_ids.contains(&a.id));
        assert!(!ready_ids.contains(&b.id));

        store.close_task(&a.id, None).await.unwrap();
        let ready = store.list_ready().await.unwrap();
        let ready_ids: Vec<_> = ready.iter().map(|t| t.id.clone()).collect();
        assert!(ready_ids.contains(&b.id));
    }

    #[tokio::test]
    async fn close_task_is_idempotent() {
        let store = InMemoryTaskStore::new();
        let a = store
            .create_task("a", "", TaskType::Work, 2, None)
            .await
            .unwrap();
        let first = store.close_task(&a.id, Some("done")).await.unwrap();
        let second = store.close_task(&a.id, Some("done again")).await.unwrap();
        assert_eq!(first.closed_at, second.closed_at);
        assert_eq!(second.notes, "Close reason: done");
    }
}
