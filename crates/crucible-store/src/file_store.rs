use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use crucible_types::{StoreError, Task, TaskId, TaskPatch, TaskStatus, TaskType};
use tokio::fs;
use tokio::sync::RwLock;

use crate::{mutate, TaskStore};

const TASKS_FILE: &str = "tasks.json";

/// JSON-file-backed `TaskStore`, standing in for a real external
/// task-tracker adapter. One document (`tasks.json`) holds the whole table,
/// read once at construction and rewritten after every mutation —
/// appropriate for the tens-to-low-hundreds of tasks a single run produces.
pub struct FileTaskStore {
    base: PathBuf,
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl FileTaskStore {
    pub async fn new(base: impl AsRef<Path>) -> anyhow::Result<Self> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base).await?;
        let tasks_path = base.join(TASKS_FILE);
        let tasks = if tasks_path.exists() {
            let raw = fs::read_to_string(&tasks_path).await?;
            serde_json::from_str::<HashMap<TaskId, Task>>(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Ok(Self {
            base,
            tasks: RwLock::new(tasks),
        })
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let snapshot = self.tasks.read().await.clone();
        let payload = serde_json::to_string_pretty(&snapshot)?;
        fs::write(self.base.join(TASKS_FILE), payload).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn create_task(
        &self,
        title: &str,
        description: &str,
        task_type: TaskType,
        priority: u8,
        parent_id: Option<TaskId>,
    ) -> Result<Task, StoreError> {
        let task = {
            let mut tasks = self.tasks.write().await;
            mutate::create_task(&mut tasks, title, description, task_type, priority, parent_id)?
        };
        self.flush()
            .await
            .map_err(|err| StoreError::Io(format!("flush failed: {err}")))?;
        Ok(task)
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        let tasks = self.tasks.read().await;
        mutate::get_task(&tasks, id)
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let task = {
            let mut tasks = self.tasks.write().await;
            mutate::update_task(&mut tasks, id, patch)?
        };
        self.flush()
            .await
            .map_err(|err| StoreError::Io(format!("flush failed: {err}")))?;
        Ok(task)
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<Task, StoreError> {
        let task = {
            let mut tasks = self.tasks.write().await;
            mutate::update_status(&mut tasks, id, status)?
        };
        self.flush()
            .await
            .map_err(|err| StoreError::Io(format!("flush failed: {err}")))?;
        Ok(task)
    }

    async fn close_task(&self, id: &TaskId, reason: Option<&str>) -> Result<Task, StoreError> {
        let task = {
            let mut tasks = self.tasks.write().await;
            mutate::close_task(&mut tasks, id, reason)?
        };
        self.flush()
            .await
            .map_err(|err| StoreError::Io(format!("flush failed: {err}")))?;
        Ok(task)
    }

    async fn add_dependency(
        &self,
        task_id: &TaskId,
        depends_on_id: &TaskId,
    ) -> Result<(), StoreError> {
        {
            let mut tasks = self.tasks.write().await;
            mutate::add_dependency(&mut tasks, task_id, depends_on_id)?;
        }
        self.flush()
            .await
            .map_err(|err| StoreError::Io(format!("flush failed: {err}")))?;
        Ok(())
    }

    async fn list_ready(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(mutate::list_ready(&tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn persists_tasks_across_reopen() {
        let base = std::env::temp_dir().join(format!("crucible-store-test-{}", Uuid::new_v4()));
        let store = FileTaskStore::new(&base).await.unwrap();
        let task = store
            .create_task("root", "desc", TaskType::Work, 1, None)
            .await
            .unwrap();

        let reopened = FileTaskStore::new(&base).await.unwrap();
        let fetched = reopened.get_task(&task.id).await.unwrap();
        assert_eq!(fetched.title, "root");
    }

    #[tokio::test]
    async fn add_dependency_rejects_unknown_task() {
        let base = std::env::temp_dir().join(format!("crucible-store-test-{}", Uuid::new_v4()));
        let store = FileTaskStore::new(&base).await.unwrap();
        let a = store
            .create_task("a", "", TaskType::Work, 1, None)
            .await
            .unwrap();
        let err = store
            .add_dependency(&a.id, &TaskId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
