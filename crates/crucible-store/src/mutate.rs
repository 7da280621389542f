use std::collections::HashMap;

use chrono::Utc;
use crucible_types::{StoreError, Task, TaskId, TaskPatch, TaskStatus, TaskType};
use uuid::Uuid;

use crate::{validate_priority, validate_title};

pub(crate) fn create_task(
    tasks: &mut HashMap<TaskId, Task>,
    title: &str,
    description: &str,
    task_type: TaskType,
    priority: u8,
    parent_id: Option<TaskId>,
) -> Result<Task, StoreError> {
    validate_title(title)?;
    validate_priority(priority)?;
    if let Some(parent) = &parent_id {
        if !tasks.contains_key(parent) {
            return Err(StoreError::NotFound(parent.clone()));
        }
    }

    let now = Utc::now();
    let id = TaskId::new(Uuid::new_v4().to_string());
    let task = Task {
        id: id.clone(),
        title: title.to_string(),
        description: description.to_string(),
        notes: String::new(),
        task_type,
        priority,
        size: None,
        status: TaskStatus::Open,
        parent_id: parent_id.clone(),
        children: Vec::new(),
        depends_on: Default::default(),
        blocked_by: Default::default(),
        assignee: None,
        attempts: 0,
        max_attempts: 3,
        last_error: None,
        last_validation_passed: None,
        last_validation_message: None,
        created_at: now,
        updated_at: now,
        closed_at: None,
    };

    if let Some(parent) = parent_id {
        if let Some(parent_task) = tasks.get_mut(&parent) {
            parent_task.children.push(id.clone());
        }
    }
    tasks.insert(id, task.clone());
    Ok(task)
}

pub(crate) fn get_task(tasks: &HashMap<TaskId, Task>, id: &TaskId) -> Result<Task, StoreError> {
    tasks
        .get(id)
        .cloned()
        .ok_or_else(|| StoreError::NotFound(id.clone()))
}

pub(crate) fn update_task(
    tasks: &mut HashMap<TaskId, Task>,
    id: &TaskId,
    patch: TaskPatch,
) -> Result<Task, StoreError> {
    if let Some(priority) = patch.priority {
        validate_priority(priority)?;
    }
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }

    let task = tasks
        .get_mut(id)
        .ok_or_else(|| StoreError::NotFound(id.clone()))?;

    if let Some(title) = patch.title {
        task.title = title;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(notes) = patch.notes {
        task.notes = notes;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(size) = patch.size {
        task.size = Some(size);
    }
    if let Some(assignee) = patch.assignee {
        task.assignee = Some(assignee);
    }
    if let Some(attempts) = patch.attempts {
        task.attempts = attempts;
    }
    if let Some(max_attempts) = patch.max_attempts {
        task.max_attempts = max_attempts;
    }
    if let Some(last_error) = patch.last_error {
        task.last_error = Some(last_error);
    }
    if let Some(outcome) = patch.last_validation {
        task.last_validation_passed = Some(outcome.passed);
        task.last_validation_message = Some(outcome.message);
    }
    if let Some(status) = patch.status {
        task.status = status;
        if matches!(status, TaskStatus::Closed) {
            task.closed_at = Some(Utc::now());
        }
    }
    task.updated_at = Utc::now();
    Ok(task.clone())
}

pub(crate) fn update_status(
    tasks: &mut HashMap<TaskId, Task>,
    id: &TaskId,
    status: TaskStatus,
) -> Result<Task, StoreError> {
    update_task(tasks, id, TaskPatch::status(status))
}

pub(crate) fn close_task(
    tasks: &mut HashMap<TaskId, Task>,
    id: &TaskId,
    reason: Option<&str>,
) -> Result<Task, StoreError> {
    let task = tasks
        .get_mut(id)
        .ok_or_else(|| StoreError::NotFound(id.clone()))?;

    if task.is_closed() {
        return Ok(task.clone());
    }

    task.status = TaskStatus::Closed;
    task.closed_at = Some(Utc::now());
    task.updated_at = task.closed_at.unwrap();
    if let Some(reason) = reason {
        if !task.notes.is_empty() {
            task.notes.push('\n');
        }
        task.notes.push_str(&format!("Close reason: {reason}"));
    }
    Ok(task.clone())
}

pub(crate) fn add_dependency(
    tasks: &mut HashMap<TaskId, Task>,
    task_id: &TaskId,
    depends_on_id: &TaskId,
) -> Result<(), StoreError> {
    if task_id == depends_on_id {
        return Err(StoreError::InvalidArgument(format!(
            "task {task_id} cannot depend on itself"
        )));
    }
    if !tasks.contains_key(task_id) {
        return Err(StoreError::NotFound(task_id.clone()));
    }
    if !tasks.contains_key(depends_on_id) {
        return Err(StoreError::NotFound(depends_on_id.clone()));
    }

    let already_present = tasks
        .get(task_id)
        .map(|t| t.depends_on.contains(depends_on_id))
        .unwrap_or(false);
    if already_present {
        return Ok(());
    }

    tasks
        .get_mut(task_id)
        .expect("checked above")
        .depends_on
        .insert(depends_on_id.clone());
    tasks
        .get_mut(depends_on_id)
        .expect("checked above")
        .blocked_by
        .insert(task_id.clone());
    Ok(())
}

pub(crate) fn list_ready(tasks: &HashMap<TaskId, Task>) -> Vec<Task> {
    tasks
        .values()
        .filter(|task| {
            matches!(task.status, TaskStatus::Open)
                && task
                    .depends_on
                    .iter()
                    .all(|dep| tasks.get(dep).is_some_and(Task::is_closed))
        })
        .cloned()
        .collect()
}
