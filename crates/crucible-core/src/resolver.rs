use std::collections::{HashMap, HashSet};

use crucible_store::TaskStore;
use crucible_types::{SubtaskDefinition, TaskId, TaskPatch};

use crate::error::OrchestratorError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Checks a proposed split for structural validity without touching the
/// store: no duplicate `local_id`, no self-dependency, every `depends_on`
/// entry resolves to a `local_id` declared in the same split, and the
/// dependency graph among local ids is acyclic. Run in full before
/// [`resolve_split`] creates a single task, so a malformed split leaves no
/// partial state.
fn pre_validate(subtasks: &[SubtaskDefinition]) -> Result<(), OrchestratorError> {
    let mut seen = HashSet::with_capacity(subtasks.len());
    for subtask in subtasks {
        if !seen.insert(subtask.local_id.as_str()) {
            return Err(OrchestratorError::DuplicateLocalId(
                subtask.local_id.clone(),
            ));
        }
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::with_capacity(subtasks.len());
    for subtask in subtasks {
        for dep in &subtask.depends_on {
            if dep == &subtask.local_id {
                return Err(OrchestratorError::SelfDependency(subtask.local_id.clone()));
            }
            if !seen.contains(dep.as_str()) {
                return Err(OrchestratorError::UnresolvedDependency(dep.clone()));
            }
        }
        adjacency.insert(&subtask.local_id, subtask.depends_on.iter().map(String::as_str).collect());
    }

    let mut marks: HashMap<&str, Mark> = adjacency.keys().map(|id| (*id, Mark::Unvisited)).collect();
    for subtask in subtasks {
        detect_cycle(subtask.local_id.as_str(), &adjacency, &mut marks)?;
    }
    Ok(())
}

fn detect_cycle<'a>(
    node: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
) -> Result<(), OrchestratorError> {
    match marks.get(node) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            return Err(OrchestratorError::DependencyCycle(vec![
                node.to_string(),
                node.to_string(),
            ]))
        }
        _ => {}
    }

    marks.insert(node, Mark::InProgress);
    if let Some(deps) = adjacency.get(node) {
        for &dep in deps {
            if let Err(OrchestratorError::DependencyCycle(mut path)) =
                detect_cycle(dep, adjacency, marks)
            {
                path.insert(0, node.to_string());
                return Err(OrchestratorError::DependencyCycle(path));
            }
        }
    }
    marks.insert(node, Mark::Done);
    Ok(())
}

/// Materializes a planner-proposed split into store-backed tasks and wires
/// their dependency edges, in two phases: first every subtask is created as
/// a child of `parent_id` (so `local_id -> TaskId` resolves for every
/// declared id), then every declared `depends_on` edge is added — by the
/// time phase two runs, [`pre_validate`] has already ruled out every way
/// that could fail.
pub async fn resolve_split(
    store: &dyn TaskStore,
    parent_id: &TaskId,
    subtasks: &[SubtaskDefinition],
    max_attempts: u32,
) -> Result<Vec<TaskId>, OrchestratorError> {
    pre_validate(subtasks)?;

    let mut local_to_store: HashMap<&str, TaskId> = HashMap::with_capacity(subtasks.len());
    let mut created = Vec::with_capacity(subtasks.len());

    for subtask in subtasks {
        let task = store
            .create_task(
                &subtask.title,
                &subtask.description,
                subtask.task_type,
                subtask.priority,
                Some(parent_id.clone()),
            )
            .await?;
        store
            .update_task(
                &task.id,
                TaskPatch {
                    max_attempts: Some(max_attempts),
                    ..Default::default()
                },
            )
            .await?;
        local_to_store.insert(subtask.local_id.as_str(), task.id.clone());
        created.push(task.id);
    }

    for subtask in subtasks {
        let dependent = local_to_store
            .get(subtask.local_id.as_str())
            .expect("created above");
        for dep_local_id in &subtask.depends_on {
            let dependency = local_to_store
                .get(dep_local_id.as_str())
                .expect("checked by pre_validate");
            store.add_dependency(dependent, dependency).await?;
        }
    }

    Ok(created)
}
