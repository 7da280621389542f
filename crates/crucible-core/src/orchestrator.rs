use crucible_ports::{Escalator, Executor, Planner, PortContext, Validator};
use crucible_store::TaskStore;
use crucible_trace::TraceWriter;
use crucible_types::{Task, TaskId, TaskPatch, TaskStatus, TraceEvent, TraceEventKind};

use crate::error::OrchestratorError;
use crate::resolver::resolve_split;
use crate::retry::{Disposition, RetryController};

/// Default cap on recursion depth; exceeding it fails the offending task
/// without aborting the run unless the task in question is the root.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Terminal result of processing one task (and, transitively, everything
/// beneath it). Not the same thing as `Task.status`: a task can be
/// `TaskOutcome::Failed` while its persisted status stays `in_progress` —
/// only `skip` escalations and closes mutate status.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Closed,
    Blocked,
    Failed { reason: String },
}

pub struct Orchestrator<'a> {
    pub store: &'a dyn TaskStore,
    pub trace: &'a TraceWriter,
    pub planner: &'a dyn Planner,
    pub executor: &'a dyn Executor,
    pub validator: &'a dyn Validator,
    pub escalator: &'a dyn Escalator,
    pub ctx: PortContext,
    pub max_depth: u32,
}

impl<'a> Orchestrator<'a> {
    /// Processes one task to completion: dispatches to planning (for
    /// non-leaf-sized or not-yet-sized tasks) or straight to the retry loop
    /// (for tasks already sized `Xs`), recursing into children as the
    /// planner's split demands.
    pub async fn process_task(
        &self,
        task_id: &TaskId,
        depth: u32,
    ) -> Result<TaskOutcome, OrchestratorError> {
        if self.ctx_canceled() {
            return Err(OrchestratorError::Canceled);
        }

        let task = self.store.get_task(task_id).await?;
        self.store
            .update_status(task_id, TaskStatus::InProgress)
            .await?;
        self.trace
            .write_event(&TraceEvent::new(
                task_id.clone(),
                TraceEventKind::BeadStatusChanged {
                    status: TaskStatus::InProgress,
                },
            ))
            .await?;
        self.trace
            .write_event(&TraceEvent::new(
                task_id.clone(),
                TraceEventKind::TaskStarted { depth },
            ))
            .await?;
        tracing::info!(task_id = %task_id, depth, title = %task.title, "task started");

        let outcome = self.dispatch(&task, depth).await;

        let (success, reason) = match &outcome {
            Ok(TaskOutcome::Closed) => (true, None),
            Ok(TaskOutcome::Blocked) => (false, Some("skipped by escalation".to_string())),
            Ok(TaskOutcome::Failed { reason }) => (false, Some(reason.clone())),
            Err(err) => (false, Some(err.to_string())),
        };
        tracing::info!(task_id = %task_id, success, reason = ?reason, "task completed");
        self.trace
            .write_event(&TraceEvent::new(
                task_id.clone(),
                TraceEventKind::TaskCompleted { success, reason },
            ))
            .await?;

        outcome
    }

    async fn dispatch(&self, task: &Task, depth: u32) -> Result<TaskOutcome, OrchestratorError> {
        if task.is_leaf_ready() {
            return self.run_leaf(task).await;
        }

        if depth >= self.max_depth {
            return Ok(TaskOutcome::Failed {
                reason: format!(
                    "max recursion depth {} exceeded before task could be sized",
                    self.max_depth
                ),
            });
        }

        self.trace
            .write_event(&TraceEvent::new(
                task.id.clone(),
                TraceEventKind::PlanningStarted,
            ))
            .await?;
        let plan = self.planner.plan(&self.port_ctx(), task).await?;
        self.trace
            .write_event(&TraceEvent::new(
                task.id.clone(),
                TraceEventKind::PlanningCompleted {
                    size: plan.size,
                    should_split: plan.should_split,
                    subtask_count: plan.subtasks.len(),
                },
            ))
            .await?;

        self.store
            .update_task(
                &task.id,
                TaskPatch {
                    size: Some(plan.size),
                    ..Default::default()
                },
            )
            .await?;

        if !plan.should_split {
            let sized = self.store.get_task(&task.id).await?;
            return self.run_leaf(&sized).await;
        }

        if plan.subtasks.is_empty() {
            return Ok(TaskOutcome::Failed {
                reason: "planner declared a split with no subtasks".to_string(),
            });
        }

        let child_ids = match resolve_split(self.store, &task.id, &plan.subtasks, task.max_attempts)
            .await
        {
            Ok(ids) => ids,
            Err(err) => {
                return Ok(TaskOutcome::Failed {
                    reason: err.to_string(),
                })
            }
        };
        for local in &plan.subtasks {
            self.trace
                .write_event(&TraceEvent::new(
                    task.id.clone(),
                    TraceEventKind::BeadCreated {
                        local_id: local.local_id.clone(),
                    },
                ))
                .await?;
        }

        self.run_children(&child_ids, depth + 1).await
    }

    async fn run_leaf(&self, task: &Task) -> Result<TaskOutcome, OrchestratorError> {
        let controller = RetryController {
            store: self.store,
            trace: self.trace,
        };
        let disposition = controller
            .run_leaf(
                &self.port_ctx(),
                self.executor,
                self.validator,
                self.escalator,
                task,
            )
            .await?;
        Ok(match disposition {
            Disposition::Closed => TaskOutcome::Closed,
            Disposition::Blocked => TaskOutcome::Blocked,
            Disposition::Failed(reason) => TaskOutcome::Failed { reason },
        })
    }

    /// Runs every child of a split to completion, closing the parent only if
    /// all children close. Scheduling is round-robin rather than a single
    /// pass over `child_ids` in order: a child is skipped on a pass until
    /// every task it `depends_on` has closed, so declaration order need not
    /// match a topological order as long as the graph (already validated
    /// acyclic by the resolver) allows one. Still single-threaded and
    /// depth-first overall; that is the simplest implementation that
    /// honors both constraints at once.
    async fn run_children(
        &self,
        child_ids: &[TaskId],
        depth: u32,
    ) -> Result<TaskOutcome, OrchestratorError> {
        let mut pending: Vec<TaskId> = child_ids.to_vec();
        let mut worst: Option<TaskOutcome> = None;

        while !pending.is_empty() {
            let mut made_progress = false;
            let mut still_pending = Vec::with_capacity(pending.len());

            for child_id in pending {
                let child = self.store.get_task(&child_id).await?;
                if !self.dependencies_closed(&child).await? {
                    still_pending.push(child_id);
                    continue;
                }

                made_progress = true;
                let outcome = self.process_task(&child_id, depth).await?;
                if !matches!(outcome, TaskOutcome::Closed) {
                    worst = Some(worst_of(worst, outcome));
                }
            }

            pending = still_pending;
            if !made_progress {
                // Remaining children can never start: their dependencies
                // are blocked or failed, not merely not-yet-closed.
                for stuck in &pending {
                    worst = Some(worst_of(
                        worst,
                        TaskOutcome::Failed {
                            reason: format!("task {stuck} permanently blocked on a dependency"),
                        },
                    ));
                }
                break;
            }
        }

        match worst {
            None => {
                let parent_id = self.parent_of(child_ids).await?;
                self.store.close_task(&parent_id, None).await?;
                self.trace
                    .write_event(&TraceEvent::new(
                        parent_id,
                        TraceEventKind::BeadStatusChanged {
                            status: TaskStatus::Closed,
                        },
                    ))
                    .await?;
                Ok(TaskOutcome::Closed)
            }
            Some(outcome) => Ok(outcome),
        }
    }

    async fn dependencies_closed(&self, task: &Task) -> Result<bool, OrchestratorError> {
        for dep in &task.depends_on {
            if !self.store.get_task(dep).await?.is_closed() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn parent_of(&self, child_ids: &[TaskId]) -> Result<TaskId, OrchestratorError> {
        let first = child_ids
            .first()
            .expect("run_children called with at least one child");
        let child = self.store.get_task(first).await?;
        child
            .parent_id
            .ok_or_else(|| OrchestratorError::DependencyCycle(vec![first.to_string()]))
    }

    fn port_ctx(&self) -> PortContext {
        self.ctx.clone()
    }

    fn ctx_canceled(&self) -> bool {
        self.ctx.is_canceled()
    }
}

/// Combines two non-`Closed` child outcomes, keeping whichever ranks worse:
/// `Failed` (with its first-seen reason) outranks `Blocked`.
fn worst_of(current: Option<TaskOutcome>, candidate: TaskOutcome) -> TaskOutcome {
    match current {
        None => candidate,
        Some(TaskOutcome::Failed { reason }) => TaskOutcome::Failed { reason },
        Some(TaskOutcome::Blocked) => match candidate {
            TaskOutcome::Failed { reason } => TaskOutcome::Failed { reason },
            _ => TaskOutcome::Blocked,
        },
        Some(other) => other,
    }
}
