use crucible_ports::{Escalator, Executor, PortContext, Validator};
use crucible_store::TaskStore;
use crucible_trace::TraceWriter;
use crucible_types::{
    EscalationAction, Task, TaskPatch, TaskStatus, TraceEvent, TraceEventKind, ValidationOutcome,
};

use crate::error::OrchestratorError;

/// What happened to a leaf task once its retry loop ends. Mirrors the
/// persisted `Task.status` values it corresponds to, except `Failed`: a
/// human or fix escalation does not change `status` away from
/// `in_progress` (there is no persisted "failed" status), it only ever
/// gets reported up through the run result.
#[derive(Debug, Clone)]
pub enum Disposition {
    Closed,
    Failed(String),
    Blocked,
}

fn error_message(result: &crucible_types::WorkerResult) -> String {
    result
        .error_message
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "task failed without error details".to_string())
}

/// Drives one leaf task through execute/validate/escalate, bumping
/// `Task.attempts` and recording `last_error`/`last_validation` on the store
/// after every attempt. Only a failed *execution* retries, up to
/// `task.max_attempts` tries; a failed *validation* escalates immediately
/// with the validator's message as history rather than spending more of the
/// attempt budget re-running the executor.
pub struct RetryController<'a> {
    pub store: &'a dyn TaskStore,
    pub trace: &'a TraceWriter,
}

impl<'a> RetryController<'a> {
    pub async fn run_leaf(
        &self,
        ctx: &PortContext,
        executor: &dyn Executor,
        validator: &dyn Validator,
        escalator: &dyn Escalator,
        task: &Task,
    ) -> Result<Disposition, OrchestratorError> {
        let mut failure_history = String::new();
        let mut last_error = String::new();

        for attempt in 1..=task.max_attempts {
            if ctx.is_canceled() {
                return Err(OrchestratorError::Canceled);
            }

            let attempts_so_far = self
                .store
                .update_task(
                    &task.id,
                    TaskPatch {
                        attempts: Some(attempt),
                        ..Default::default()
                    },
                )
                .await?
                .attempts;
            debug_assert_eq!(attempts_so_far, attempt);

            self.trace
                .write_event(&TraceEvent::new(
                    task.id.clone(),
                    TraceEventKind::ExecutionStarted { attempt },
                ))
                .await?;
            let started = std::time::Instant::now();

            let result = executor.execute(ctx, task, attempt).await?;

            self.trace
                .write_event(&TraceEvent::new(
                    task.id.clone(),
                    TraceEventKind::ExecutionCompleted {
                        attempt,
                        success: result.success,
                        duration_ms: started.elapsed().as_millis() as u64,
                    },
                ))
                .await?;

            if !result.success {
                last_error = error_message(&result);
                self.store
                    .update_task(
                        &task.id,
                        TaskPatch {
                            last_error: Some(last_error.clone()),
                            ..Default::default()
                        },
                    )
                    .await?;
                failure_history.push_str(&format!("attempt {attempt}: {last_error}\n"));
                continue;
            }

            self.trace
                .write_event(&TraceEvent::new(
                    task.id.clone(),
                    TraceEventKind::ValidationStarted { attempt },
                ))
                .await?;
            let validation = validator.validate(ctx, task, &result).await?;
            self.trace
                .write_event(&TraceEvent::new(
                    task.id.clone(),
                    TraceEventKind::ValidationCompleted {
                        passed: validation.passed,
                        message: validation.message.clone(),
                    },
                ))
                .await?;

            self.store
                .update_task(
                    &task.id,
                    TaskPatch {
                        last_validation: Some(ValidationOutcome {
                            passed: validation.passed,
                            message: validation.message.clone(),
                        }),
                        ..Default::default()
                    },
                )
                .await?;

            if validation.passed {
                self.store.close_task(&task.id, None).await?;
                self.trace
                    .write_event(&TraceEvent::new(
                        task.id.clone(),
                        TraceEventKind::BeadStatusChanged {
                            status: TaskStatus::Closed,
                        },
                    ))
                    .await?;
                return Ok(Disposition::Closed);
            }

            last_error = validation.message.clone();
            failure_history.push_str(&format!(
                "attempt {attempt}: validation failed: {last_error}\n"
            ));
            break;
        }

        if last_error.is_empty() {
            last_error = "task failed without error details".to_string();
        }

        let decision = escalator
            .route(ctx, task, &failure_history, &last_error)
            .await?;

        self.trace
            .write_event(&TraceEvent::new(
                task.id.clone(),
                TraceEventKind::Escalation {
                    action: decision.action,
                    reason: decision.reason.clone(),
                },
            ))
            .await?;

        match decision.action {
            EscalationAction::Skip => {
                self.store
                    .update_status(&task.id, TaskStatus::Blocked)
                    .await?;
                self.trace
                    .write_event(&TraceEvent::new(
                        task.id.clone(),
                        TraceEventKind::BeadStatusChanged {
                            status: TaskStatus::Blocked,
                        },
                    ))
                    .await?;
                Ok(Disposition::Blocked)
            }
            EscalationAction::Human => Ok(Disposition::Failed(
                decision.human_question.unwrap_or(decision.reason),
            )),
            EscalationAction::Fix => {
                // The `fix` action is reserved: re-running the executor with
                // a fixer-authored prompt is a future extension. Until then
                // it is treated the same as a human escalation so a run
                // still terminates with a clear reason.
                Ok(Disposition::Failed(decision.reason))
            }
        }
    }
}
