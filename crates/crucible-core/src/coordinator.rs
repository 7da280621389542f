use std::path::Path;

use crucible_ports::{Escalator, Executor, Planner, PortContext, Validator};
use crucible_store::TaskStore;
use crucible_trace::TraceWriter;
use crucible_types::{RunSummary, TaskId, TaskPatch, TraceEvent, TraceEventKind};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::orchestrator::{Orchestrator, TaskOutcome};

/// Ports a full run needs. Bundled so callers (the `crucible-engine` binary,
/// integration tests) assemble the Planner/Executor/Validator/Escalator
/// quartet once and hand it to [`RunCoordinator::run`] as a unit.
pub struct RunPorts<'a> {
    pub planner: &'a dyn Planner,
    pub executor: &'a dyn Executor,
    pub validator: &'a dyn Validator,
    pub escalator: &'a dyn Escalator,
}

/// Owns one run end to end: mints the run id, opens the trace writer,
/// drives the [`Orchestrator`] from the root task, and finalizes
/// `run.json`. One instance per run.
pub struct RunCoordinator<'a> {
    pub store: &'a dyn TaskStore,
    pub runs_root: &'a Path,
    pub config: OrchestratorConfig,
    pub cancellation: CancellationToken,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(store: &'a dyn TaskStore, runs_root: &'a Path) -> Self {
        Self::with_config(store, runs_root, OrchestratorConfig::default())
    }

    pub fn with_config(
        store: &'a dyn TaskStore,
        runs_root: &'a Path,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            runs_root,
            config,
            cancellation: CancellationToken::new(),
        }
    }

    pub async fn run(
        &self,
        root_task_id: TaskId,
        spec_file: Option<String>,
        ports: RunPorts<'a>,
    ) -> Result<RunSummary, OrchestratorError> {
        self.store
            .update_task(
                &root_task_id,
                TaskPatch {
                    max_attempts: Some(self.config.max_attempts),
                    ..Default::default()
                },
            )
            .await?;

        let run_id = Uuid::new_v4().to_string();
        tracing::info!(run_id = %run_id, root_task_id = %root_task_id, "run starting");
        let trace = TraceWriter::create(self.runs_root, &run_id).await?;
        let mut summary = RunSummary::new(run_id.clone(), root_task_id.clone(), spec_file.clone());
        trace.write_summary(&summary).await?;

        trace
            .write_event(&TraceEvent::new(
                root_task_id.clone(),
                TraceEventKind::RunStarted {
                    run_id: run_id.clone(),
                    spec_file,
                },
            ))
            .await?;

        let ctx = PortContext::new(run_id.clone(), self.cancellation.clone());
        let orchestrator = Orchestrator {
            store: self.store,
            trace: &trace,
            planner: ports.planner,
            executor: ports.executor,
            validator: ports.validator,
            escalator: ports.escalator,
            ctx,
            max_depth: self.config.max_depth,
        };

        let result = orchestrator.process_task(&root_task_id, 0).await;

        let (success, error_message) = match &result {
            Ok(TaskOutcome::Closed) => (true, None),
            Ok(TaskOutcome::Blocked) => (false, Some("root task was skipped".to_string())),
            Ok(TaskOutcome::Failed { reason }) => (false, Some(reason.clone())),
            Err(err) => (false, Some(err.to_string())),
        };

        let (total, completed, failed) = aggregate_task_counts(trace.run_dir()).await?;
        summary.tasks_total = total;
        summary.tasks_completed = completed;
        summary.tasks_failed = failed;
        summary.finalize(success, error_message);

        trace.write_summary(&summary).await?;
        trace.close().await?;
        tracing::info!(run_id = %run_id, success, "run finished");

        match result {
            Ok(_) => Ok(summary),
            Err(err) => Err(err),
        }
    }

    /// Requests cooperative cancellation of an in-flight run. Takes effect
    /// at the next Port call or retry-loop iteration boundary.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

/// Counts tasks started and, among those, how many completed successfully
/// versus not, by replaying `trace.jsonl` after the run rather than
/// threading manual counters through the orchestrator and retry controller.
/// A `TaskStarted` event is emitted exactly once per task per run, so
/// counting them is equivalent to counting distinct tasks touched.
async fn aggregate_task_counts(run_dir: &Path) -> Result<(u64, u64, u64), OrchestratorError> {
    let raw = fs::read_to_string(run_dir.join("trace.jsonl"))
        .await
        .map_err(crucible_trace::TraceError::from)?;
    let mut total = 0u64;
    let mut completed = 0u64;
    let mut failed = 0u64;

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(line).map_err(crucible_trace::TraceError::from)?;
        match event.kind {
            TraceEventKind::TaskStarted { .. } => total += 1,
            TraceEventKind::TaskCompleted { success, .. } => {
                if success {
                    completed += 1;
                } else {
                    failed += 1;
                }
            }
            _ => {}
        }
    }

    Ok((total, completed, failed))
}
