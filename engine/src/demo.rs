use async_trait::async_trait;
use crucible_ports::{Escalator, Executor, Planner, PortContext};
use crucible_types::{
    EscalationAction, EscalationDecision, PlannerOutput, Size, SubtaskDefinition, Task, TaskType,
    WorkerResult,
};

/// Stands in for the real code-editing subprocess: always reports success.
/// Only meant to exercise the orchestrator's control flow end to end, not to
/// do any real work.
pub struct DemoExecutor;

#[async_trait]
impl Executor for DemoExecutor {
    async fn execute(
        &self,
        _ctx: &PortContext,
        task: &Task,
        attempt: u32,
    ) -> anyhow::Result<WorkerResult> {
        Ok(WorkerResult {
            success: true,
            summary: format!("demo executor completed '{}' on attempt {attempt}", task.title),
            output_files: Vec::new(),
            confidence: 1.0,
            questions: Vec::new(),
            error_message: None,
        })
    }
}

/// Routes every exhausted/failed leaf to `skip`, since there is no human to
/// ask and no fixer loop wired up in the demo binary.
pub struct DemoEscalator;

#[async_trait]
impl Escalator for DemoEscalator {
    async fn route(
        &self,
        _ctx: &PortContext,
        task: &Task,
        _failure_history: &str,
        last_error: &str,
    ) -> anyhow::Result<EscalationDecision> {
        Ok(EscalationDecision {
            action: EscalationAction::Skip,
            reason: format!("demo escalator skipping '{}': {last_error}", task.title),
            fixer_prompt: None,
            human_question: None,
        })
    }
}

/// Planner used by `--split-into`: splits the root task into a linear chain
/// of `n` `Xs` children (`child-1` depends on `child-0`, and so on), then
/// reports every non-root task as an already-`Xs` leaf so the demo run
/// terminates instead of recursing into another fan-out.
pub struct FanOutPlanner {
    fan_out: usize,
}

impl FanOutPlanner {
    pub fn new(fan_out: usize) -> Self {
        Self { fan_out }
    }
}

#[async_trait]
impl Planner for FanOutPlanner {
    async fn plan(&self, _ctx: &PortContext, task: &Task) -> anyhow::Result<PlannerOutput> {
        if task.parent_id.is_some() {
            return Ok(PlannerOutput {
                reasoning: "demo planner: child tasks are leaves".to_string(),
                size: Size::Xs,
                should_split: false,
                subtasks: Vec::new(),
            });
        }

        let subtasks = (0..self.fan_out)
            .map(|i| SubtaskDefinition {
                local_id: format!("child-{i}"),
                title: format!("{} — part {}", task.title, i + 1),
                description: String::new(),
                task_type: TaskType::Work,
                priority: task.priority,
                depends_on: if i == 0 {
                    Vec::new()
                } else {
                    vec![format!("child-{}", i - 1)]
                },
            })
            .collect();

        Ok(PlannerOutput {
            reasoning: format!("demo planner: fanning out into {} children", self.fan_out),
            size: Size::S,
            should_split: true,
            subtasks,
        })
    }
}
