mod context;
#[cfg(any(test, feature = "test-support"))]
mod stubs;

pub use context::PortContext;
#[cfg(any(test, feature = "test-support"))]
pub use stubs::{AlwaysPassValidator, StaticPlanner};

use async_trait::async_trait;
use crucible_types::{
    EscalationDecision, PlannerOutput, Task, ValidationResult, WorkerResult,
};

/// Given a task's title, description, and free-form context, decides a size
/// and, if not `Xs`, either decomposes the task or reports that it cannot.
/// The orchestrator enforces the shape invariants on the result (non-empty
/// subtasks when `should_split`, no self/duplicate/unresolved local ids); the
/// Planner itself owns no state and mutates nothing.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, ctx: &PortContext, task: &Task) -> anyhow::Result<PlannerOutput>;
}

/// Invokes the external code-editing subprocess for one attempt at a leaf
/// task. `attempt` is 1-based. May fail with a transport error or return a
/// [`WorkerResult`] with `success: false`; the retry controller handles both
/// without distinguishing them beyond error-message precedence.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        ctx: &PortContext,
        task: &Task,
        attempt: u32,
    ) -> anyhow::Result<WorkerResult>;
}

/// Judges a [`WorkerResult`] against the task's requirements. Must be pure
/// with respect to the engine — no store mutations — and tolerant of
/// `result.success == false`.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        ctx: &PortContext,
        task: &Task,
        result: &WorkerResult,
    ) -> anyhow::Result<ValidationResult>;
}

/// Routes a task whose attempts are exhausted (or whose result failed
/// validation) to a disposition: retry via a guided fix, surface to a human,
/// or skip. Deterministic on the tagged action; the reason text is
/// mandatory.
#[async_trait]
pub trait Escalator: Send + Sync {
    async fn route(
        &self,
        ctx: &PortContext,
        task: &Task,
        failure_history: &str,
        last_error: &str,
    ) -> anyhow::Result<EscalationDecision>;
}
