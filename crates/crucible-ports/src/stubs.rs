#![cfg(any(test, feature = "test-support"))]

use async_trait::async_trait;
use crucible_types::{PlannerOutput, Task, ValidationResult};

use crate::{Planner, PortContext, Validator};

/// A Planner that always returns the same canned output, regardless of the
/// task passed in. Used by `crucible-core`'s and `crucible-engine`'s tests
/// in place of a real model-backed planner.
pub struct StaticPlanner {
    output: PlannerOutput,
}

impl StaticPlanner {
    pub fn new(output: PlannerOutput) -> Self {
        Self { output }
    }
}

#[async_trait]
impl Planner for StaticPlanner {
    async fn plan(&self, _ctx: &PortContext, _task: &Task) -> anyhow::Result<PlannerOutput> {
        Ok(self.output.clone())
    }
}

/// A Validator that always passes. Useful for exercising the
/// execute/escalate path in isolation from validation semantics.
pub struct AlwaysPassValidator;

#[async_trait]
impl Validator for AlwaysPassValidator {
    async fn validate(
        &self,
        _ctx: &PortContext,
        _task: &Task,
        _result: &crucible_types::WorkerResult,
    ) -> anyhow::Result<ValidationResult> {
        Ok(ValidationResult {
            passed: true,
            message: "ok".to_string(),
            failures: Vec::new(),
        })
    }
}
