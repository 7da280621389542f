use async_trait::async_trait;
use crucible_core::{OrchestratorConfig, RunCoordinator, RunPorts};
use crucible_ports::{AlwaysPassValidator, Escalator, Executor, Planner, PortContext};
use crucible_store::{InMemoryTaskStore, TaskStore};
use crucible_types::{
    EscalationAction, EscalationDecision, PlannerOutput, Size, SubtaskDefinition, Task, TaskType,
    WorkerResult,
};

struct AlwaysSucceedExecutor;

#[async_trait]
impl Executor for AlwaysSucceedExecutor {
    async fn execute(&self, _ctx: &PortContext, _task: &Task, _attempt: u32) -> anyhow::Result<WorkerResult> {
        Ok(WorkerResult {
            success: true,
            summary: "ok".to_string(),
            output_files: Vec::new(),
            confidence: 1.0,
            questions: Vec::new(),
            error_message: None,
        })
    }
}

struct UnreachableEscalator;

#[async_trait]
impl Escalator for UnreachableEscalator {
    async fn route(
        &self,
        _ctx: &PortContext,
        _task: &Task,
        _failure_history: &str,
        _last_error: &str,
    ) -> anyhow::Result<EscalationDecision> {
        panic!("escalator should not be reached in this scenario")
    }
}

fn linear_chain_planner_output() -> PlannerOutput {
    PlannerOutput {
        reasoning: "split into a linear chain".to_string(),
        size: Size::M,
        should_split: true,
        subtasks: vec![
            SubtaskDefinition {
                local_id: "a".to_string(),
                title: "a".to_string(),
                description: String::new(),
                task_type: TaskType::Work,
                priority: 2,
                depends_on: Vec::new(),
            },
            SubtaskDefinition {
                local_id: "b".to_string(),
                title: "b".to_string(),
                description: String::new(),
                task_type: TaskType::Work,
                priority: 2,
                depends_on: vec!["a".to_string()],
            },
            SubtaskDefinition {
                local_id: "c".to_string(),
                title: "c".to_string(),
                description: String::new(),
                task_type: TaskType::Work,
                priority: 2,
                depends_on: vec!["b".to_string()],
            },
        ],
    }
}

/// Splits the root into a linear `a -> b -> c` chain, then reports every
/// child as an `Xs` leaf.
struct LinearChainPlanner;

#[async_trait]
impl Planner for LinearChainPlanner {
    async fn plan(&self, _ctx: &PortContext, task: &Task) -> anyhow::Result<PlannerOutput> {
        if task.parent_id.is_some() {
            return Ok(PlannerOutput {
                reasoning: "leaf".to_string(),
                size: Size::Xs,
                should_split: false,
                subtasks: Vec::new(),
            });
        }
        Ok(linear_chain_planner_output())
    }
}

#[tokio::test]
async fn s1_trivial_xs_leaf_closes_and_summarizes() {
    let store = InMemoryTaskStore::new();
    let root = store
        .create_task("root", "tiny", TaskType::Work, 2, None)
        .await
        .unwrap();
    store
        .update_task(
            &root.id,
            crucible_types::TaskPatch {
                size: Some(Size::Xs),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let runs_root = tempfile::tempdir().unwrap();
    let coordinator = RunCoordinator::new(&store, runs_root.path());

    struct XsPlanner;
    #[async_trait]
    impl Planner for XsPlanner {
        async fn plan(&self, _ctx: &PortContext, _task: &Task) -> anyhow::Result<PlannerOutput> {
            Ok(PlannerOutput {
                reasoning: "already xs".to_string(),
                size: Size::Xs,
                should_split: false,
                subtasks: Vec::new(),
            })
        }
    }

    let summary = coordinator
        .run(
            root.id.clone(),
            None,
            RunPorts {
                planner: &XsPlanner,
                executor: &AlwaysSucceedExecutor,
                validator: &AlwaysPassValidator,
                escalator: &UnreachableEscalator,
            },
        )
        .await
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.tasks_total, 1);
    assert_eq!(summary.tasks_completed, 1);
    assert_eq!(summary.tasks_failed, 0);
    assert!(store.get_task(&root.id).await.unwrap().is_closed());

    let trace = std::fs::read_to_string(runs_root.path().join(&summary.run_id).join("trace.jsonl")).unwrap();
    for expected in [
        "task_started",
        "execution_started",
        "execution_completed",
        "validation_started",
        "validation_completed",
        "task_completed",
        "bead_status_changed",
    ] {
        assert!(trace.contains(expected), "missing `{expected}` in trace: {trace}");
    }
}

#[tokio::test]
async fn s2_one_level_split_with_linear_deps_closes_root() {
    let store = InMemoryTaskStore::new();
    let root = store
        .create_task("root", "needs splitting", TaskType::Work, 2, None)
        .await
        .unwrap();

    let runs_root = tempfile::tempdir().unwrap();
    let coordinator = RunCoordinator::new(&store, runs_root.path());

    let summary = coordinator
        .run(
            root.id.clone(),
            None,
            RunPorts {
                planner: &LinearChainPlanner,
                executor: &AlwaysSucceedExecutor,
                validator: &AlwaysPassValidator,
                escalator: &UnreachableEscalator,
            },
        )
        .await
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.tasks_total, 4);
    assert_eq!(summary.tasks_completed, 4);

    let root_after = store.get_task(&root.id).await.unwrap();
    assert!(root_after.is_closed());
    assert_eq!(root_after.children.len(), 3);
    for child_id in &root_after.children {
        assert!(store.get_task(child_id).await.unwrap().is_closed());
    }
}

#[tokio::test]
async fn s3_unresolved_local_id_rejects_split_without_partial_state() {
    let store = InMemoryTaskStore::new();
    let root = store
        .create_task("root", "bad split", TaskType::Work, 2, None)
        .await
        .unwrap();

    struct BadSplitPlanner;
    #[async_trait]
    impl Planner for BadSplitPlanner {
        async fn plan(&self, _ctx: &PortContext, _task: &Task) -> anyhow::Result<PlannerOutput> {
            Ok(PlannerOutput {
                reasoning: "references a nonexistent sibling".to_string(),
                size: Size::M,
                should_split: true,
                subtasks: vec![
                    SubtaskDefinition {
                        local_id: "a".to_string(),
                        title: "a".to_string(),
                        description: String::new(),
                        task_type: TaskType::Work,
                        priority: 2,
                        depends_on: Vec::new(),
                    },
                    SubtaskDefinition {
                        local_id: "b".to_string(),
                        title: "b".to_string(),
                        description: String::new(),
                        task_type: TaskType::Work,
                        priority: 2,
                        depends_on: vec!["nonexistent".to_string()],
                    },
                ],
            })
        }
    }

    let runs_root = tempfile::tempdir().unwrap();
    let coordinator = RunCoordinator::new(&store, runs_root.path());

    let summary = coordinator
        .run(
            root.id.clone(),
            None,
            RunPorts {
                planner: &BadSplitPlanner,
                executor: &AlwaysSucceedExecutor,
                validator: &AlwaysPassValidator,
                escalator: &UnreachableEscalator,
            },
        )
        .await
        .unwrap();

    assert!(!summary.success);
    let root_after = store.get_task(&root.id).await.unwrap();
    assert!(!root_after.is_closed());
    assert!(root_after.children.is_empty());
}

struct AlwaysFailExecutor;

#[async_trait]
impl Executor for AlwaysFailExecutor {
    async fn execute(&self, _ctx: &PortContext, _task: &Task, _attempt: u32) -> anyhow::Result<WorkerResult> {
        Ok(WorkerResult {
            success: false,
            summary: "stuck".to_string(),
            output_files: Vec::new(),
            confidence: 0.0,
            questions: Vec::new(),
            error_message: None,
        })
    }
}

struct HumanEscalator;

#[async_trait]
impl Escalator for HumanEscalator {
    async fn route(
        &self,
        _ctx: &PortContext,
        _task: &Task,
        failure_history: &str,
        _last_error: &str,
    ) -> anyhow::Result<EscalationDecision> {
        assert_eq!(failure_history.matches("attempt").count(), 3);
        Ok(EscalationDecision {
            action: EscalationAction::Human,
            reason: "needs a human to unstick this".to_string(),
            fixer_prompt: None,
            human_question: Some("what should happen here?".to_string()),
        })
    }
}

struct XsPlanner;

#[async_trait]
impl Planner for XsPlanner {
    async fn plan(&self, _ctx: &PortContext, _task: &Task) -> anyhow::Result<PlannerOutput> {
        Ok(PlannerOutput {
            reasoning: "already xs".to_string(),
            size: Size::Xs,
            should_split: false,
            subtasks: Vec::new(),
        })
    }
}

#[tokio::test]
async fn s4_nil_error_failed_result_escalates_to_human() {
    let store = InMemoryTaskStore::new();
    let root = store
        .create_task("root", "always fails", TaskType::Work, 2, None)
        .await
        .unwrap();

    let runs_root = tempfile::tempdir().unwrap();
    let coordinator = RunCoordinator::new(&store, runs_root.path());

    let summary = coordinator
        .run(
            root.id.clone(),
            None,
            RunPorts {
                planner: &XsPlanner,
                executor: &AlwaysFailExecutor,
                validator: &AlwaysPassValidator,
                escalator: &HumanEscalator,
            },
        )
        .await
        .unwrap();

    assert!(!summary.success);
    let root_after = store.get_task(&root.id).await.unwrap();
    assert_eq!(root_after.attempts, root_after.max_attempts);
    assert_eq!(
        root_after.last_error.as_deref(),
        Some("task failed without error details")
    );
}

struct SkipEscalator;

#[async_trait]
impl Escalator for SkipEscalator {
    async fn route(
        &self,
        _ctx: &PortContext,
        _task: &Task,
        _failure_history: &str,
        _last_error: &str,
    ) -> anyhow::Result<EscalationDecision> {
        Ok(EscalationDecision {
            action: EscalationAction::Skip,
            reason: "giving up on this one".to_string(),
            fixer_prompt: None,
            human_question: None,
        })
    }
}

/// Splits the root into a single always-failing leaf, so the parent's
/// `run_children` observes a `Blocked` child.
struct SingleLeafPlanner;

#[async_trait]
impl Planner for SingleLeafPlanner {
    async fn plan(&self, _ctx: &PortContext, task: &Task) -> anyhow::Result<PlannerOutput> {
        if task.parent_id.is_some() {
            return Ok(PlannerOutput {
                reasoning: "leaf".to_string(),
                size: Size::Xs,
                should_split: false,
                subtasks: Vec::new(),
            });
        }
        Ok(PlannerOutput {
            reasoning: "split into one child".to_string(),
            size: Size::M,
            should_split: true,
            subtasks: vec![SubtaskDefinition {
                local_id: "only-child".to_string(),
                title: "only child".to_string(),
                description: String::new(),
                task_type: TaskType::Work,
                priority: 2,
                depends_on: Vec::new(),
            }],
        })
    }
}

#[tokio::test]
async fn s5_escalation_to_skip_blocks_child_and_keeps_parent_open() {
    let store = InMemoryTaskStore::new();
    let root = store
        .create_task("root", "has one doomed child", TaskType::Work, 2, None)
        .await
        .unwrap();

    let runs_root = tempfile::tempdir().unwrap();
    let coordinator = RunCoordinator::new(&store, runs_root.path());

    let summary = coordinator
        .run(
            root.id.clone(),
            None,
            RunPorts {
                planner: &SingleLeafPlanner,
                executor: &AlwaysFailExecutor,
                validator: &AlwaysPassValidator,
                escalator: &SkipEscalator,
            },
        )
        .await
        .unwrap();

    assert!(!summary.success);
    let root_after = store.get_task(&root.id).await.unwrap();
    assert!(!root_after.is_closed());
    assert_eq!(root_after.children.len(), 1);

    let child = store.get_task(&root_after.children[0]).await.unwrap();
    assert!(matches!(child.status, crucible_types::TaskStatus::Blocked));

    let trace = std::fs::read_to_string(runs_root.path().join(&summary.run_id).join("trace.jsonl")).unwrap();
    assert!(
        trace.contains("\"event_type\":\"bead_status_changed\"") && trace.contains("\"status\":\"blocked\""),
        "missing a blocked bead_status_changed event in trace: {trace}"
    );
}

/// Always reports a task as needing further splitting into exactly one
/// child, regardless of depth — used to exercise the depth cap.
struct InfiniteSplitPlanner;

#[async_trait]
impl Planner for InfiniteSplitPlanner {
    async fn plan(&self, _ctx: &PortContext, task: &Task) -> anyhow::Result<PlannerOutput> {
        Ok(PlannerOutput {
            reasoning: "always splits further".to_string(),
            size: Size::M,
            should_split: true,
            subtasks: vec![SubtaskDefinition {
                local_id: "deeper".to_string(),
                title: format!("{} - deeper", task.title),
                description: String::new(),
                task_type: TaskType::Work,
                priority: 2,
                depends_on: Vec::new(),
            }],
        })
    }
}

#[tokio::test]
async fn s6_depth_cap_fails_without_infinite_recursion() {
    let store = InMemoryTaskStore::new();
    let root = store
        .create_task("root", "never bottoms out", TaskType::Work, 2, None)
        .await
        .unwrap();

    let runs_root = tempfile::tempdir().unwrap();
    let config = OrchestratorConfig {
        max_depth: 2,
        max_attempts: 3,
    };
    let coordinator = RunCoordinator::with_config(&store, runs_root.path(), config);

    let summary = coordinator
        .run(
            root.id.clone(),
            None,
            RunPorts {
                planner: &InfiniteSplitPlanner,
                executor: &AlwaysSucceedExecutor,
                validator: &AlwaysPassValidator,
                escalator: &UnreachableEscalator,
            },
        )
        .await
        .unwrap();

    assert!(!summary.success);
    assert!(summary
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("max recursion depth"));

    let trace = std::fs::read_to_string(runs_root.path().join(&summary.run_id).join("trace.jsonl")).unwrap();
    assert!(trace.contains("\"success\":false"));
}
