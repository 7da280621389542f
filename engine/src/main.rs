mod demo;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crucible_core::{OrchestratorConfig, RunCoordinator, RunPorts};
use crucible_ports::{AlwaysPassValidator, Planner, StaticPlanner};
use crucible_store::{FileTaskStore, TaskStore};
use crucible_trace::{canonical_logs_dir_from_root, init_process_logging, ProcessKind};
use crucible_types::{PlannerOutput, Size, TaskId, TaskType};

use demo::{DemoEscalator, DemoExecutor, FanOutPlanner};

#[derive(Parser, Debug)]
#[command(name = "crucible-engine")]
#[command(about = "Demo binary for the crucible recursive task orchestrator")]
struct Cli {
    #[arg(long, env = "CRUCIBLE_STATE_DIR", default_value = ".crucible")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a root task and runs it through the orchestrator using the
    /// in-process demo ports (a canned planner, an always-succeeding
    /// executor, a pass-through validator, a skip-only escalator).
    Run {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = 10)]
        max_depth: u32,
        #[arg(long, default_value_t = 3)]
        max_attempts: u32,
        /// Ask the demo planner to split into this many Xs children instead
        /// of treating the root as a single leaf.
        #[arg(long, default_value_t = 0)]
        split_into: usize,
    },
    /// Prints the current state of a task tracked in `--state-dir`.
    Show { task_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logs_dir = canonical_logs_dir_from_root(&cli.state_dir);
    let (_guard, _logging_info) = init_process_logging(ProcessKind::Engine, &logs_dir)?;

    let store = FileTaskStore::new(&cli.state_dir.join("tasks"))
        .await
        .context("opening task store")?;

    match cli.command {
        Command::Run {
            title,
            description,
            max_depth,
            max_attempts,
            split_into,
        } => run_demo(&store, &cli.state_dir, title, description, max_depth, max_attempts, split_into).await,
        Command::Show { task_id } => show_task(&store, TaskId::new(task_id)).await,
    }
}

async fn run_demo(
    store: &FileTaskStore,
    state_dir: &std::path::Path,
    title: String,
    description: String,
    max_depth: u32,
    max_attempts: u32,
    split_into: usize,
) -> anyhow::Result<()> {
    let root = store
        .create_task(&title, &description, TaskType::Work, 2, None)
        .await
        .context("creating root task")?;

    let planner: Box<dyn Planner> = if split_into == 0 {
        Box::new(StaticPlanner::new(PlannerOutput {
            reasoning: "demo planner: task is trivially small".to_string(),
            size: Size::Xs,
            should_split: false,
            subtasks: Vec::new(),
        }))
    } else {
        Box::new(FanOutPlanner::new(split_into))
    };
    let executor = DemoExecutor;
    let validator = AlwaysPassValidator;
    let escalator = DemoEscalator;

    let config = OrchestratorConfig {
        max_depth,
        max_attempts,
    };
    let runs_root = state_dir.join("runs");
    let coordinator = RunCoordinator::with_config(store, &runs_root, config);

    let summary = coordinator
        .run(
            root.id.clone(),
            None,
            RunPorts {
                planner: planner.as_ref(),
                executor: &executor,
                validator: &validator,
                escalator: &escalator,
            },
        )
        .await
        .context("run failed")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn show_task(store: &FileTaskStore, task_id: TaskId) -> anyhow::Result<()> {
    let task = store.get_task(&task_id).await.context("task not found")?;
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}
