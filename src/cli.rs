//! Command-line interface for cosight-bench.
//!
//! One command: run a benchmark over a JSONL task set and write the run
//! artifact. Model credentials come from the environment, not flags.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use crate::agent::{Agent, AgentConfig};
use crate::bench::{BenchmarkHarness, HarnessConfig, TaskSet};
use crate::config::{ConfigResolver, EnvSnapshot, Role};
use crate::llm::RoleModels;
use crate::results::{ResultStore, RunArtifact};
use crate::tools::{build_search_clients, ToolRegistry};

/// Multi-role LLM agent benchmark runner.
#[derive(Parser)]
#[command(name = "cosight-bench")]
#[command(about = "Run a multi-role LLM agent over a benchmark task set")]
#[command(version)]
#[command(
    long_about = "cosight-bench drives a plan/act/tool/vision agent across a GAIA-style \
JSONL task set and writes a scored run artifact.\n\nModel endpoints and credentials are \
read from the environment (API_KEY, API_BASE_URL, MODEL_NAME, plus optional PLAN_/ACT_/\
TOOL_/VISION_ prefixed overrides).\n\nExample usage:\n  cosight-bench --tasks \
gaia/validation/metadata.jsonl --level 1 --concurrency 4"
)]
pub struct Cli {
    /// JSONL task metadata file (one task object per line).
    #[arg(short, long)]
    pub tasks: PathBuf,

    /// Only run tasks at this difficulty level.
    #[arg(short = 'L', long)]
    pub level: Option<u32>,

    /// Workspace root; each run gets a timestamped subdirectory.
    #[arg(short, long, default_value = "workspace")]
    pub workspace: PathBuf,

    /// Number of tasks to run concurrently.
    #[arg(short, long, default_value = "1")]
    pub concurrency: usize,

    /// Hard per-task timeout in seconds.
    #[arg(long, default_value = "900")]
    pub task_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Parses CLI arguments from the process command line.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the benchmark described by the parsed CLI arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let run_dir = cli
        .workspace
        .join(Utc::now().format("%Y%m%d_%H%M%S").to_string());
    std::fs::create_dir_all(run_dir.join("logs"))
        .with_context(|| format!("Failed to create workspace at {}", run_dir.display()))?;
    info!(workspace = %run_dir.display(), "Workspace ready");

    // Downstream tooling picks these up from the environment.
    std::env::set_var("WORKSPACE_PATH", &run_dir);
    std::env::set_var("RESULTS_PATH", &run_dir);

    let env = EnvSnapshot::from_process_env();

    let resolver = ConfigResolver::new(env.clone());
    let models = Arc::new(RoleModels::from_resolver(&resolver)?);
    let model_name = models.get(Role::Plan).model().to_string();

    let registry = ToolRegistry::from_env(&env);
    let available = registry.available_providers();
    if registry.any_search_available() {
        info!(providers = ?available, "Tool providers available");
    } else {
        warn!("No search provider configured; agents run without web search");
    }
    let search_clients = Arc::new(build_search_clients(&registry, Duration::from_secs(30)));

    let task_timeout = Duration::from_secs(cli.task_timeout_secs);
    let task_set = TaskSet::from_jsonl_file(&cli.tasks, cli.level)
        .with_context(|| format!("Failed to load tasks from {}", cli.tasks.display()))?;
    anyhow::ensure!(
        !task_set.is_empty(),
        "No tasks matched in {} (level filter: {:?})",
        cli.tasks.display(),
        cli.level
    );
    info!(tasks = task_set.len(), level = ?cli.level, "Task set loaded");

    let agent = Agent::new(
        models,
        search_clients,
        AgentConfig::default().with_task_budget(task_timeout),
    );

    let harness = BenchmarkHarness::new(
        Arc::new(agent),
        HarnessConfig::default()
            .with_max_concurrency(cli.concurrency)
            .with_task_timeout(task_timeout),
    );

    // Ctrl-C cancels the run; in-flight tasks get the grace period.
    let cancel = harness.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    let results = harness.run(task_set.into_tasks()).await;

    let store = ResultStore::new(&run_dir)?;
    for result in &results {
        store.save_task_record(result)?;
    }
    let artifact = RunArtifact::new(&run_dir, model_name, cli.level, results);
    let path = store.save(&artifact)?;

    match artifact.summary.accuracy_pct {
        Some(pct) => info!(
            accuracy_pct = format!("{pct:.1}"),
            correct = artifact.summary.correct,
            scored = artifact.summary.scored_tasks,
            artifact = %path.display(),
            "Run complete"
        ),
        None => info!(
            succeeded = artifact.summary.succeeded,
            total = artifact.summary.total_tasks,
            artifact = %path.display(),
            "Run complete (blind submission, no scores)"
        ),
    }

    Ok(())
}
