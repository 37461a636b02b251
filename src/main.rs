//! joinx-flow - SPR 工程開発ワークフローの CLI
//!
//! ```text
//! joinx-flow demo [--no-manual-confirmation] [--seed N] [--output text|json]
//! joinx-flow run --task task.toml [--workflow workflow.toml] [--deadline-secs N]
//! joinx-flow validate --workflow workflow.toml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use joinx_flow::config::workflow::Workflow;
use joinx_flow::engine::{RunOptions, RunOutcome};
use joinx_flow::store::InMemoryStore;
use joinx_flow::task::TaskRequest;
use joinx_flow::workbench::{self, TaskExecution};

/// joinx-flow CLI
#[derive(Parser)]
#[command(name = "joinx-flow")]
#[command(about = "SPR process development workflow runner")]
#[command(version)]
struct Cli {
    /// Log format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in SPR workflow on sample data
    Demo {
        /// Do not approve manual confirmation steps
        #[arg(long)]
        no_manual_confirmation: bool,

        /// Seed for handler noise
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Run a workflow on a task definition file
    Run {
        /// Task definition (TOML)
        #[arg(long)]
        task: PathBuf,

        /// Workflow definition (TOML); the built-in SPR workflow when omitted
        #[arg(long)]
        workflow: Option<PathBuf>,

        /// Do not approve manual confirmation steps
        #[arg(long)]
        no_manual_confirmation: bool,

        /// Seed for handler noise
        #[arg(long)]
        seed: Option<u64>,

        /// Stop at the next step boundary after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Load and validate a workflow definition
    Validate {
        /// Workflow definition (TOML)
        #[arg(long)]
        workflow: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Initialize tracing with stderr output and an optional rolling file.
fn init_tracing(
    format: LogFormat,
    log_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("joinx-flow")
                .filename_suffix("log")
                .max_log_files(14)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The guard must outlive the program or buffered lines are lost
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().json().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let pretty_layer = (format == LogFormat::Pretty).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let json_layer = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn run_options(
    no_manual_confirmation: bool,
    seed: Option<u64>,
    deadline_secs: Option<u64>,
) -> RunOptions {
    let mut options = RunOptions::new().with_confirmation(!no_manual_confirmation);
    if let Some(seed) = seed {
        options = options.with_seed(seed);
    }
    if let Some(secs) = deadline_secs {
        options = options.with_deadline(Duration::from_secs(secs));
    }
    options
}

/// Print the task summary and audit log.
fn print_summary(execution: &TaskExecution) -> Result<(), serde_json::Error> {
    let task = &execution.task;
    println!("=== JoinX Pro | SPR Workflow Summary ===");
    println!("Task ID: {}", task.id());
    println!("Target: {}", task.target());
    println!("Status: {}", task.status());
    println!("Stage: {}", task.workflow_stage());
    println!("Outcome: {}", execution.run.outcome);
    println!("--- Logs ---");
    for entry in task.logs() {
        println!("{}", serde_json::to_string_pretty(entry)?);
    }
    Ok(())
}

fn print_json(execution: &TaskExecution) -> Result<(), serde_json::Error> {
    let report = json!({
        "workflow": execution.run.workflow_name,
        "outcome": execution.run.outcome,
        "task": execution.task,
        "context": execution.run.context,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn report(
    execution: &TaskExecution,
    output: OutputFormat,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Text => print_summary(execution)?,
        OutputFormat::Json => print_json(execution)?,
    }

    match &execution.run.outcome {
        RunOutcome::Finished | RunOutcome::AwaitingConfirmation { .. } => Ok(ExitCode::SUCCESS),
        RunOutcome::Failed { .. } | RunOutcome::Interrupted { .. } => Ok(ExitCode::FAILURE),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Demo {
            no_manual_confirmation,
            seed,
            output,
        } => {
            let options = run_options(no_manual_confirmation, seed, None);
            let execution = workbench::run_demo(options).await?;
            report(&execution, output)
        }
        Commands::Run {
            task,
            workflow,
            no_manual_confirmation,
            seed,
            deadline_secs,
            output,
        } => {
            let task = TaskRequest::from_file(&task)?.into_task();
            let workflow = match workflow {
                Some(path) => Workflow::from_file(&path)?,
                None => workbench::spr_workflow()?,
            };
            info!(workflow = %workflow.name(), task_id = %task.id(), "loaded task and workflow");

            let options = run_options(no_manual_confirmation, seed, deadline_secs);
            let mut store = InMemoryStore::new();
            let execution = workbench::execute_workflow(&mut store, workflow, task, options).await;
            if let Some(step) = execution.task.logs().pending_confirmation() {
                warn!(step = %step, "rerun without --no-manual-confirmation to continue");
            }
            report(&execution, output)
        }
        Commands::Validate { workflow } => {
            let workflow = Workflow::from_file(&workflow)?;
            println!(
                "Workflow '{}' is valid ({} steps)",
                workflow.name(),
                workflow.steps().len()
            );
            for (index, step) in workflow.steps().iter().enumerate() {
                println!(
                    "  {}. {} handler={} confirmation={}",
                    index + 1,
                    step.name(),
                    step.handler_name().unwrap_or("-"),
                    step.is_confirmation_required()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
