use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use hyphae::config::CliOverrides;
use hyphae::errors::OrchestratorError;
use hyphae::init::find_project_root;

mod cmd;

#[derive(Parser)]
#[command(name = "hyphae")]
#[command(version, about = "Phase-gated mission orchestrator for coding agents")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Approve code-mutating phases without prompting
    #[arg(long, global = true)]
    pub yes: bool,

    /// Project root (defaults to the nearest ancestor holding .hyphae/)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Model passed to the agent. Overrides hyphae.toml and HYPHAE_MODEL.
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize .hyphae/ in the project directory
    Init,
    /// Create a new mission at the plan phase
    Create {
        id: String,

        #[arg(long)]
        objective: Option<String>,

        /// Path or area the mission may touch (repeatable)
        #[arg(long = "scope")]
        scope: Vec<String>,

        #[arg(long = "constraint")]
        constraints: Vec<String>,

        #[arg(long = "non-goal")]
        non_goals: Vec<String>,

        /// NONE, SMOKE or FULL
        #[arg(long, default_value = "SMOKE")]
        test_rigor: String,

        /// YAML file with mission_context fields; flags extend it
        #[arg(long)]
        context_file: Option<PathBuf>,
    },
    /// Run exactly one phase of a mission
    Step {
        id: String,

        #[arg(long)]
        approve: bool,

        /// Print the prompt for the next phase without running it
        #[arg(long)]
        dry_run: bool,
    },
    /// Run phases until the mission completes or stops
    Run {
        id: String,

        #[arg(long)]
        approve: bool,

        /// Maximum phase runs for this invocation (defaults to [run] max_iterations)
        #[arg(long)]
        max_iterations: Option<u32>,
    },
    /// Show a mission's progress and usage
    Status { id: String },
    /// List missions in this project
    List,
    /// Show token usage and cost across all missions
    Usage,
    /// Report whether a mission may run its current phase
    Check { id: String },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Workspace tools for agents (JSON output)
    Tool {
        #[command(subcommand)]
        command: ToolCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[derive(Subcommand, Clone)]
pub enum ToolCommands {
    /// Print a mission artifact (defaults to $HYPHAE_MISSION_ID)
    ReadProgress { id: Option<String> },
    /// List a directory, directories first
    ListFiles {
        #[arg(default_value = ".")]
        dir: String,

        #[arg(long)]
        include_hidden: bool,
    },
    /// Print a file's contents
    ReadFile { path: String },
    /// Write a file; needs approval during a code-mutating phase
    WriteFile {
        path: String,

        /// File content (read from stdin when omitted)
        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        no_create_dirs: bool,

        /// Mission to gate on (defaults to $HYPHAE_MISSION_ID)
        #[arg(long)]
        mission: Option<String>,
    },
    /// Run a shell command; needs approval during a code-mutating phase
    RunCommand {
        command: String,

        /// Working directory inside the project
        #[arg(long)]
        cwd: Option<String>,

        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,

        /// Mission to gate on (defaults to $HYPHAE_MISSION_ID)
        #[arg(long)]
        mission: Option<String>,
    },
    /// Search text files for a pattern
    Search {
        pattern: String,

        #[arg(long, default_value = ".")]
        dir: String,

        /// Only files whose name matches this glob, e.g. '*.rs'
        #[arg(long)]
        glob: Option<String>,

        /// Treat the pattern as a regular expression
        #[arg(long)]
        regex: bool,

        #[arg(long)]
        case_sensitive: bool,

        #[arg(long, default_value_t = 50)]
        max_results: usize,
    },
}

impl Cli {
    pub fn overrides(&self, approve: bool) -> CliOverrides {
        CliOverrides {
            model: self.model.clone(),
            approve: approve || self.yes,
            verbose: self.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("HYPHAE_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("hyphae=debug")
        } else {
            EnvFilter::new("hyphae=info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).without_time())
        .with(filter)
        .init();
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<OrchestratorError>() {
        Some(stop) => {
            eprintln!("{} {}", style("error:").red().bold(), stop);
            if let OrchestratorError::ValidationBlocked { missing, .. } = stop {
                for field in missing {
                    eprintln!("  - {}", field);
                }
            }
            eprintln!("{} {}", style("raised by:").dim(), stop.component());
            eprintln!("{} {}", style("hint:").yellow(), stop.hint());
            ExitCode::from(stop.exit_code())
        }
        None => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn resolve_project_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.project_dir {
        return Ok(dir.clone());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(find_project_root(&cwd).unwrap_or(cwd))
}

async fn run(cli: &Cli) -> Result<()> {
    let project_dir = resolve_project_dir(cli)?;

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Create {
            id,
            objective,
            scope,
            constraints,
            non_goals,
            test_rigor,
            context_file,
        } => {
            let options = cmd::mission::CreateOptions {
                objective: objective.clone(),
                scope: scope.clone(),
                constraints: constraints.clone(),
                non_goals: non_goals.clone(),
                test_rigor: test_rigor.clone(),
                context_file: context_file.clone(),
            };
            cmd::cmd_create(&project_dir, cli, id, options)?;
        }
        Commands::Step {
            id,
            approve,
            dry_run,
        } => cmd::cmd_step(&project_dir, cli, id, *approve, *dry_run).await?,
        Commands::Run {
            id,
            approve,
            max_iterations,
        } => cmd::cmd_run(&project_dir, cli, id, *approve, *max_iterations).await?,
        Commands::Status { id } => cmd::cmd_status(&project_dir, cli, id)?,
        Commands::List => cmd::cmd_list(&project_dir, cli)?,
        Commands::Usage => cmd::cmd_usage(&project_dir, cli)?,
        Commands::Check { id } => cmd::cmd_check(&project_dir, cli, id)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, cli, command.clone())?,
        Commands::Tool { command } => cmd::cmd_tool(&project_dir, cli, command.clone()).await?,
    }

    Ok(())
}
