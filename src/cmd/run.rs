//! Mission execution: `hyphae step <id>` and `hyphae run <id>`.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use hyphae::config::Config;
use hyphae::errors::OrchestratorError;
use hyphae::gates::{ApprovalGate, ApprovalRequest, Approver, Authorization, InteractiveApprover};
use hyphae::init::is_initialized;
use hyphae::orchestrator::{Orchestrator, PhaseRunner, RunMode, RunReport};
use hyphae::prompt::PromptBuilder;
use hyphae::store::ArtifactStore;
use hyphae::ui::RunUI;

use super::super::Cli;

/// Terminal approver that hides the progress bars while it prompts.
struct PausingApprover {
    ui: Arc<RunUI>,
}

#[async_trait]
impl Approver for PausingApprover {
    async fn authorize(&self, request: &ApprovalRequest) -> Authorization {
        self.ui.pause();
        let answer = InteractiveApprover.authorize(request).await;
        self.ui.resume();
        answer
    }
}

fn load_config(project_dir: &Path, cli: &Cli, approve: bool) -> Result<Config> {
    if !is_initialized(project_dir) {
        anyhow::bail!(
            "No hyphae project at {}. Run 'hyphae init' first.",
            project_dir.display()
        );
    }
    let config = Config::load(project_dir, &cli.overrides(approve))?;
    if let Some(warning) = config.credential_warning() {
        tracing::warn!("{}", warning);
    }
    Ok(config)
}

fn build_orchestrator(config: &Config, store: ArtifactStore, approver: Box<dyn Approver>) -> Orchestrator {
    let runner = PhaseRunner::new(
        Arc::new(config.command_agent()),
        config.retry_policy(),
        config.model(),
        PromptBuilder::new(&config.agents_dir, &config.contract_file),
    );
    Orchestrator::new(store, runner, ApprovalGate::new(config.auto_approve(), approver))
}

async fn drive(config: &Config, id: &str, mode: RunMode) -> Result<RunReport> {
    let store = ArtifactStore::open(&config.missions_dir).map_err(OrchestratorError::from)?;
    let start = store.load(id).map_err(OrchestratorError::from)?.current_phase;

    let ui = Arc::new(RunUI::new(id, start, config.verbose));
    let approver = Box::new(PausingApprover { ui: ui.clone() });
    let observer_ui = ui.clone();
    let mut orchestrator =
        build_orchestrator(config, store, approver).with_observer(move |tick| observer_ui.tick_finished(tick));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping after the current phase");
            signal_token.cancel();
        }
    });

    let result = orchestrator.run(id, mode, &cancel).await;
    signal_task.abort();

    match result {
        Ok(report) => {
            ui.finish(&report);
            Ok(report)
        }
        Err(err) => {
            ui.halted(&err.to_string());
            Err(err.into())
        }
    }
}

pub async fn cmd_step(project_dir: &Path, cli: &Cli, id: &str, approve: bool, dry_run: bool) -> Result<()> {
    let config = load_config(project_dir, cli, approve)?;

    if dry_run {
        let store = ArtifactStore::open(&config.missions_dir).map_err(OrchestratorError::from)?;
        let orchestrator = build_orchestrator(&config, store, Box::new(InteractiveApprover));
        match orchestrator.preview(id)? {
            Some((phase, prompt)) => {
                eprintln!(
                    "{} prompt for {} ({}), nothing was run:",
                    console::style("dry run:").yellow().bold(),
                    phase,
                    phase.operation_kind()
                );
                println!("{}", prompt);
            }
            None => println!("Mission {} is complete; nothing to run", id),
        }
        return Ok(());
    }

    drive(&config, id, RunMode::SingleStep).await?;
    Ok(())
}

pub async fn cmd_run(
    project_dir: &Path,
    cli: &Cli,
    id: &str,
    approve: bool,
    max_iterations: Option<u32>,
) -> Result<()> {
    let config = load_config(project_dir, cli, approve)?;
    let max_iterations = max_iterations.unwrap_or_else(|| config.max_iterations());

    let report = drive(&config, id, RunMode::UntilComplete { max_iterations }).await?;
    if report.final_pointer.is_complete() {
        let store = ArtifactStore::open(&config.missions_dir).map_err(OrchestratorError::from)?;
        let mission = store.load(id).map_err(OrchestratorError::from)?;
        if let Some(message) = mission
            .phases
            .finalize
            .latest()
            .and_then(|log| log.commit_message.as_deref())
        {
            println!("Suggested commit message: {}", message);
        }
    }
    Ok(())
}
