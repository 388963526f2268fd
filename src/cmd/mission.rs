//! Mission bookkeeping commands: create, status, list, usage, check.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use hyphae::config::Config;
use hyphae::errors::OrchestratorError;
use hyphae::gates::validate;
use hyphae::init::{init_project, is_initialized};
use hyphae::mission::{Mission, MissionContext, TestRigor};
use hyphae::orchestrator::create_mission;
use hyphae::phase::{Outcome, transition};
use hyphae::store::ArtifactStore;
use hyphae::ui::{render_list_row, render_readiness, render_status, render_usage};

use super::super::Cli;

/// Flags accepted by `hyphae create`.
#[derive(Debug, Default)]
pub struct CreateOptions {
    pub objective: Option<String>,
    pub scope: Vec<String>,
    pub constraints: Vec<String>,
    pub non_goals: Vec<String>,
    pub test_rigor: String,
    pub context_file: Option<PathBuf>,
}

fn open_store(project_dir: &Path, cli: &Cli) -> Result<(Config, ArtifactStore)> {
    if !is_initialized(project_dir) {
        anyhow::bail!(
            "No hyphae project at {}. Run 'hyphae init' or 'hyphae create' first.",
            project_dir.display()
        );
    }
    let config = Config::load(project_dir, &cli.overrides(false))?;
    let store = ArtifactStore::open(&config.missions_dir).map_err(OrchestratorError::from)?;
    Ok((config, store))
}

fn load(store: &ArtifactStore, id: &str) -> Result<Mission> {
    Ok(store.load(id).map_err(OrchestratorError::from)?)
}

fn build_context(options: CreateOptions) -> Result<MissionContext> {
    let mut context = match &options.context_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read context file: {}", path.display()))?;
            serde_yaml::from_str::<MissionContext>(&content)
                .with_context(|| format!("Failed to parse context file: {}", path.display()))?
        }
        None => MissionContext::default(),
    };

    if let Some(objective) = options.objective {
        context.objective = objective;
    }
    context.scope.extend(options.scope);
    context.constraints.extend(options.constraints);
    context.non_goals.extend(options.non_goals);
    Ok(context)
}

pub fn cmd_create(project_dir: &Path, cli: &Cli, id: &str, options: CreateOptions) -> Result<()> {
    if !is_initialized(project_dir) {
        init_project(project_dir)?;
    }
    let (_, store) = open_store(project_dir, cli)?;

    let rigor: TestRigor = options.test_rigor.parse()?;
    let context = build_context(options)?;
    if context.objective.trim().is_empty() {
        tracing::warn!(mission = id, "Mission has no objective; the planner will have little to work with");
    }

    let mission = Mission::new(id, context, rigor);
    create_mission(&store, &mission)?;

    println!(
        "Created mission {} at {}",
        console::style(id).cyan().bold(),
        store.artifact_path(id).display()
    );
    println!("Next: `hyphae step {}` or `hyphae run {}`", id, id);
    Ok(())
}

pub fn cmd_status(project_dir: &Path, cli: &Cli, id: &str) -> Result<()> {
    let (_, store) = open_store(project_dir, cli)?;
    let mission = load(&store, id)?;
    print!("{}", render_status(&mission, cli.verbose));
    Ok(())
}

pub fn cmd_list(project_dir: &Path, cli: &Cli) -> Result<()> {
    let (_, store) = open_store(project_dir, cli)?;
    let ids = store.list().map_err(OrchestratorError::from)?;

    if ids.is_empty() {
        println!("No missions yet. Run 'hyphae create <id>' to start one.");
        return Ok(());
    }

    println!("{:<24} {:<10} Objective", "Mission", "Phase");
    println!("{:<24} {:<10} ---------", "-------", "-----");
    for id in ids {
        match store.load(&id) {
            Ok(mission) => println!("{}", render_list_row(&mission)),
            Err(e) => println!(
                "{:<24} {:<10} {}",
                id,
                console::style("corrupt").red(),
                console::style(e).dim()
            ),
        }
    }
    Ok(())
}

pub fn cmd_usage(project_dir: &Path, cli: &Cli) -> Result<()> {
    let (_, store) = open_store(project_dir, cli)?;

    for id in store.list().map_err(OrchestratorError::from)? {
        if let Ok(mission) = store.load(&id) {
            let totals = mission.usage_totals();
            if totals.runs > 0 {
                println!("{:<24} {}", id, render_usage(&totals));
            }
        }
    }

    let totals = store.usage_totals().map_err(OrchestratorError::from)?;
    println!();
    println!("{} {}", console::style("Total").bold(), render_usage(&totals));
    Ok(())
}

/// Print readiness for the current phase and for the forward transition.
///
/// Fails with the validator's stop condition when the current phase itself
/// cannot run.
pub fn cmd_check(project_dir: &Path, cli: &Cli, id: &str) -> Result<()> {
    let (_, store) = open_store(project_dir, cli)?;
    let mission = load(&store, id)?;

    let Some(phase) = mission.current_phase.phase() else {
        println!("Mission {} is complete", id);
        return Ok(());
    };

    let entry = validate(&mission, mission.current_phase);
    println!("{}", render_readiness(id, mission.current_phase, &entry).trim_end());

    let forward = transition(phase, Outcome::Pass);
    let next = validate(&mission, forward);
    println!("{}", render_readiness(id, forward, &next).trim_end());

    if !entry.is_ok() {
        return Err(OrchestratorError::ValidationBlocked {
            target: mission.current_phase,
            missing: entry.missing,
        }
        .into());
    }
    Ok(())
}
