//! Agent-facing workspace tools: `hyphae tool <name>`.
//!
//! Output is JSON on stdout (raw text for `read-file`), so an agent can call
//! these from its shell and parse the answer. The mission comes from
//! `--mission` or `HYPHAE_MISSION_ID`, which the command agent sets.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use hyphae::config::Config;
use hyphae::errors::OrchestratorError;
use hyphae::gates::{ApprovalGate, InteractiveApprover};
use hyphae::init::is_initialized;
use hyphae::store::ArtifactStore;
use hyphae::tools::{SearchQuery, Workspace, authorize};

use super::super::{Cli, ToolCommands};

fn mission_id(flag: Option<String>) -> Option<String> {
    flag.or_else(|| std::env::var("HYPHAE_MISSION_ID").ok())
        .filter(|id| !id.trim().is_empty())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_store(config: &Config) -> Result<ArtifactStore> {
    Ok(ArtifactStore::open(&config.missions_dir).map_err(OrchestratorError::from)?)
}

/// Gate a mutating tool call on the mission's current phase.
///
/// Without a mission there is nothing to charge the action to and it runs.
async fn gate(project_dir: &Path, cli: &Cli, mission: Option<String>, action: String) -> Result<()> {
    let Some(id) = mission_id(mission) else {
        tracing::debug!(%action, "No mission given; tool call is not gated");
        return Ok(());
    };
    if !is_initialized(project_dir) {
        anyhow::bail!(
            "No hyphae project at {} for mission '{}'",
            project_dir.display(),
            id
        );
    }

    let config = Config::load(project_dir, &cli.overrides(false))?;
    let mission = open_store(&config)?
        .load(&id)
        .map_err(OrchestratorError::from)?;
    let mut gate = ApprovalGate::new(config.auto_approve(), Box::new(InteractiveApprover));
    authorize(&mut gate, &mission, &action)
        .await
        .map_err(OrchestratorError::from)?;
    Ok(())
}

pub async fn cmd_tool(project_dir: &Path, cli: &Cli, command: ToolCommands) -> Result<()> {
    let workspace = Workspace::open(project_dir).map_err(OrchestratorError::from)?;

    match command {
        ToolCommands::ReadProgress { id } => {
            let id = mission_id(id).context("No mission id given and HYPHAE_MISSION_ID is not set")?;
            let config = Config::load(project_dir, &cli.overrides(false))?;
            let mission = open_store(&config)?
                .load(&id)
                .map_err(OrchestratorError::from)?;
            print_json(&mission)?;
        }
        ToolCommands::ListFiles { dir, include_hidden } => {
            let entries = workspace
                .list_files(&dir, include_hidden)
                .map_err(OrchestratorError::from)?;
            print_json(&entries)?;
        }
        ToolCommands::ReadFile { path } => {
            let content = workspace.read_file(&path).map_err(OrchestratorError::from)?;
            print!("{}", content);
        }
        ToolCommands::WriteFile {
            path,
            content,
            no_create_dirs,
            mission,
        } => {
            gate(project_dir, cli, mission, format!("write {}", path)).await?;
            let content = match content {
                Some(content) => content,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("Failed to read file content from stdin")?;
                    buffer
                }
            };
            let outcome = workspace
                .write_file(&path, &content, !no_create_dirs)
                .map_err(OrchestratorError::from)?;
            print_json(&outcome)?;
        }
        ToolCommands::RunCommand {
            command,
            cwd,
            timeout_secs,
            mission,
        } => {
            gate(project_dir, cli, mission, format!("run `{}`", command)).await?;
            let outcome = workspace
                .run_command(&command, cwd.as_deref(), Duration::from_secs(timeout_secs))
                .await
                .map_err(OrchestratorError::from)?;
            print_json(&outcome)?;
        }
        ToolCommands::Search {
            pattern,
            dir,
            glob,
            regex,
            case_sensitive,
            max_results,
        } => {
            let query = SearchQuery {
                directory: dir,
                file_glob: glob,
                regex,
                case_insensitive: !case_sensitive,
                max_results,
                ..SearchQuery::literal(pattern)
            };
            let matches = workspace
                .search_codebase(&query)
                .map_err(OrchestratorError::from)?;
            print_json(&matches)?;
        }
    }

    Ok(())
}
