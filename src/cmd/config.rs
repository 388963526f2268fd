//! Configuration view and validation: `hyphae config`.

use anyhow::Result;
use std::path::Path;

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(project_dir: &Path, cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    use hyphae::config::Config;
    use hyphae::hyphae_config::{CONFIG_FILE, HyphaeToml};
    use hyphae::init::HYPHAE_DIR;

    let config_path = project_dir.join(HYPHAE_DIR).join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No {} found; using defaults", CONFIG_FILE);
            }
            println!();

            let config = Config::load(project_dir, &cli.overrides(false))?;
            let settings = &config.settings;
            println!("[agent]");
            println!("  cmd = \"{}\"", settings.agent.cmd);
            println!("  args = {:?}", settings.agent.args);
            println!("  model = \"{}\"", settings.agent.model);
            println!("  timeout_secs = {}", settings.agent.timeout_secs);
            println!();
            println!("[retry]");
            println!("  max_attempts = {}", settings.retry.max_attempts);
            println!("  initial_backoff_ms = {}", settings.retry.initial_backoff_ms);
            println!("  multiplier = {}", settings.retry.multiplier);
            println!("  jitter = {}", settings.retry.jitter);
            println!();
            println!("[run]");
            println!("  max_iterations = {}", settings.run.max_iterations);
            println!();
            println!("[approval]");
            println!("  auto_approve = {}", settings.approval.auto_approve);
            println!();

            let providers: Vec<String> = config
                .credentials
                .available
                .iter()
                .map(|p| p.to_string())
                .collect();
            if providers.is_empty() {
                println!("Credentials: none detected");
            } else {
                println!("Credentials: {}", providers.join(", "));
            }
            if let Some(warning) = config.credential_warning() {
                println!("  {}", console::style(warning).yellow());
            }
        }
        Some(ConfigCommands::Validate) => {
            if !config_path.exists() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE);
                return Ok(());
            }

            let toml = HyphaeToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
        }
    }

    Ok(())
}
