use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agent::CommandAgent;
use crate::hyphae_config::{EnvOverrides, HyphaeToml};
use crate::init::HYPHAE_DIR;
use crate::retry::RetryPolicy;

/// Completion providers the agent may be talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Google,
}

impl Provider {
    /// Guess the provider from a model name such as `claude-sonnet-4` or `openai/gpt-4o`.
    pub fn for_model(model: &str) -> Option<Provider> {
        let model = model.to_lowercase();
        let (prefix, name) = model.split_once('/').unwrap_or(("", model.as_str()));
        match prefix {
            "anthropic" => return Some(Provider::Anthropic),
            "openai" => return Some(Provider::OpenAi),
            "google" | "gemini" => return Some(Provider::Google),
            _ => {}
        }
        if name.starts_with("claude") {
            Some(Provider::Anthropic)
        } else if name.starts_with("gpt") || name.starts_with("o1") || name.starts_with("o3") {
            Some(Provider::OpenAi)
        } else if name.starts_with("gemini") {
            Some(Provider::Google)
        } else {
            None
        }
    }

    pub fn key_vars(&self) -> &'static [&'static str] {
        match self {
            Provider::Anthropic => &["ANTHROPIC_API_KEY"],
            Provider::OpenAi => &["OPENAI_API_KEY"],
            Provider::Google => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("anthropic"),
            Provider::OpenAi => f.write_str("openai"),
            Provider::Google => f.write_str("google"),
        }
    }
}

/// Which provider credentials are present in the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub available: Vec<Provider>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let available = [Provider::Anthropic, Provider::OpenAi, Provider::Google]
            .into_iter()
            .filter(|p| {
                p.key_vars()
                    .iter()
                    .any(|var| lookup(var).is_some_and(|v| !v.trim().is_empty()))
            })
            .collect();
        Self { available }
    }

    pub fn has(&self, provider: Provider) -> bool {
        self.available.contains(&provider)
    }
}

/// CLI flags that override file and environment settings.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub approve: bool,
    pub verbose: bool,
}

/// Runtime configuration for hyphae.
///
/// Resolved once at startup from `.hyphae/hyphae.toml`, the environment and
/// CLI flags, in that order of increasing precedence.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub hyphae_dir: PathBuf,
    pub missions_dir: PathBuf,
    pub agents_dir: PathBuf,
    pub contract_file: PathBuf,
    pub settings: HyphaeToml,
    pub credentials: Credentials,
    pub verbose: bool,
}

impl Config {
    /// Load configuration reading the process environment.
    pub fn load(project_dir: &Path, cli: &CliOverrides) -> Result<Self> {
        Self::resolve(project_dir, &EnvOverrides::from_env(), Credentials::from_env(), cli)
    }

    pub fn resolve(
        project_dir: &Path,
        env: &EnvOverrides,
        credentials: Credentials,
        cli: &CliOverrides,
    ) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve project directory: {}", project_dir.display()))?;
        let hyphae_dir = project_dir.join(HYPHAE_DIR);

        let mut settings = HyphaeToml::load_or_default(&hyphae_dir)?;
        settings.apply_env(env);
        if let Some(ref model) = cli.model {
            settings.agent.model = model.clone();
        }
        if cli.approve {
            settings.approval.auto_approve = true;
        }

        for warning in settings.validate() {
            tracing::warn!("{}", warning);
        }

        Ok(Self {
            missions_dir: hyphae_dir.join("missions"),
            agents_dir: hyphae_dir.join("agents"),
            contract_file: hyphae_dir.join("CONTRACT.md"),
            hyphae_dir,
            project_dir,
            settings,
            credentials,
            verbose: cli.verbose,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.agent.model
    }

    pub fn auto_approve(&self) -> bool {
        self.settings.approval.auto_approve
    }

    pub fn max_iterations(&self) -> u32 {
        self.settings.run.max_iterations
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.settings.retry.policy()
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.agent.timeout_secs)
    }

    pub fn command_agent(&self) -> CommandAgent {
        CommandAgent::new(
            &self.settings.agent.cmd,
            self.settings.agent.args.clone(),
            self.project_dir.clone(),
            self.agent_timeout(),
        )
        .with_auto_approve(self.auto_approve())
    }

    /// A warning when the selected model's provider has no credentials.
    pub fn credential_warning(&self) -> Option<String> {
        let provider = Provider::for_model(self.model())?;
        if self.credentials.has(provider) {
            return None;
        }
        Some(format!(
            "No {} credentials found for model '{}' (set {})",
            provider,
            self.model(),
            provider.key_vars().join(" or ")
        ))
    }
}
