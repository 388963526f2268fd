//! Project configuration read from `.hyphae/hyphae.toml`.
//!
//! Settings are layered file → environment → CLI. This module owns the file
//! layer and the environment snapshot; [`crate::config::Config`] applies CLI
//! flags on top.
//!
//! # Configuration File Format
//!
//! ```toml
//! [agent]
//! cmd = "claude"
//! args = ["--print", "--output-format", "stream-json", "--verbose", "--model", "{model}"]
//! model = "claude-sonnet-4-20250514"
//! timeout_secs = 1800
//!
//! [retry]
//! max_attempts = 3
//! initial_backoff_ms = 1000
//! multiplier = 2.0
//! jitter = 0.0
//!
//! [run]
//! max_iterations = 12
//!
//! [approval]
//! auto_approve = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const CONFIG_FILE: &str = "hyphae.toml";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// How phase agents are launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_agent_cmd")]
    pub cmd: String,
    /// Arguments passed to the agent; `{model}` is replaced by the model name
    #[serde(default = "default_agent_args")]
    pub args: Vec<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_agent_cmd() -> String {
    "claude".to_string()
}

fn default_agent_args() -> Vec<String> {
    ["--print", "--output-format", "stream-json", "--verbose", "--model", "{model}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    1800
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            cmd: default_agent_cmd(),
            args: default_agent_args(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySection {
    /// Total attempts per agent call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Jitter fraction in [0, 1]; 0 disables jitter
    #[serde(default)]
    pub jitter: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
            jitter: 0.0,
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            multiplier: self.multiplier,
            jitter_factor: self.jitter.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// Ceiling on ticks per `run` invocation
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    12
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalSection {
    #[serde(default)]
    pub auto_approve: bool,
}

/// The complete hyphae.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyphaeToml {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub approval: ApprovalSection,
}

impl HyphaeToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse hyphae.toml")
    }

    /// Load `<hyphae_dir>/hyphae.toml`, or defaults when it does not exist.
    pub fn load_or_default(hyphae_dir: &Path) -> Result<Self> {
        let path = hyphae_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize hyphae.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides on top of the file values.
    pub fn apply_env(&mut self, env: &EnvOverrides) {
        if let Some(ref model) = env.model {
            self.agent.model = model.clone();
        }
        if let Some(ref cmd) = env.agent_cmd {
            self.agent.cmd = cmd.clone();
        }
        if let Some(auto) = env.auto_approve {
            self.approval.auto_approve = auto;
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.agent.cmd.trim().is_empty() {
            warnings.push("agent.cmd is empty".to_string());
        }
        if self.agent.timeout_secs == 0 {
            warnings.push("agent.timeout_secs is 0; every agent call will time out".to_string());
        }
        if self.retry.max_attempts == 0 {
            warnings.push("retry.max_attempts is 0; treated as 1".to_string());
        }
        if self.retry.multiplier < 1.0 {
            warnings.push(format!(
                "retry.multiplier {} is below 1.0; backoff will not grow",
                self.retry.multiplier
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            warnings.push(format!(
                "retry.jitter {} is outside [0, 1]; clamped",
                self.retry.jitter
            ));
        }
        if self.run.max_iterations == 0 {
            warnings.push("run.max_iterations is 0; `run` will stop immediately".to_string());
        }

        warnings
    }
}

/// Environment values, captured once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub model: Option<String>,
    pub agent_cmd: Option<String>,
    pub auto_approve: Option<bool>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            model: non_empty("HYPHAE_MODEL"),
            agent_cmd: non_empty("HYPHAE_AGENT_CMD"),
            auto_approve: non_empty("HYPHAE_AUTO_APPROVE").map(|v| parse_flag(&v)),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
