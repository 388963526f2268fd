//! Typed error hierarchy for the hyphae orchestrator.
//!
//! Four enums cover the layers a tick passes through:
//! - `StoreError`: artifact load/save/lock failures
//! - `AgentError`: failures of the external phase agent, classified for retry
//! - `PhaseError`: what the phase runner records when the agent call fails
//! - `OrchestratorError`: stop conditions surfaced to the operator
//!
//! `ToolError` covers the workspace tools agents call while a phase runs.

use std::path::PathBuf;

use thiserror::Error;

use crate::phase::{Phase, PhasePointer};
use crate::retry::{Classify, ErrorClass};

/// Errors from the artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Mission '{id}' not found at {path}")]
    NotFound { id: String, path: PathBuf },

    #[error("Mission '{id}' already exists at {path}")]
    AlreadyExists { id: String, path: PathBuf },

    #[error("Invalid mission id '{id}': {reason}")]
    InvalidMissionId { id: String, reason: String },

    #[error("Corrupt artifact at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Mission '{id}' is locked by another process ({path})")]
    Locked { id: String, path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize mission '{id}': {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures of an external phase agent call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Agent call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Agent response was not usable: {0}")]
    MalformedResponse(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Failed to launch agent '{cmd}': {message}")]
    Launch { cmd: String, message: String },
}

impl Classify for AgentError {
    fn classify(&self) -> ErrorClass {
        match self {
            AgentError::RateLimited(_)
            | AgentError::Timeout { .. }
            | AgentError::Transient(_)
            | AgentError::MalformedResponse(_) => ErrorClass::Retryable,
            AgentError::Authentication(_)
            | AgentError::BadRequest(_)
            | AgentError::Launch { .. } => ErrorClass::Fatal,
        }
    }
}

/// Errors from a single phase execution.
#[derive(Debug, Clone, Error)]
pub enum PhaseError {
    #[error("Agent failed after {attempts} attempts; last error: {last}")]
    RetriesExhausted { attempts: u32, last: AgentError },

    #[error("Agent failed with a non-retryable error: {0}")]
    Fatal(AgentError),
}

/// Failures of the agent-facing workspace tools.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Path '{0}' is outside the project root")]
    OutsideRoot(String),

    #[error("{} belongs to the mission store; only the phase runner writes it", .0.display())]
    Protected(PathBuf),

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Is a directory: {}", .0.display())]
    IsADirectory(PathBuf),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    #[error("{action} denied for mission '{mission_id}' during the {phase} phase")]
    Denied {
        mission_id: String,
        phase: Phase,
        action: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Stop conditions of an orchestrator tick.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Cannot enter {target}: {} required field(s) missing", .missing.len())]
    ValidationBlocked {
        target: PhasePointer,
        missing: Vec<String>,
    },

    #[error("{phase} phase failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        phase: Phase,
        attempts: u32,
        last: AgentError,
    },

    #[error("{phase} phase aborted: {source}")]
    FatalExternal {
        phase: Phase,
        #[source]
        source: AgentError,
    },

    #[error("Corrupt artifact at {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("Approval denied for {phase} ({operation})")]
    ApprovalDenied { phase: Phase, operation: String },

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corrupt { path, reason } => {
                OrchestratorError::CorruptArtifact { path, reason }
            }
            other => OrchestratorError::Store(other),
        }
    }
}

impl From<ToolError> for OrchestratorError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Denied { phase, action, .. } => OrchestratorError::ApprovalDenied {
                phase,
                operation: action,
            },
            other => OrchestratorError::Other(other.into()),
        }
    }
}

impl OrchestratorError {
    pub(crate) fn from_phase(phase: Phase, err: PhaseError) -> Self {
        match err {
            PhaseError::RetriesExhausted { attempts, last } => OrchestratorError::RetriesExhausted {
                phase,
                attempts,
                last,
            },
            PhaseError::Fatal(source) => OrchestratorError::FatalExternal { phase, source },
        }
    }

    /// Name of the component that raised the stop condition.
    pub fn component(&self) -> &'static str {
        match self {
            OrchestratorError::ValidationBlocked { .. } => "validator",
            OrchestratorError::RetriesExhausted { .. } => "retry",
            OrchestratorError::FatalExternal { .. } => "agent",
            OrchestratorError::CorruptArtifact { .. } | OrchestratorError::Store(_) => "store",
            OrchestratorError::ApprovalDenied { .. } => "approval-gate",
            OrchestratorError::Other(_) => "orchestrator",
        }
    }

    /// Minimal actionable fix for the operator.
    pub fn hint(&self) -> String {
        match self {
            OrchestratorError::ValidationBlocked { missing, .. } => {
                format!("Fill in the missing field(s): {}", missing.join("; "))
            }
            OrchestratorError::RetriesExhausted { .. } => {
                "The failure was recorded; re-run the same phase once the provider recovers"
                    .to_string()
            }
            OrchestratorError::FatalExternal { source, .. } => match source {
                AgentError::Authentication(_) => {
                    "Check the provider credentials (e.g. ANTHROPIC_API_KEY)".to_string()
                }
                AgentError::Launch { cmd, .. } => {
                    format!("Check that '{}' is installed or set HYPHAE_AGENT_CMD", cmd)
                }
                _ => "Fix the agent request and re-run the phase".to_string(),
            },
            OrchestratorError::CorruptArtifact { path, .. } => {
                format!("Repair or restore {}", path.display())
            }
            OrchestratorError::ApprovalDenied { phase, .. } => {
                format!("Re-run with --approve to allow the {} phase", phase)
            }
            OrchestratorError::Store(StoreError::Locked { .. }) => {
                "Wait for the other run on this mission to finish".to_string()
            }
            OrchestratorError::Store(StoreError::NotFound { id, .. }) => {
                format!("Create it first with 'hyphae create {}'", id)
            }
            OrchestratorError::Store(_) | OrchestratorError::Other(_) => {
                "See the error above".to_string()
            }
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            OrchestratorError::ValidationBlocked { .. } => 2,
            OrchestratorError::RetriesExhausted { .. } | OrchestratorError::FatalExternal { .. } => 3,
            OrchestratorError::CorruptArtifact { .. } => 4,
            OrchestratorError::ApprovalDenied { .. } => 5,
            OrchestratorError::Store(_) | OrchestratorError::Other(_) => 1,
        }
    }
}
