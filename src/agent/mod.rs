//! External phase agents.
//!
//! A phase agent receives the assembled prompt for one phase iteration and
//! returns a structured [`PhaseReport`] plus token usage. The orchestrator
//! only sees the [`PhaseAgent`] trait; [`CommandAgent`] is the production
//! implementation that drives an agent CLI over stdin/stdout.

pub mod command;
pub mod report;
pub mod stream;

use async_trait::async_trait;

use crate::errors::AgentError;
use crate::phase::Phase;

pub use command::CommandAgent;
pub use report::{PhaseReport, Verdict};

/// Fallback price per million prompt tokens when the agent reports no cost.
pub const PROMPT_COST_PER_MILLION: f64 = 0.50;
/// Fallback price per million completion tokens when the agent reports no cost.
pub const COMPLETION_COST_PER_MILLION: f64 = 2.00;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRequest {
    pub mission_id: String,
    pub phase: Phase,
    pub iteration: u32,
    pub model: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn estimated_cost_usd(&self) -> f64 {
        (self.prompt_tokens as f64 * PROMPT_COST_PER_MILLION
            + self.completion_tokens as f64 * COMPLETION_COST_PER_MILLION)
            / 1_000_000.0
    }
}

#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub report: PhaseReport,
    pub usage: Usage,
    pub cost_usd: f64,
}

/// Executes one phase iteration against an external agent.
#[async_trait]
pub trait PhaseAgent: Send + Sync {
    async fn execute(&self, request: &PhaseRequest) -> Result<AgentResponse, AgentError>;
}
