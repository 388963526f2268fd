//! The structured report an agent returns for a phase.
//!
//! Agents end their output with a YAML document wrapped in report tags:
//!
//! ```text
//! <report>
//! summary: Added the layered loader
//! commands:
//!   - command: cargo test config
//!     result: 12 passed
//! </report>
//! ```
//!
//! All fields are optional; which ones matter depends on the phase.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::errors::AgentError;
use crate::mission::{AcceptanceCriterion, CommandRecord, CriterionStatus, IterationLog, PlanStep};
use crate::phase::{Outcome, Phase};

static REPORT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<report>\s*(.*?)\s*</report>").expect("report regex"));

static FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*\n(.*?)\n?```$").expect("fence regex"));

/// Verdict of a Verify report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Verdict {
    #[serde(rename = "PASS", alias = "pass", alias = "Pass")]
    Pass,
    #[serde(rename = "FAIL", alias = "fail", alias = "Fail")]
    Fail,
}

/// A criterion may be given as plain text or with a status.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CriterionEntry {
    Text(String),
    Full(AcceptanceCriterion),
}

impl From<CriterionEntry> for AcceptanceCriterion {
    fn from(entry: CriterionEntry) -> Self {
        match entry {
            CriterionEntry::Text(description) => AcceptanceCriterion {
                description,
                status: CriterionStatus::Unknown,
            },
            CriterionEntry::Full(criterion) => criterion,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PhaseReport {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<CriterionEntry>,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub commands: Vec<CommandRecord>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub open_issues: Vec<String>,
    #[serde(default, alias = "outcome")]
    pub verdict: Option<Verdict>,
    #[serde(default)]
    pub required_fixes: Vec<String>,
    #[serde(default)]
    pub behavior_unchanged: Option<bool>,
    #[serde(default)]
    pub commit_message: Option<String>,
}

impl PhaseReport {
    /// Extract the last report block from agent output.
    pub fn extract(output: &str) -> Result<Self, AgentError> {
        let body = REPORT_REGEX
            .captures_iter(output)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| AgentError::MalformedResponse("no <report> block in agent output".into()))?;

        let body = FENCE_REGEX
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map_or(body, |m| m.as_str());

        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(body)
            .map_err(|e| AgentError::MalformedResponse(format!("report is not valid YAML: {}", e)))
    }

    /// Outcome this report records for `phase`.
    ///
    /// Only Verify carries a verdict; without one it is recorded as
    /// COMPLETED and the readiness gate keeps it out of Finalize.
    pub fn outcome_for(&self, phase: Phase) -> Outcome {
        match (phase, self.verdict) {
            (Phase::Verify, Some(Verdict::Pass)) => Outcome::Pass,
            (Phase::Verify, Some(Verdict::Fail)) => Outcome::Fail,
            _ => Outcome::Completed,
        }
    }

    /// Criteria carried by the report, normalised.
    pub fn criteria(&self) -> Vec<AcceptanceCriterion> {
        self.acceptance_criteria
            .iter()
            .cloned()
            .map(AcceptanceCriterion::from)
            .collect()
    }

    /// Build the iteration log entry for `phase`.
    pub fn into_log(self, phase: Phase) -> IterationLog {
        let mut log = IterationLog::new(self.outcome_for(phase));
        log.summary = self.summary.unwrap_or_default();
        log.steps = self.steps;
        log.commands = self.commands;
        log.outputs = self.outputs;
        log.open_issues = self.open_issues;
        log.required_fixes = self.required_fixes;
        log.behavior_unchanged = self.behavior_unchanged;
        log.commit_message = self.commit_message;
        log
    }
}
