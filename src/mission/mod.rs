//! Mission artifact data model.
//!
//! A mission is persisted as one `progress.yaml` document:
//!
//! ```yaml
//! id: m1
//! current_phase: verify        # '' once the mission is complete
//! test_rigor: SMOKE
//! mission_context:
//!   objective: Replace the config loader
//!   scope: [src/config.rs]
//! phases:
//!   plan:
//!     acceptance_criteria:
//!       - description: loader reads layered files
//!         status: UNKNOWN
//!     iterations:
//!       - iteration: 1
//!         outcome: COMPLETED
//!         steps:
//!           - description: add layered loader
//!             expected_outcome: unit tests cover file/env precedence
//!   implement: { iterations: [...] }
//! usage:
//!   runs: [...]
//! ```
//!
//! Every field except `current_phase` is optional on read, so records written
//! by older versions keep loading as new optional fields are added.

pub mod usage;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::{Outcome, Phase, PhasePointer};

pub use usage::{UsageLedger, UsageRecord, UsageTotals};

/// How much testing the mission expects from the Verify phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestRigor {
    #[default]
    None,
    Smoke,
    Full,
}

impl fmt::Display for TestRigor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestRigor::None => f.write_str("NONE"),
            TestRigor::Smoke => f.write_str("SMOKE"),
            TestRigor::Full => f.write_str("FULL"),
        }
    }
}

impl std::str::FromStr for TestRigor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(TestRigor::None),
            "SMOKE" => Ok(TestRigor::Smoke),
            "FULL" => Ok(TestRigor::Full),
            _ => anyhow::bail!("Invalid test rigor '{}'. Valid values: none, smoke, full", s),
        }
    }
}

/// Objective, scope and constraints of a mission. Opaque to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionContext {
    #[serde(default)]
    pub objective: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_goals: Vec<String>,
    /// Any additional fields supplied at creation time.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CriterionStatus {
    Pass,
    Fail,
    #[default]
    Unknown,
}

impl fmt::Display for CriterionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriterionStatus::Pass => f.write_str("PASS"),
            CriterionStatus::Fail => f.write_str("FAIL"),
            CriterionStatus::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceCriterion {
    pub description: String,
    #[serde(default)]
    pub status: CriterionStatus,
}

/// One planned step of the Plan phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,
}

impl PlanStep {
    pub fn has_expected_outcome(&self) -> bool {
        self.expected_outcome
            .as_deref()
            .is_some_and(|o| !o.trim().is_empty())
    }
}

/// A command executed during a phase together with what it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl CommandRecord {
    pub fn has_result(&self) -> bool {
        self.exit_code.is_some() || self.result.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

/// Log entry for one execution of a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationLog {
    pub iteration: u32,
    pub recorded_at: DateTime<Utc>,
    pub outcome: Outcome,
    #[serde(default)]
    pub summary: String,
    /// Planned steps (Plan only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<PlanStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_issues: Vec<String>,
    /// Fixes the verifier requires before finalizing (Verify only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fixes: Vec<String>,
    /// Explicit no-behaviour-change confirmation (Finalize only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_unchanged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// Failure message when the outcome is ERROR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Readiness diagnostics that kept the pointer from advancing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<String>,
}

impl IterationLog {
    /// A blank entry; the iteration number is assigned on append.
    pub fn new(outcome: Outcome) -> Self {
        Self {
            iteration: 0,
            recorded_at: Utc::now(),
            outcome,
            summary: String::new(),
            steps: Vec::new(),
            commands: Vec::new(),
            outputs: Vec::new(),
            open_issues: Vec::new(),
            required_fixes: Vec::new(),
            behavior_unchanged: None,
            commit_message: None,
            error: None,
            blocked_by: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let mut log = Self::new(Outcome::Error);
        log.error = Some(message.into());
        log
    }
}

/// Acceptance criteria and iteration history of one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<AcceptanceCriterion>,
    #[serde(default)]
    pub iterations: Vec<IterationLog>,
}

impl PhaseRecord {
    pub fn latest(&self) -> Option<&IterationLog> {
        self.iterations.last()
    }

    pub fn latest_mut(&mut self) -> Option<&mut IterationLog> {
        self.iterations.last_mut()
    }

    /// Number the next appended iteration will receive.
    pub fn next_iteration(&self) -> u32 {
        self.iterations.last().map_or(1, |log| log.iteration + 1)
    }

    /// Append a log entry, numbering it after the current latest iteration.
    pub fn append(&mut self, mut log: IterationLog) -> u32 {
        log.iteration = self.next_iteration();
        let number = log.iteration;
        self.iterations.push(log);
        number
    }
}

/// Per-phase records keyed by phase name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecords {
    #[serde(default)]
    pub plan: PhaseRecord,
    #[serde(default)]
    pub implement: PhaseRecord,
    #[serde(default)]
    pub verify: PhaseRecord,
    #[serde(default)]
    pub finalize: PhaseRecord,
}

/// One unit of tracked work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    /// Set from the artifact path on load.
    #[serde(default)]
    pub id: String,
    pub current_phase: PhasePointer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test_rigor: TestRigor,
    #[serde(default)]
    pub mission_context: MissionContext,
    #[serde(default)]
    pub phases: PhaseRecords,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageLedger>,
}

impl Mission {
    pub fn new(id: &str, context: MissionContext, test_rigor: TestRigor) -> Self {
        Self {
            id: id.to_string(),
            current_phase: PhasePointer::Active(Phase::Plan),
            created_at: Some(Utc::now()),
            test_rigor,
            mission_context: context,
            phases: PhaseRecords::default(),
            usage: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current_phase.is_complete()
    }

    pub fn record(&self, phase: Phase) -> &PhaseRecord {
        match phase {
            Phase::Plan => &self.phases.plan,
            Phase::Implement => &self.phases.implement,
            Phase::Verify => &self.phases.verify,
            Phase::Finalize => &self.phases.finalize,
        }
    }

    pub fn record_mut(&mut self, phase: Phase) -> &mut PhaseRecord {
        match phase {
            Phase::Plan => &mut self.phases.plan,
            Phase::Implement => &mut self.phases.implement,
            Phase::Verify => &mut self.phases.verify,
            Phase::Finalize => &mut self.phases.finalize,
        }
    }

    pub fn last_outcome(&self, phase: Phase) -> Option<Outcome> {
        self.record(phase).latest().map(|log| log.outcome)
    }

    /// Record a call in the usage ledger, creating the ledger on first use.
    pub fn record_usage(&mut self, record: UsageRecord) {
        self.usage.get_or_insert_with(UsageLedger::default).append(record);
    }

    pub fn usage_totals(&self) -> UsageTotals {
        self.usage
            .as_ref()
            .map(UsageLedger::totals)
            .unwrap_or_default()
    }
}
