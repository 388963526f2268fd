//! Phase definitions and the mission state machine.
//!
//! This module provides:
//! - `Phase`: the four fixed pipeline phases
//! - `PhasePointer`: the persisted "current phase" field (`""` means complete)
//! - `Outcome`: the recorded result of one phase iteration
//! - `transition`: the total transition function over (phase, outcome)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One stage of the mission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Plan,
    Implement,
    Verify,
    Finalize,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Plan, Phase::Implement, Phase::Verify, Phase::Finalize];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Plan => "plan",
            Phase::Implement => "implement",
            Phase::Verify => "verify",
            Phase::Finalize => "finalize",
        }
    }

    /// Whether running this phase may modify source code.
    pub fn operation_kind(&self) -> OperationKind {
        match self {
            Phase::Implement => OperationKind::CodeMutating,
            Phase::Plan | Phase::Verify | Phase::Finalize => OperationKind::ReadOnly,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plan" => Ok(Phase::Plan),
            "implement" => Ok(Phase::Implement),
            "verify" => Ok(Phase::Verify),
            "finalize" => Ok(Phase::Finalize),
            other => anyhow::bail!(
                "Invalid phase '{}'. Valid values: plan, implement, verify, finalize",
                other
            ),
        }
    }
}

/// Classification used by the approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Inspection or report-only work; never needs approval.
    ReadOnly,
    /// May change the code under work; approval required unless auto-approved.
    CodeMutating,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::ReadOnly => f.write_str("read-only"),
            OperationKind::CodeMutating => f.write_str("code-mutating"),
        }
    }
}

/// Where a mission currently stands.
///
/// Persisted as a plain string: the phase name, or the empty string once the
/// mission is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhasePointer {
    Active(Phase),
    Complete,
}

impl PhasePointer {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            PhasePointer::Active(phase) => Some(*phase),
            PhasePointer::Complete => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PhasePointer::Complete)
    }
}

impl Default for PhasePointer {
    fn default() -> Self {
        PhasePointer::Active(Phase::Plan)
    }
}

impl From<Phase> for PhasePointer {
    fn from(phase: Phase) -> Self {
        PhasePointer::Active(phase)
    }
}

impl fmt::Display for PhasePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhasePointer::Active(phase) => write!(f, "{}", phase),
            PhasePointer::Complete => f.write_str("complete"),
        }
    }
}

impl Serialize for PhasePointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PhasePointer::Active(phase) => serializer.serialize_str(phase.as_str()),
            PhasePointer::Complete => serializer.serialize_str(""),
        }
    }
}

struct PointerVisitor;

impl serde::de::Visitor<'_> for PointerVisitor {
    type Value = PhasePointer;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a phase name or an empty string")
    }

    fn visit_str<E: serde::de::Error>(self, raw: &str) -> Result<Self::Value, E> {
        if raw.trim().is_empty() {
            return Ok(PhasePointer::Complete);
        }
        raw.parse::<Phase>()
            .map(PhasePointer::Active)
            .map_err(E::custom)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(PhasePointer::Complete)
    }
}

// `deserialize_any` keeps an absent field an error instead of an implicit "complete".
impl<'de> Deserialize<'de> for PhasePointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PointerVisitor)
    }
}

/// Recorded result of one phase iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// The phase ran and produced its report (no verdict applies).
    Completed,
    /// Verification passed.
    Pass,
    /// Verification failed.
    Fail,
    /// The external call failed; the phase must be re-run.
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => f.write_str("COMPLETED"),
            Outcome::Pass => f.write_str("PASS"),
            Outcome::Fail => f.write_str("FAIL"),
            Outcome::Error => f.write_str("ERROR"),
        }
    }
}

/// The fixed transition table.
///
/// Total over every (phase, outcome) pair. An `Error` outcome keeps the
/// mission on the same phase; Verify routes FAIL back to Implement. Entry
/// into Finalize and Complete is still subject to the readiness gate.
pub fn transition(phase: Phase, outcome: Outcome) -> PhasePointer {
    if outcome == Outcome::Error {
        return PhasePointer::Active(phase);
    }
    match (phase, outcome) {
        (Phase::Plan, _) => PhasePointer::Active(Phase::Implement),
        (Phase::Implement, _) => PhasePointer::Active(Phase::Verify),
        (Phase::Verify, Outcome::Fail) => PhasePointer::Active(Phase::Implement),
        (Phase::Verify, _) => PhasePointer::Active(Phase::Finalize),
        (Phase::Finalize, _) => PhasePointer::Complete,
    }
}

/// Every pointer reachable in one step from `phase`.
pub fn successors(phase: Phase) -> Vec<PhasePointer> {
    match phase {
        Phase::Plan => vec![Phase::Plan.into(), Phase::Implement.into()],
        Phase::Implement => vec![Phase::Implement.into(), Phase::Verify.into()],
        Phase::Verify => vec![
            Phase::Verify.into(),
            Phase::Implement.into(),
            Phase::Finalize.into(),
        ],
        Phase::Finalize => vec![Phase::Finalize.into(), PhasePointer::Complete],
    }
}
