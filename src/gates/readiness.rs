//! Entry criteria for each phase.
//!
//! | Entering | Requires |
//! |----------|----------|
//! | plan | nothing |
//! | implement | plan acceptance criteria, and a planned step with an expected outcome |
//! | verify | an implement command with a recorded result |
//! | finalize | an explicit PASS verdict from verify with no required fixes |
//! | complete | finalize confirming behaviour is unchanged |
//!
//! Every failing rule is reported, not just the first.

use crate::mission::Mission;
use crate::phase::{Outcome, Phase, PhasePointer};

/// Result of checking a mission against a target phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readiness {
    /// One human-readable entry per failing rule.
    pub missing: Vec<String>,
}

impl Readiness {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }

    fn require(&mut self, ok: bool, message: &str) {
        if !ok {
            self.missing.push(message.to_string());
        }
    }
}

/// Check whether `mission` holds everything required to enter `target`.
pub fn validate(mission: &Mission, target: PhasePointer) -> Readiness {
    let mut readiness = Readiness::default();

    match target {
        PhasePointer::Active(Phase::Plan) => {}
        PhasePointer::Active(Phase::Implement) => {
            let plan = mission.record(Phase::Plan);
            readiness.require(
                !plan.acceptance_criteria.is_empty(),
                "plan.acceptance_criteria: at least one acceptance criterion",
            );
            readiness.require(
                plan.latest()
                    .is_some_and(|log| log.steps.iter().any(|s| s.has_expected_outcome())),
                "plan.steps: at least one planned step with an expected_outcome",
            );
        }
        PhasePointer::Active(Phase::Verify) => {
            readiness.require(
                mission
                    .record(Phase::Implement)
                    .latest()
                    .is_some_and(|log| log.commands.iter().any(|c| c.has_result())),
                "implement.commands: at least one executed command with a recorded result",
            );
        }
        PhasePointer::Active(Phase::Finalize) => {
            let latest = mission.record(Phase::Verify).latest();
            readiness.require(
                latest.is_some_and(|log| log.outcome == Outcome::Pass),
                "verify.outcome: an explicit PASS verdict",
            );
            readiness.require(
                latest.is_none_or(|log| log.required_fixes.is_empty()),
                "verify.required_fixes: must be empty",
            );
        }
        PhasePointer::Complete => {
            readiness.require(
                mission
                    .record(Phase::Finalize)
                    .latest()
                    .is_some_and(|log| log.behavior_unchanged == Some(true)),
                "finalize.behavior_unchanged: explicit confirmation that behaviour is unchanged",
            );
        }
    }

    readiness
}
