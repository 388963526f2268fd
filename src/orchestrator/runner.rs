use std::sync::Arc;

use crate::agent::{AgentResponse, PhaseAgent, PhaseRequest};
use crate::errors::PhaseError;
use crate::gates::{Readiness, validate};
use crate::mission::{AcceptanceCriterion, IterationLog, Mission, UsageRecord};
use crate::phase::{Outcome, Phase, PhasePointer, transition};
use crate::prompt::PromptBuilder;
use crate::retry::{RetryError, RetryPolicy, call_with_retry};

/// Executes one phase iteration and records it on the mission.
pub struct PhaseRunner {
    agent: Arc<dyn PhaseAgent>,
    retry: RetryPolicy,
    model: String,
    prompts: PromptBuilder,
}

/// What one runner invocation did to the mission.
#[derive(Debug)]
pub struct PhaseRun {
    /// The mission with the new iteration appended
    pub mission: Mission,
    pub phase: Phase,
    pub iteration: u32,
    pub outcome: Outcome,
    /// Pointer the transition table asked for
    pub requested: PhasePointer,
    /// Set when the agent call failed; the pointer did not move
    pub failure: Option<PhaseError>,
    /// Set when the requested pointer failed its readiness check
    pub blocked: Option<Readiness>,
}

impl PhaseRun {
    pub fn advanced(&self) -> bool {
        self.failure.is_none() && self.blocked.is_none() && self.requested != PhasePointer::Active(self.phase)
    }
}

impl PhaseRunner {
    pub fn new(agent: Arc<dyn PhaseAgent>, retry: RetryPolicy, model: &str, prompts: PromptBuilder) -> Self {
        Self {
            agent,
            retry,
            model: model.to_string(),
            prompts,
        }
    }

    pub fn prompt_for(&self, mission: &Mission, phase: Phase) -> String {
        self.prompts
            .build(mission, phase, mission.record(phase).next_iteration())
    }

    /// Run `phase` against the agent and fold the result into `mission`.
    ///
    /// Exactly one iteration and one usage record are appended, whether the
    /// call succeeds or not. The pointer moves only on success and only if
    /// the target phase's entry criteria hold.
    pub async fn run(&self, mission: Mission, phase: Phase) -> PhaseRun {
        let iteration = mission.record(phase).next_iteration();
        let request = PhaseRequest {
            mission_id: mission.id.clone(),
            phase,
            iteration,
            model: self.model.clone(),
            prompt: self.prompts.build(&mission, phase, iteration),
        };

        tracing::info!(mission = %mission.id, %phase, iteration, "Running phase");

        let agent = &self.agent;
        let request_ref = &request;
        let result = call_with_retry(&self.retry, move |attempt| {
            tracing::debug!(%phase, attempt, "Calling agent");
            agent.execute(request_ref)
        })
        .await;

        match result {
            Ok(response) => self.record_success(mission, phase, response),
            Err(err) => {
                let failure = match err {
                    RetryError::Fatal { error, .. } => PhaseError::Fatal(error),
                    RetryError::Exhausted { attempts, last } => {
                        PhaseError::RetriesExhausted { attempts, last }
                    }
                };
                self.record_failure(mission, phase, failure)
            }
        }
    }

    fn record_success(&self, mut mission: Mission, phase: Phase, response: AgentResponse) -> PhaseRun {
        let AgentResponse {
            report,
            usage,
            cost_usd,
        } = response;

        mission.record_usage(
            UsageRecord::new(phase, &self.model).with_tokens(
                usage.prompt_tokens,
                usage.completion_tokens,
                cost_usd,
            ),
        );

        let criteria = report.criteria();
        match phase {
            Phase::Plan if !criteria.is_empty() => mission.phases.plan.acceptance_criteria = criteria,
            Phase::Verify => update_criteria(&mut mission.phases.plan.acceptance_criteria, &criteria),
            _ => {}
        }

        let log = report.into_log(phase);
        let outcome = log.outcome;
        let iteration = mission.record_mut(phase).append(log);

        let requested = transition(phase, outcome);
        let readiness = validate(&mission, requested);
        let blocked = if readiness.is_ok() {
            mission.current_phase = requested;
            None
        } else {
            tracing::warn!(
                mission = %mission.id,
                %phase,
                target = %requested,
                missing = ?readiness.missing,
                "Transition blocked"
            );
            if let Some(log) = mission.record_mut(phase).latest_mut() {
                log.blocked_by = readiness.missing.clone();
            }
            Some(readiness)
        };

        tracing::info!(
            mission = %mission.id,
            %phase,
            iteration,
            %outcome,
            pointer = %mission.current_phase,
            "Phase finished"
        );

        PhaseRun {
            mission,
            phase,
            iteration,
            outcome,
            requested,
            failure: None,
            blocked,
        }
    }

    fn record_failure(&self, mut mission: Mission, phase: Phase, failure: PhaseError) -> PhaseRun {
        let last = match &failure {
            PhaseError::RetriesExhausted { last, .. } => last,
            PhaseError::Fatal(error) => error,
        };
        mission.record_usage(UsageRecord::new(phase, &self.model).failed(last.to_string()));

        let iteration = mission
            .record_mut(phase)
            .append(IterationLog::failed(failure.to_string()));

        tracing::warn!(mission = %mission.id, %phase, iteration, error = %failure, "Phase failed");

        PhaseRun {
            mission,
            phase,
            iteration,
            outcome: Outcome::Error,
            requested: transition(phase, Outcome::Error),
            failure: Some(failure),
            blocked: None,
        }
    }
}

/// Copy verifier statuses onto matching plan criteria.
fn update_criteria(plan: &mut [AcceptanceCriterion], reported: &[AcceptanceCriterion]) {
    for criterion in plan.iter_mut() {
        if let Some(found) = reported
            .iter()
            .find(|r| r.description.trim() == criterion.description.trim())
        {
            criterion.status = found.status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::ScriptedAgent;
    use crate::errors::AgentError;
    use crate::mission::{CriterionStatus, MissionContext, TestRigor};
    use std::time::Duration;
    use tempfile::tempdir;

    fn runner(agent: Arc<ScriptedAgent>, dir: &std::path::Path) -> PhaseRunner {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        PhaseRunner::new(
            agent,
            policy,
            "test-model",
            PromptBuilder::new(dir.join("agents"), dir.join("CONTRACT.md")),
        )
    }

    fn mission() -> Mission {
        Mission::new("m1", MissionContext::default(), TestRigor::Smoke)
    }

    const PLAN: &str = r#"
summary: plan
acceptance_criteria: [loader reads layered files]
steps:
  - description: add loader
    expected_outcome: tests cover precedence
"#;

    #[tokio::test]
    async fn test_successful_plan_advances_pointer() {
        let dir = tempdir().unwrap();
        let agent = Arc::new(ScriptedAgent::new());
        agent.push_report(Phase::Plan, PLAN);

        let run = runner(agent.clone(), dir.path()).run(mission(), Phase::Plan).await;

        assert!(run.advanced());
        assert_eq!(run.iteration, 1);
        assert_eq!(run.mission.current_phase, PhasePointer::Active(Phase::Implement));
        assert_eq!(run.mission.phases.plan.acceptance_criteria.len(), 1);
        assert_eq!(run.mission.usage_totals().runs, 1);

        let requests = agent.requests.lock().unwrap();
        assert_eq!(requests[0].model, "test-model");
        assert!(requests[0].prompt.contains("You are the planner"));
    }

    #[tokio::test]
    async fn test_empty_plan_report_is_blocked() {
        let dir = tempdir().unwrap();
        let agent = Arc::new(ScriptedAgent::new());

        let run = runner(agent, dir.path()).run(mission(), Phase::Plan).await;

        let blocked = run.blocked.as_ref().unwrap();
        assert_eq!(blocked.missing.len(), 2);
        assert_eq!(run.mission.current_phase, PhasePointer::Active(Phase::Plan));
        let log = run.mission.phases.plan.latest().unwrap();
        assert_eq!(log.outcome, Outcome::Completed);
        assert_eq!(log.blocked_by, blocked.missing);
    }

    #[tokio::test]
    async fn test_exhausted_retries_record_error_iteration() {
        let dir = tempdir().unwrap();
        let agent = Arc::new(ScriptedAgent::new());
        for _ in 0..3 {
            agent.push(Phase::Plan, Err(AgentError::RateLimited("429".into())));
        }

        let run = runner(agent.clone(), dir.path()).run(mission(), Phase::Plan).await;

        assert_eq!(agent.calls(), 3);
        assert!(matches!(
            run.failure,
            Some(PhaseError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(run.outcome, Outcome::Error);
        assert_eq!(run.mission.current_phase, PhasePointer::Active(Phase::Plan));
        let log = run.mission.phases.plan.latest().unwrap();
        assert!(log.error.as_deref().unwrap().contains("429"));
        let ledger = run.mission.usage.as_ref().unwrap();
        assert!(!ledger.runs()[0].success);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let dir = tempdir().unwrap();
        let agent = Arc::new(ScriptedAgent::new());
        agent.push(Phase::Plan, Err(AgentError::Authentication("401".into())));

        let run = runner(agent.clone(), dir.path()).run(mission(), Phase::Plan).await;

        assert_eq!(agent.calls(), 1);
        assert!(matches!(run.failure, Some(PhaseError::Fatal(AgentError::Authentication(_)))));
    }

    #[tokio::test]
    async fn test_verify_updates_plan_criteria_status() {
        let dir = tempdir().unwrap();
        let agent = Arc::new(ScriptedAgent::new());
        agent.push_report(
            Phase::Verify,
            "verdict: FAIL\nacceptance_criteria:\n  - description: loader reads layered files\n    status: FAIL\nrequired_fixes: [handle missing file]\n",
        );

        let mut m = mission();
        m.phases.plan.acceptance_criteria.push(AcceptanceCriterion {
            description: "loader reads layered files".into(),
            status: CriterionStatus::Unknown,
        });
        m.current_phase = PhasePointer::Active(Phase::Verify);

        let run = runner(agent, dir.path()).run(m, Phase::Verify).await;
        assert_eq!(run.outcome, Outcome::Fail);
        assert_eq!(
            run.mission.phases.plan.acceptance_criteria[0].status,
            CriterionStatus::Fail
        );
        assert_eq!(run.requested, PhasePointer::Active(Phase::Implement));
    }
}
