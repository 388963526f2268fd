//! Mission scheduler.
//!
//! One tick moves a mission at most one phase:
//!
//! 1. load the artifact (complete missions stop here)
//! 2. check entry criteria of the current phase
//! 3. ask the approval gate when the phase mutates code
//! 4. run the phase and persist the result
//! 5. surface any recorded failure or blocked transition
//!
//! Steps 2 and 3 never write to the artifact. A run holds the mission lock
//! for its whole duration and checks for cancellation only between ticks.

pub mod runner;

pub use runner::{PhaseRun, PhaseRunner};

use tokio_util::sync::CancellationToken;

use crate::errors::OrchestratorError;
use crate::gates::{ApprovalGate, ApprovalRequest, validate};
use crate::mission::Mission;
use crate::phase::{Outcome, Phase, PhasePointer};
use crate::store::ArtifactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    SingleStep,
    UntilComplete { max_iterations: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Complete,
    SingleStep,
    IterationCeiling,
    Cancelled,
}

/// Summary of one tick that ran a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub phase: Phase,
    pub iteration: u32,
    pub outcome: Outcome,
    pub pointer: PhasePointer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// The mission was already complete; nothing ran.
    AlreadyComplete,
    Ran(TickReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub ticks: Vec<TickReport>,
    pub final_pointer: PhasePointer,
    pub stop: StopReason,
}

type TickObserver = Box<dyn Fn(&TickReport) + Send + Sync>;

pub struct Orchestrator {
    store: ArtifactStore,
    runner: PhaseRunner,
    gate: ApprovalGate,
    observer: Option<TickObserver>,
}

impl Orchestrator {
    pub fn new(store: ArtifactStore, runner: PhaseRunner, gate: ApprovalGate) -> Self {
        Self {
            store,
            runner,
            gate,
            observer: None,
        }
    }

    /// Call `observer` after every tick that ran a phase.
    pub fn with_observer(mut self, observer: impl Fn(&TickReport) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The prompt the next tick would send, without running anything.
    pub fn preview(&self, id: &str) -> Result<Option<(Phase, String)>, OrchestratorError> {
        let mission = self.store.load(id)?;
        Ok(mission
            .current_phase
            .phase()
            .map(|phase| (phase, self.runner.prompt_for(&mission, phase))))
    }

    /// Run a single tick under the mission lock.
    pub async fn tick(&mut self, id: &str) -> Result<Tick, OrchestratorError> {
        let _lock = self.store.lock(id)?;
        self.tick_locked(id).await
    }

    /// Tick repeatedly according to `mode`.
    pub async fn run(
        &mut self,
        id: &str,
        mode: RunMode,
        cancel: &CancellationToken,
    ) -> Result<RunReport, OrchestratorError> {
        let _lock = self.store.lock(id)?;
        let mut ticks = Vec::new();

        let stop = loop {
            if cancel.is_cancelled() {
                tracing::info!(mission = id, "Run cancelled");
                break StopReason::Cancelled;
            }
            if let RunMode::UntilComplete { max_iterations } = mode
                && ticks.len() >= max_iterations as usize
            {
                tracing::info!(mission = id, max_iterations, "Iteration ceiling reached");
                break StopReason::IterationCeiling;
            }

            match self.tick_locked(id).await? {
                Tick::AlreadyComplete => break StopReason::Complete,
                Tick::Ran(report) => {
                    let complete = report.pointer.is_complete();
                    ticks.push(report);
                    if complete {
                        break StopReason::Complete;
                    }
                    if mode == RunMode::SingleStep {
                        break StopReason::SingleStep;
                    }
                }
            }
        };

        let final_pointer = match ticks.last() {
            Some(last) => last.pointer,
            None => self.store.load(id)?.current_phase,
        };

        Ok(RunReport {
            ticks,
            final_pointer,
            stop,
        })
    }

    async fn tick_locked(&mut self, id: &str) -> Result<Tick, OrchestratorError> {
        let mission = self.store.load(id)?;
        let Some(phase) = mission.current_phase.phase() else {
            return Ok(Tick::AlreadyComplete);
        };

        let readiness = validate(&mission, mission.current_phase);
        if !readiness.is_ok() {
            tracing::warn!(mission = id, %phase, missing = ?readiness.missing, "Phase not ready");
            return Err(OrchestratorError::ValidationBlocked {
                target: mission.current_phase,
                missing: readiness.missing,
            });
        }

        let iteration = mission.record(phase).next_iteration();
        let decision = self
            .gate
            .check(&ApprovalRequest::new(id, phase, iteration))
            .await;
        if !decision.is_approved() {
            return Err(OrchestratorError::ApprovalDenied {
                phase,
                operation: phase.operation_kind().to_string(),
            });
        }

        let run = self.runner.run(mission, phase).await;
        self.store.save(&run.mission)?;
        self.finish(run)
    }

    fn finish(&self, run: PhaseRun) -> Result<Tick, OrchestratorError> {
        let report = TickReport {
            phase: run.phase,
            iteration: run.iteration,
            outcome: run.outcome,
            pointer: run.mission.current_phase,
        };
        if let Some(observer) = &self.observer {
            observer(&report);
        }

        if let Some(failure) = run.failure {
            return Err(OrchestratorError::from_phase(run.phase, failure));
        }
        if let Some(readiness) = run.blocked {
            return Err(OrchestratorError::ValidationBlocked {
                target: run.requested,
                missing: readiness.missing,
            });
        }
        Ok(Tick::Ran(report))
    }
}

/// Create a new mission in `store` at the Plan phase.
pub fn create_mission(store: &ArtifactStore, mission: &Mission) -> Result<(), OrchestratorError> {
    store.create(mission)?;
    Ok(())
}
