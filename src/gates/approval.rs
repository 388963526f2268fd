//! Operator approval before code-mutating phases.
//!
//! The gate asks an [`Approver`] only when the phase may change code and
//! auto-approval is off. An approver may answer immediately or hand back a
//! pending decision that the gate awaits, so approvals can come from
//! something other than the local terminal.

use async_trait::async_trait;
use dialoguer::{Select, theme::ColorfulTheme};
use tokio::sync::oneshot;

use crate::phase::{OperationKind, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Approved,
    /// Approved, and every later request in this run is approved too.
    ApprovedAll,
    Denied,
}

impl GateDecision {
    pub fn is_approved(&self) -> bool {
        !matches!(self, GateDecision::Denied)
    }
}

/// What the operator is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub mission_id: String,
    pub phase: Phase,
    pub operation: OperationKind,
    pub iteration: u32,
    /// A single action inside the phase, such as a file write, when that is
    /// what needs consent rather than the whole phase.
    pub action: Option<String>,
}

impl ApprovalRequest {
    pub fn new(mission_id: &str, phase: Phase, iteration: u32) -> Self {
        Self {
            mission_id: mission_id.to_string(),
            phase,
            operation: phase.operation_kind(),
            iteration,
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// An approver's answer.
#[derive(Debug)]
pub enum Authorization {
    Approved,
    ApprovedAll,
    Denied,
    /// Decision arrives later; a dropped sender counts as denial.
    Pending(oneshot::Receiver<bool>),
}

#[async_trait]
pub trait Approver: Send + Sync {
    async fn authorize(&self, request: &ApprovalRequest) -> Authorization;
}

/// Prompts on the terminal. Denies when no one is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractiveApprover;

#[async_trait]
impl Approver for InteractiveApprover {
    async fn authorize(&self, request: &ApprovalRequest) -> Authorization {
        if !console::user_attended() {
            tracing::warn!(
                mission = %request.mission_id,
                phase = %request.phase,
                "No terminal attached for approval; denying"
            );
            return Authorization::Denied;
        }

        let (prompt, options) = match &request.action {
            Some(action) => (
                format!(
                    "Allow {} during the {} phase of mission '{}'?",
                    action, request.phase, request.mission_id
                ),
                ["Yes, allow it", "Yes, and allow the rest", "No, refuse"],
            ),
            None => (
                format!(
                    "Run {} phase (iteration {}) for mission '{}'? It may modify code",
                    request.phase, request.iteration, request.mission_id
                ),
                [
                    "Yes, run this phase",
                    "Yes, and approve the rest of this run",
                    "No, stop here",
                ],
            ),
        };
        let selection = tokio::task::spawn_blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&options)
                .default(0)
                .interact()
        })
        .await;

        match selection {
            Ok(Ok(0)) => Authorization::Approved,
            Ok(Ok(1)) => Authorization::ApprovedAll,
            Ok(Ok(_)) => Authorization::Denied,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Approval prompt failed; denying");
                Authorization::Denied
            }
            Err(e) => {
                tracing::warn!(error = %e, "Approval prompt task failed; denying");
                Authorization::Denied
            }
        }
    }
}

/// Always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticApprover(pub bool);

#[async_trait]
impl Approver for StaticApprover {
    async fn authorize(&self, _request: &ApprovalRequest) -> Authorization {
        if self.0 {
            Authorization::Approved
        } else {
            Authorization::Denied
        }
    }
}

/// Forwards each request to a channel and returns the pending reply.
pub struct ChannelApprover {
    requests: tokio::sync::mpsc::UnboundedSender<(ApprovalRequest, oneshot::Sender<bool>)>,
}

impl ChannelApprover {
    pub fn channel() -> (
        Self,
        tokio::sync::mpsc::UnboundedReceiver<(ApprovalRequest, oneshot::Sender<bool>)>,
    ) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { requests: tx }, rx)
    }
}

#[async_trait]
impl Approver for ChannelApprover {
    async fn authorize(&self, request: &ApprovalRequest) -> Authorization {
        let (tx, rx) = oneshot::channel();
        if self.requests.send((request.clone(), tx)).is_err() {
            return Authorization::Denied;
        }
        Authorization::Pending(rx)
    }
}

pub struct ApprovalGate {
    pub auto_approve: bool,
    approver: Box<dyn Approver>,
}

impl ApprovalGate {
    pub fn new(auto_approve: bool, approver: Box<dyn Approver>) -> Self {
        Self {
            auto_approve,
            approver,
        }
    }

    /// Decide whether the requested phase may run.
    ///
    /// Read-only phases and auto-approved runs never reach the approver.
    pub async fn check(&mut self, request: &ApprovalRequest) -> GateDecision {
        if request.operation == OperationKind::ReadOnly {
            return GateDecision::Approved;
        }
        if self.auto_approve {
            tracing::debug!(phase = %request.phase, "Auto-approved");
            return GateDecision::Approved;
        }

        let decision = match self.approver.authorize(request).await {
            Authorization::Approved => GateDecision::Approved,
            Authorization::ApprovedAll => GateDecision::ApprovedAll,
            Authorization::Denied => GateDecision::Denied,
            Authorization::Pending(rx) => match rx.await {
                Ok(true) => GateDecision::Approved,
                Ok(false) | Err(_) => GateDecision::Denied,
            },
        };

        if decision == GateDecision::ApprovedAll {
            self.auto_approve = true;
        }
        tracing::info!(
            mission = %request.mission_id,
            phase = %request.phase,
            ?decision,
            "Approval decision"
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingApprover {
        calls: Arc<AtomicUsize>,
        answer: bool,
    }

    #[async_trait]
    impl Approver for CountingApprover {
        async fn authorize(&self, _request: &ApprovalRequest) -> Authorization {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.answer {
                Authorization::Approved
            } else {
                Authorization::Denied
            }
        }
    }

    fn counting(answer: bool) -> (Arc<AtomicUsize>, Box<dyn Approver>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let approver = CountingApprover {
            calls: calls.clone(),
            answer,
        };
        (calls, Box::new(approver))
    }

    #[tokio::test]
    async fn test_read_only_phases_skip_the_approver() {
        let (calls, approver) = counting(false);
        let mut gate = ApprovalGate::new(false, approver);
        for phase in [Phase::Plan, Phase::Verify, Phase::Finalize] {
            let decision = gate.check(&ApprovalRequest::new("m1", phase, 1)).await;
            assert_eq!(decision, GateDecision::Approved);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auto_approve_never_consults_approver() {
        let (calls, approver) = counting(false);
        let mut gate = ApprovalGate::new(true, approver);
        let decision = gate.check(&ApprovalRequest::new("m1", Phase::Implement, 1)).await;
        assert_eq!(decision, GateDecision::Approved);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_implement_is_denied_when_approver_refuses() {
        let (calls, approver) = counting(false);
        let mut gate = ApprovalGate::new(false, approver);
        let decision = gate.check(&ApprovalRequest::new("m1", Phase::Implement, 2)).await;
        assert_eq!(decision, GateDecision::Denied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pending_decision_is_awaited() {
        let (approver, mut requests) = ChannelApprover::channel();
        let mut gate = ApprovalGate::new(false, Box::new(approver));

        let responder = tokio::spawn(async move {
            let (request, reply) = requests.recv().await.unwrap();
            assert_eq!(request.phase, Phase::Implement);
            reply.send(true).unwrap();
        });

        let decision = gate.check(&ApprovalRequest::new("m1", Phase::Implement, 1)).await;
        responder.await.unwrap();
        assert_eq!(decision, GateDecision::Approved);
    }

    #[tokio::test]
    async fn test_dropped_pending_decision_denies() {
        let (approver, mut requests) = ChannelApprover::channel();
        let mut gate = ApprovalGate::new(false, Box::new(approver));

        let responder = tokio::spawn(async move {
            let (_request, reply) = requests.recv().await.unwrap();
            drop(reply);
        });

        let decision = gate.check(&ApprovalRequest::new("m1", Phase::Implement, 1)).await;
        responder.await.unwrap();
        assert_eq!(decision, GateDecision::Denied);
    }

    #[tokio::test]
    async fn test_approve_all_sticks_for_the_run() {
        struct AllApprover(Arc<AtomicUsize>);

        #[async_trait]
        impl Approver for AllApprover {
            async fn authorize(&self, _request: &ApprovalRequest) -> Authorization {
                self.0.fetch_add(1, Ordering::SeqCst);
                Authorization::ApprovedAll
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let mut gate = ApprovalGate::new(false, Box::new(AllApprover(calls.clone())));
        let request = ApprovalRequest::new("m1", Phase::Implement, 1);
        assert_eq!(gate.check(&request).await, GateDecision::ApprovedAll);
        assert_eq!(gate.check(&request).await, GateDecision::Approved);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
