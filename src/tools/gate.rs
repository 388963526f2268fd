use crate::errors::ToolError;
use crate::gates::{ApprovalGate, ApprovalRequest};
use crate::mission::Mission;

/// Ask the approval gate before a tool changes the workspace.
///
/// The request is made for the mission's current phase, so read-only phases
/// and auto-approved gates allow the action without asking. A complete
/// mission has no phase to charge the action to and is allowed.
pub async fn authorize(gate: &mut ApprovalGate, mission: &Mission, action: &str) -> Result<(), ToolError> {
    let Some(phase) = mission.current_phase.phase() else {
        return Ok(());
    };
    let iteration = mission.record(phase).next_iteration();
    let request = ApprovalRequest::new(&mission.id, phase, iteration).with_action(action);

    if gate.check(&request).await.is_approved() {
        Ok(())
    } else {
        Err(ToolError::Denied {
            mission_id: mission.id.clone(),
            phase,
            action: action.to_string(),
        })
    }
}
