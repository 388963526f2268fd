//! Gates a mission must pass before a phase runs or the pointer moves.
//!
//! | Gate | Checks | Failure |
//! |------|--------|---------|
//! | [`readiness`] | required fields of the mission before entering a phase | `ValidationBlocked` |
//! | [`approval`] | operator consent before a code-mutating phase | `ApprovalDenied` |

pub mod approval;
pub mod readiness;

pub use approval::{
    ApprovalGate, ApprovalRequest, Approver, Authorization, ChannelApprover, GateDecision,
    InteractiveApprover, StaticApprover,
};
pub use readiness::{Readiness, validate};
