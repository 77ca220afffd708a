//! Tool approval policy.
//!
//! The engine pauses a tool invocation until the gateway answers its
//! `tool_approval.requested` event. The policy deciding that answer is
//! injected into each session so a stricter implementation (rate limits,
//! allow-lists) is a drop-in replacement.

use async_trait::async_trait;
use tracing::debug;

/// Decision for one tool-approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Allow the tool invocation
    Approve,
    /// Deny the tool invocation
    Deny,
}

impl ApprovalDecision {
    /// Whether this decision allows the invocation.
    pub fn is_approved(self) -> bool {
        matches!(self, ApprovalDecision::Approve)
    }
}

/// Policy answering tool-approval requests on behalf of the session.
#[async_trait]
pub trait ApprovalPolicy: Send + Sync {
    /// Decide one approval request.
    async fn decide(&self, tool_name: &str, approval_id: &str) -> ApprovalDecision;
}

/// Policy that approves every tool invocation without gating.
///
/// This is a deliberate simplification, not a security boundary: the
/// deployed tool set is trusted and human-in-the-loop gating is out of
/// scope for this gateway.
#[derive(Debug, Default, Clone)]
pub struct AutoApproveAll;

#[async_trait]
impl ApprovalPolicy for AutoApproveAll {
    async fn decide(&self, tool_name: &str, approval_id: &str) -> ApprovalDecision {
        debug!(tool = %tool_name, approval = %approval_id, "Auto-approving tool invocation");
        ApprovalDecision::Approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_approve_all() {
        let policy = AutoApproveAll;
        let decision = policy.decide("weather_lookup", "appr_1").await;
        assert_eq!(decision, ApprovalDecision::Approve);
        assert!(decision.is_approved());
    }
}
