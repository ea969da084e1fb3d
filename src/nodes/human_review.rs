//! Human review suspension node.

use async_trait::async_trait;

use crate::case::{Case, CaseStatus};
use crate::node::{Node, NodeContext, NodeError};

/// Pure suspension node: no external calls, no decisions.
///
/// Marks the case as awaiting a moderator and bumps the escalation count.
/// This is the single place the count is incremented, so after N suspension
/// entries (initial escalation plus rollback re-escalations) the count is
/// exactly N. The engine persists the checkpoint — including the resume
/// pointer — before returning to the caller.
#[derive(Default)]
pub struct HumanReviewNode;

#[async_trait]
impl Node for HumanReviewNode {
    async fn run(&self, mut case: Case, ctx: &NodeContext) -> Result<Case, NodeError> {
        ctx.emit("human_review", "Pausing for human review");
        case.escalation_count += 1;
        case.status = CaseStatus::PendingHumanReview;
        case.record_event(format!(
            "Escalated for human review (escalation #{}).",
            case.escalation_count
        ));
        Ok(case)
    }
}
