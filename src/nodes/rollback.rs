//! Rollback node: compensating-action reversal and re-escalation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::case::{Case, CaseStatus, ReversalStatus};
use crate::compensation::{build_rollback_record, reverse_actions};
use crate::node::{Node, NodeContext, NodeError};
use crate::platform::PlatformApi;

/// Drives the compensation engine over the case's action log, commits the
/// rollback record, and clears the execution pass.
///
/// The escalation count is *not* bumped here: the graph routes
/// unconditionally back to the human-review node, which owns the increment.
/// The record's `escalation_number` already names the escalation that
/// re-review will carry.
pub struct RollbackNode {
    platform: Arc<dyn PlatformApi>,
}

impl RollbackNode {
    #[must_use]
    pub fn new(platform: Arc<dyn PlatformApi>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Node for RollbackNode {
    async fn run(&self, mut case: Case, ctx: &NodeContext) -> Result<Case, NodeError> {
        let request = case.rollback_request.clone().ok_or(NodeError::MissingInput {
            what: "rollback_request",
        })?;

        ctx.emit("rollback", format!("Rolling back: {}", request.reason));

        let reversals = reverse_actions(&case.executed_actions, self.platform.as_ref()).await;
        let attempted = reversals
            .iter()
            .filter(|r| r.status != ReversalStatus::Skipped)
            .count();

        let record = build_rollback_record(&case, &request, reversals);
        let rollback_number = record.escalation_number;

        case.rollback_history.push(record);
        case.executed_actions.clear();
        case.human_decision = None;
        case.rollback_request = None;
        case.status = CaseStatus::RollbackComplete;
        case.record_event(format!(
            "Rollback #{rollback_number} completed. Reversed {attempted} action(s)."
        ));

        ctx.emit(
            "rollback",
            format!("Rollback complete (escalation #{rollback_number})"),
        );
        Ok(case)
    }
}
