//! Final action execution node.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::case::{
    ActionKind, ActionParams, ActionStatus, Case, CaseStatus, ExecutedAction, HumanDecision,
};
use crate::node::{Node, NodeContext, NodeError};
use crate::platform::{ActionReceipt, PlatformApi, PlatformError};

/// Maps the injected human decision to platform actions and records every
/// invocation.
///
/// Platform actions are not idempotent, so each call is captured as an
/// [`ExecutedAction`] the moment it returns — success or failure — and the
/// whole list replaces `executed_actions` when the node commits. A failed
/// call does not stop the remaining actions; the failure is data in the
/// action log (and the compensation engine will skip it on rollback).
pub struct ExecuteActionNode {
    platform: Arc<dyn PlatformApi>,
}

impl ExecuteActionNode {
    #[must_use]
    pub fn new(platform: Arc<dyn PlatformApi>) -> Self {
        Self { platform }
    }

    /// The deterministic decision → actions table.
    fn planned_actions(decision: &HumanDecision) -> &'static [ActionKind] {
        match decision {
            HumanDecision::RemoveContentAndBan => {
                &[ActionKind::RemoveContent, ActionKind::BanUser]
            }
            HumanDecision::ApproveRemoval => &[ActionKind::RemoveContent],
            HumanDecision::RequestChanges => &[ActionKind::WarnUser],
            // Ignore/close tags and unknown decisions: logged only.
            HumanDecision::Other(_) => &[],
        }
    }

    async fn invoke(&self, kind: ActionKind, content_id: &str) -> Result<ActionReceipt, PlatformError> {
        match kind {
            ActionKind::RemoveContent => self.platform.remove_content(content_id).await,
            ActionKind::BanUser => self.platform.ban_user(content_id).await,
            ActionKind::WarnUser => self.platform.warn_user(content_id).await,
        }
    }
}

#[async_trait]
impl Node for ExecuteActionNode {
    async fn run(&self, mut case: Case, ctx: &NodeContext) -> Result<Case, NodeError> {
        let decision = case
            .human_decision
            .clone()
            .ok_or(NodeError::MissingInput {
                what: "human_decision",
            })?;

        ctx.emit("execute_action", format!("Executing action: {decision}"));
        case.record_event(format!(
            "Executing final action based on human decision: {decision}."
        ));

        let planned = Self::planned_actions(&decision);
        if planned.is_empty() {
            case.record_event(format!(
                "Decision '{decision}' requires no platform action; logged only."
            ));
        }

        let content_id = case.content_id.clone();
        let mut executed = Vec::with_capacity(planned.len());
        let mut failures = 0usize;

        for &kind in planned {
            let record = match self.invoke(kind, &content_id).await {
                Ok(receipt) => ExecutedAction {
                    kind,
                    timestamp: receipt.timestamp,
                    reversible: kind.reversal().is_some(),
                    reversal: kind.reversal(),
                    params: ActionParams {
                        content_id: content_id.clone(),
                    },
                    status: ActionStatus::Success,
                    result: serde_json::to_value(&receipt)?,
                },
                Err(err) => {
                    failures += 1;
                    tracing::warn!(case = %case.case_id, action = %kind, error = %err, "platform action failed");
                    ExecutedAction {
                        kind,
                        timestamp: Utc::now(),
                        reversible: kind.reversal().is_some(),
                        reversal: kind.reversal(),
                        params: ActionParams {
                            content_id: content_id.clone(),
                        },
                        status: ActionStatus::Failed,
                        result: json!({ "error": err.to_string() }),
                    }
                }
            };
            ctx.emit("execute_action", format!("{kind}: {:?}", record.status));
            executed.push(record);
        }

        // The action log of the most recent pass wholly replaces any
        // previous one; rollback relies on this being exactly what ran.
        let executed_count = executed.len();
        case.executed_actions = executed;
        case.status = CaseStatus::Completed;
        if failures > 0 {
            case.record_event(format!(
                "Workflow completed. Executed {executed_count} action(s), {failures} failed."
            ));
        } else {
            case.record_event(format!(
                "Workflow completed. Executed {executed_count} action(s)."
            ));
        }
        Ok(case)
    }
}
