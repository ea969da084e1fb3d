//! Compensation engine: best-effort reversal of executed platform actions.
//!
//! Given the action log of the most recent execution pass, [`reverse_actions`]
//! undoes reversible, successful actions in strict reverse (LIFO) order and
//! records the outcome of every entry — including the ones it skipped. A
//! failed reversal does not abort the remaining reversals; compensation is
//! deliberately best-effort, not all-or-nothing, and the per-action outcomes
//! are what the moderator sees in the rollback history.
//!
//! The engine performs no state mutation itself. The rollback node commits
//! the record it builds.

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::case::{
    ActionReversal, ActionStatus, Case, ExecutedAction, ReversalKind, ReversalStatus,
    RollbackRecord, RollbackRequest,
};
use crate::platform::PlatformApi;

/// Reverse `actions` in LIFO order against the platform.
///
/// Every input entry produces exactly one [`ActionReversal`], in reversal
/// order: non-reversible entries and entries whose original call did not
/// succeed are marked [`ReversalStatus::Skipped`] without touching the
/// platform; the rest are attempted independently and marked `Success` or
/// `Failed` with the captured receipt or error.
#[instrument(skip_all, fields(actions = actions.len()))]
pub async fn reverse_actions(
    actions: &[ExecutedAction],
    platform: &dyn PlatformApi,
) -> Vec<ActionReversal> {
    let mut reversals = Vec::with_capacity(actions.len());

    for action in actions.iter().rev() {
        let reversal = match (action.reversal, action.status) {
            (Some(kind), ActionStatus::Success) => {
                let outcome = match kind {
                    ReversalKind::RestoreContent => {
                        platform.restore_content(&action.params.content_id).await
                    }
                    ReversalKind::UnbanUser => {
                        platform.unban_user(&action.params.content_id).await
                    }
                };
                match outcome {
                    Ok(receipt) => {
                        tracing::debug!(action = %action.kind, "reversed");
                        ActionReversal {
                            original_action: action.kind,
                            status: ReversalStatus::Success,
                            timestamp: receipt.timestamp,
                            result: serde_json::to_value(&receipt).ok(),
                            error: None,
                        }
                    }
                    Err(err) => {
                        tracing::warn!(action = %action.kind, error = %err, "reversal failed");
                        ActionReversal {
                            original_action: action.kind,
                            status: ReversalStatus::Failed,
                            timestamp: Utc::now(),
                            result: None,
                            error: Some(err.to_string()),
                        }
                    }
                }
            }
            _ => {
                tracing::debug!(action = %action.kind, "skipped (non-reversible or not successful)");
                ActionReversal {
                    original_action: action.kind,
                    status: ReversalStatus::Skipped,
                    timestamp: Utc::now(),
                    result: None,
                    error: None,
                }
            }
        };
        reversals.push(reversal);
    }

    reversals
}

/// Assemble the permanent rollback record for one completed compensation
/// pass. `escalation_number` is the escalation the imminent re-review will
/// carry (the case's current count plus one).
#[must_use]
pub fn build_rollback_record(
    case: &Case,
    request: &RollbackRequest,
    actions_reversed: Vec<ActionReversal>,
) -> RollbackRecord {
    RollbackRecord {
        rollback_id: Uuid::new_v4(),
        reason: request.reason.clone(),
        requested_by: request.requested_by.clone(),
        requested_at: request.requested_at,
        previous_decision: case.human_decision.clone(),
        escalation_number: case.escalation_count + 1,
        actions_reversed,
        completed_at: Utc::now(),
    }
}
