//! The moderation case: the unit of work flowing through the state machine.
//!
//! A [`Case`] is one content item under review. It is created when a
//! moderation request arrives, mutated exclusively by node executions, and
//! persisted as a full snapshot in the checkpoint store after every node.
//! Two of its collections are append-only audit data ([`Case::history`] and
//! [`Case::rollback_history`]); everything else describes where execution
//! currently stands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Where a case stands in its lifecycle. The single source of truth for
/// execution progress; serialized in the original wire spelling so stored
/// snapshots stay readable by existing dashboards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    PendingAiAnalysis,
    AiAnalysisComplete,
    /// The only suspension state: execution halts here until a moderator
    /// decision is injected.
    PendingHumanReview,
    Completed,
    RollbackComplete,
}

impl CaseStatus {
    /// A rollback may only be requested from a terminal-but-reversible state.
    #[must_use]
    pub fn rollback_eligible(&self) -> bool {
        matches!(self, Self::Completed | Self::RollbackComplete)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingAiAnalysis => "PENDING_AI_ANALYSIS",
            Self::AiAnalysisComplete => "AI_ANALYSIS_COMPLETE",
            Self::PendingHumanReview => "PENDING_HUMAN_REVIEW",
            Self::Completed => "COMPLETED",
            Self::RollbackComplete => "ROLLBACK_COMPLETE",
        };
        f.write_str(s)
    }
}

/// What the classifier recommends doing with the content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestedAction {
    Ignore,
    Warn,
    Escalate,
}

/// Severity grade attached to a verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Structured verdict produced by the classifier (or the conservative
/// fallback when its output cannot be parsed).
///
/// Only `confidence_score` and `suggested_action` are required; the rest is
/// advisory detail for the reviewing moderator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0–100 confidence in the assessment.
    pub confidence_score: u8,
    pub suggested_action: SuggestedAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_phrases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigating_context: Option<String>,
}

impl AnalysisResult {
    /// Conservative verdict substituted when classifier output is
    /// unparseable: uncertain, escalate to a human.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            confidence_score: 50,
            suggested_action: SuggestedAction::Escalate,
            violation_type: None,
            severity: None,
            reasoning: None,
            key_phrases: Vec::new(),
            mitigating_context: None,
        }
    }
}

/// A moderator's decision on an escalated case.
///
/// The three known tags map to platform actions; anything else (ignore/close
/// tags, future decision kinds) is carried as [`Other`](Self::Other) and is
/// logged without platform side effects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanDecision {
    RemoveContentAndBan,
    ApproveRemoval,
    RequestChanges,
    #[serde(untagged)]
    Other(String),
}

impl HumanDecision {
    /// Parse a caller-supplied decision tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "remove_content_and_ban" => Self::RemoveContentAndBan,
            "approve_removal" => Self::ApproveRemoval,
            "request_changes" => Self::RequestChanges,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HumanDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveContentAndBan => f.write_str("remove_content_and_ban"),
            Self::ApproveRemoval => f.write_str("approve_removal"),
            Self::RequestChanges => f.write_str("request_changes"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// A platform action the workflow can execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RemoveContent,
    BanUser,
    WarnUser,
}

impl ActionKind {
    /// The compensating operation that undoes this action, if one exists.
    ///
    /// This closed mapping replaces name-based reversal lookup: an action
    /// without a reversal is `None` here, and an unreachable reversal kind
    /// cannot be expressed at all.
    #[must_use]
    pub fn reversal(&self) -> Option<ReversalKind> {
        match self {
            Self::RemoveContent => Some(ReversalKind::RestoreContent),
            Self::BanUser => Some(ReversalKind::UnbanUser),
            // A warning cannot be unsent.
            Self::WarnUser => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RemoveContent => "remove_content",
            Self::BanUser => "ban_user",
            Self::WarnUser => "warn_user",
        };
        f.write_str(s)
    }
}

/// A compensating operation paired with a reversible [`ActionKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalKind {
    RestoreContent,
    UnbanUser,
}

/// Parameters captured alongside an executed action so its reversal can be
/// replayed later without consulting anything but the record itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParams {
    pub content_id: String,
}

/// Whether an individual platform call succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failed,
}

/// One platform action taken during the most recent execution pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutedAction {
    pub kind: ActionKind,
    pub timestamp: DateTime<Utc>,
    pub reversible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversal: Option<ReversalKind>,
    pub params: ActionParams,
    pub status: ActionStatus,
    /// Raw receipt (or error description) returned by the platform.
    pub result: Value,
}

/// Outcome of attempting to reverse one executed action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalStatus {
    Success,
    Failed,
    /// The original action was non-reversible or had not succeeded; no
    /// reversal call was made.
    Skipped,
}

/// Per-action entry in a rollback record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionReversal {
    pub original_action: ActionKind,
    pub status: ReversalStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Transient rollback trigger, present only between the rollback request
/// being accepted and the rollback node committing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRequest {
    pub reason: String,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
}

/// Permanent record of one completed rollback. Appended to
/// [`Case::rollback_history`] and never removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollbackRecord {
    pub rollback_id: Uuid,
    pub reason: String,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_decision: Option<HumanDecision>,
    /// The escalation number the imminent re-review will carry.
    pub escalation_number: u32,
    pub actions_reversed: Vec<ActionReversal>,
    pub completed_at: DateTime<Utc>,
}

/// One line of the audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub event: String,
}

/// One moderation workflow instance, keyed by `case_id`.
///
/// Mutated only by node executions; every mutation goes through
/// [`record_event`](Self::record_event) so `history` and `last_updated`
/// stay consistent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Immutable once assigned; the sole key into the checkpoint store.
    pub case_id: String,
    pub content_id: String,
    pub content_text: String,
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_decision: Option<HumanDecision>,
    pub escalation_count: u32,
    /// Actions taken in the most recent execution pass. Wholly replaced by
    /// each ExecuteAction run and cleared when a rollback completes.
    #[serde(default)]
    pub executed_actions: Vec<ExecutedAction>,
    /// Append-only.
    #[serde(default)]
    pub rollback_history: Vec<RollbackRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_request: Option<RollbackRequest>,
    /// Append-only audit trail.
    pub history: Vec<HistoryEntry>,
    pub last_updated: DateTime<Utc>,
}

impl Case {
    /// Build a fresh case awaiting analysis.
    #[must_use]
    pub fn new(case_id: impl Into<String>, content_id: impl Into<String>, content_text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            case_id: case_id.into(),
            content_id: content_id.into(),
            content_text: content_text.into(),
            status: CaseStatus::PendingAiAnalysis,
            analysis_result: None,
            human_decision: None,
            escalation_count: 0,
            executed_actions: Vec::new(),
            rollback_history: Vec::new(),
            rollback_request: None,
            history: vec![HistoryEntry {
                at: now,
                event: "Workflow started.".to_string(),
            }],
            last_updated: now,
        }
    }

    /// Append an audit entry and refresh `last_updated`.
    pub fn record_event(&mut self, event: impl Into<String>) {
        let now = Utc::now();
        self.history.push(HistoryEntry {
            at: now,
            event: event.into(),
        });
        self.last_updated = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_case_starts_pending_with_one_history_entry() {
        let case = Case::new("case-1", "post-9", "some text");
        assert_eq!(case.status, CaseStatus::PendingAiAnalysis);
        assert_eq!(case.escalation_count, 0);
        assert_eq!(case.history.len(), 1);
        assert!(case.analysis_result.is_none());
    }

    #[test]
    fn record_event_appends_and_touches_last_updated() {
        let mut case = Case::new("case-1", "post-9", "text");
        let before = case.last_updated;
        case.record_event("Something happened.");
        assert_eq!(case.history.len(), 2);
        assert_eq!(case.history[1].event, "Something happened.");
        assert!(case.last_updated >= before);
    }

    #[test]
    fn decision_tags_map_to_variants() {
        assert_eq!(
            HumanDecision::from_tag("remove_content_and_ban"),
            HumanDecision::RemoveContentAndBan
        );
        assert_eq!(
            HumanDecision::from_tag("approve_removal"),
            HumanDecision::ApproveRemoval
        );
        assert_eq!(
            HumanDecision::from_tag("ignore"),
            HumanDecision::Other("ignore".to_string())
        );
    }

    #[test]
    fn reversal_mapping_is_closed() {
        assert_eq!(
            ActionKind::RemoveContent.reversal(),
            Some(ReversalKind::RestoreContent)
        );
        assert_eq!(ActionKind::BanUser.reversal(), Some(ReversalKind::UnbanUser));
        assert_eq!(ActionKind::WarnUser.reversal(), None);
    }

    #[test]
    fn status_serializes_in_wire_spelling() {
        let json = serde_json::to_string(&CaseStatus::PendingHumanReview).unwrap();
        assert_eq!(json, "\"PENDING_HUMAN_REVIEW\"");
        let back: CaseStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CaseStatus::PendingHumanReview);
    }

    #[test]
    fn rollback_eligibility_follows_terminal_states() {
        assert!(CaseStatus::Completed.rollback_eligible());
        assert!(CaseStatus::RollbackComplete.rollback_eligible());
        assert!(!CaseStatus::PendingAiAnalysis.rollback_eligible());
        assert!(!CaseStatus::PendingHumanReview.rollback_eligible());
    }

    #[test]
    fn case_roundtrips_through_json() {
        let mut case = Case::new("case-7", "post-1", "hello");
        case.analysis_result = Some(AnalysisResult::fallback());
        case.human_decision = Some(HumanDecision::ApproveRemoval);
        let json = serde_json::to_string(&case).unwrap();
        let back: Case = serde_json::from_str(&json).unwrap();
        assert_eq!(case, back);
    }
}
