mod common;

use std::sync::Arc;

use common::{MockPlatform, ScriptedClassifier, engine_with};
use guardian::case::{CaseStatus, HumanDecision};
use guardian::checkpoint::CheckpointStore;
use guardian::engine::{CaseIntake, DecisionSubmission, EngineError, RunOutcome};
use guardian::types::NodeKind;

fn intake(content_id: &str) -> CaseIntake {
    CaseIntake {
        content_id: content_id.to_string(),
        content_text: "some user post".to_string(),
    }
}

fn decision(tag: &str) -> DecisionSubmission {
    DecisionSubmission {
        decision: HumanDecision::from_tag(tag),
        moderator_id: "mod_42".to_string(),
        comment: None,
    }
}

#[tokio::test]
async fn benign_content_auto_resolves_in_one_pass() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, _) = engine_with(ScriptedClassifier::verdict("IGNORE", 5), platform.clone());

    let report = engine.start_case(intake("post-1")).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.status, CaseStatus::Completed);
    assert_eq!(report.ran_nodes, vec![NodeKind::Analyze]);

    let view = engine.snapshot(&report.case_id).await.unwrap();
    assert_eq!(view.case.escalation_count, 0);
    assert!(view.next_node.is_none());
    // No moderator, no platform side effects.
    assert!(platform.calls().is_empty());
    assert!(
        view.case
            .history
            .iter()
            .any(|h| h.event.contains("auto-resolved"))
    );
}

#[tokio::test]
async fn risky_content_suspends_for_review() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, store) = engine_with(ScriptedClassifier::verdict("ESCALATE", 95), platform);

    let report = engine.start_case(intake("post-2")).await.unwrap();

    assert_eq!(
        report.outcome,
        RunOutcome::Suspended {
            resume_at: NodeKind::ExecuteAction
        }
    );
    assert_eq!(report.status, CaseStatus::PendingHumanReview);
    assert_eq!(
        report.ran_nodes,
        vec![NodeKind::Analyze, NodeKind::HumanReview]
    );

    let latest = store.load_latest(&report.case_id).await.unwrap().unwrap();
    assert_eq!(latest.next_node, Some(NodeKind::ExecuteAction));
    assert_eq!(latest.case.escalation_count, 1);
    // Intake + analyze + human_review snapshots.
    assert_eq!(latest.seq, 2);
}

#[tokio::test]
async fn unparseable_verdict_falls_back_to_escalation() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, _) = engine_with(ScriptedClassifier::garbage(), platform);

    let report = engine.start_case(intake("post-3")).await.unwrap();

    // Fallback is conservative: escalate rather than auto-resolve.
    assert_eq!(report.status, CaseStatus::PendingHumanReview);
    let view = engine.snapshot(&report.case_id).await.unwrap();
    let verdict = view.case.analysis_result.unwrap();
    assert_eq!(verdict.confidence_score, 50);
    assert!(
        view.case
            .history
            .iter()
            .any(|h| h.event.contains("fallback"))
    );
}

#[tokio::test]
async fn resume_executes_decision_and_completes() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, store) = engine_with(
        ScriptedClassifier::verdict("ESCALATE", 90),
        platform.clone(),
    );

    let report = engine.start_case(intake("post-4")).await.unwrap();
    let resumed = engine
        .resume(&report.case_id, decision("remove_content_and_ban"))
        .await
        .unwrap();

    assert_eq!(resumed.outcome, RunOutcome::Completed);
    assert_eq!(resumed.status, CaseStatus::Completed);
    assert_eq!(resumed.ran_nodes, vec![NodeKind::ExecuteAction]);
    assert_eq!(
        platform.calls(),
        vec!["remove_content:post-4", "ban_user:post-4"]
    );

    let latest = store.load_latest(&report.case_id).await.unwrap().unwrap();
    assert_eq!(latest.case.executed_actions.len(), 2);
    assert!(latest.case.executed_actions.iter().all(|a| a.reversible));
    assert_eq!(latest.case.escalation_count, 1);
    assert!(latest.next_node.is_none());
}

#[tokio::test]
async fn request_changes_only_warns() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, _) = engine_with(
        ScriptedClassifier::verdict("ESCALATE", 70),
        platform.clone(),
    );

    let report = engine.start_case(intake("post-5")).await.unwrap();
    engine
        .resume(&report.case_id, decision("request_changes"))
        .await
        .unwrap();

    assert_eq!(platform.calls(), vec!["warn_user:post-5"]);
    let view = engine.snapshot(&report.case_id).await.unwrap();
    assert_eq!(view.case.executed_actions.len(), 1);
    // A warning has no compensating operation.
    assert!(!view.case.executed_actions[0].reversible);
}

#[tokio::test]
async fn unknown_decision_tag_completes_without_side_effects() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, _) = engine_with(
        ScriptedClassifier::verdict("ESCALATE", 70),
        platform.clone(),
    );

    let report = engine.start_case(intake("post-6")).await.unwrap();
    let resumed = engine.resume(&report.case_id, decision("ignore")).await.unwrap();

    assert_eq!(resumed.status, CaseStatus::Completed);
    assert!(platform.calls().is_empty());
    let view = engine.snapshot(&report.case_id).await.unwrap();
    assert!(view.case.executed_actions.is_empty());
}

#[tokio::test]
async fn resume_requires_suspended_case() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, _) = engine_with(ScriptedClassifier::verdict("IGNORE", 5), platform);

    // Auto-resolved case was never suspended.
    let report = engine.start_case(intake("post-7")).await.unwrap();
    let err = engine
        .resume(&report.case_id, decision("approve_removal"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Precondition { .. }));
}

#[tokio::test]
async fn double_resume_is_rejected() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, _) = engine_with(
        ScriptedClassifier::verdict("ESCALATE", 90),
        platform.clone(),
    );

    let report = engine.start_case(intake("post-8")).await.unwrap();
    engine
        .resume(&report.case_id, decision("approve_removal"))
        .await
        .unwrap();

    let err = engine
        .resume(&report.case_id, decision("approve_removal"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Precondition { .. }));
    // The first pass's single platform call is not repeated.
    assert_eq!(platform.calls(), vec!["remove_content:post-8"]);
}

#[tokio::test]
async fn unknown_case_is_reported() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, _) = engine_with(ScriptedClassifier::verdict("IGNORE", 5), platform);

    let err = engine.snapshot("no-such-case").await.unwrap_err();
    assert!(matches!(err, EngineError::CaseNotFound { .. }));
    let err = engine
        .resume("no-such-case", decision("approve_removal"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CaseNotFound { .. }));
}

#[tokio::test]
async fn history_records_every_step() {
    let platform = Arc::new(MockPlatform::new());
    let (engine, _) = engine_with(ScriptedClassifier::verdict("ESCALATE", 90), platform);

    let report = engine.start_case(intake("post-9")).await.unwrap();
    engine
        .resume(&report.case_id, decision("approve_removal"))
        .await
        .unwrap();

    let history = engine.history(&report.case_id).await.unwrap();
    // intake, analyze, human_review, execute_action
    assert_eq!(history.len(), 4);
    assert_eq!(
        history.iter().map(|c| c.seq).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    assert_eq!(history[0].case.status, CaseStatus::PendingAiAnalysis);
    assert_eq!(history[3].case.status, CaseStatus::Completed);
}

#[tokio::test]
async fn partial_platform_failure_is_recorded_not_fatal() {
    let platform = Arc::new(MockPlatform::failing(&["ban_user"]));
    let (engine, _) = engine_with(
        ScriptedClassifier::verdict("ESCALATE", 90),
        platform.clone(),
    );

    let report = engine.start_case(intake("post-10")).await.unwrap();
    let resumed = engine
        .resume(&report.case_id, decision("remove_content_and_ban"))
        .await
        .unwrap();

    // Both actions were attempted; the failure is data, not an error.
    assert_eq!(resumed.status, CaseStatus::Completed);
    assert_eq!(
        platform.calls(),
        vec!["remove_content:post-10", "ban_user:post-10"]
    );
    let view = engine.snapshot(&report.case_id).await.unwrap();
    let statuses: Vec<_> = view
        .case
        .executed_actions
        .iter()
        .map(|a| a.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            guardian::case::ActionStatus::Success,
            guardian::case::ActionStatus::Failed
        ]
    );
    assert!(
        view.case
            .history
            .iter()
            .any(|h| h.event.contains("1 failed"))
    );
}
