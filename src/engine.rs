//! The moderation engine: runs the workflow graph to its next suspension or
//! terminal point, persisting a checkpoint after every node.
//!
//! Each public operation is one *unit of work* — exactly what a dispatcher
//! worker executes for one queued task. A unit of work loads (or creates)
//! the case, injects any caller-supplied input, then drives nodes until the
//! edge table yields `Suspend` or `End`. Workers are stateless: everything a
//! resume needs is in the latest checkpoint.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::case::{Case, CaseStatus, HumanDecision, RollbackRequest};
use crate::checkpoint::{Checkpoint, CheckpointStore, CheckpointStoreError};
use crate::event::EventBus;
use crate::node::{NodeContext, NodeError, Transition};
use crate::types::NodeKind;
use crate::workflow::Workflow;

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("case {case_id} not found")]
    #[diagnostic(code(guardian::engine::case_not_found))]
    CaseNotFound { case_id: String },

    /// The operation is not valid for the case's current state.
    #[error("case {case_id} is {status}; {requirement}")]
    #[diagnostic(
        code(guardian::engine::precondition),
        help("Inspect the case snapshot to see where execution stands.")
    )]
    Precondition {
        case_id: String,
        status: CaseStatus,
        requirement: &'static str,
    },

    /// Routing produced a node the graph does not contain. A graph bug or a
    /// checkpoint written by an incompatible build.
    #[error("no node registered for {kind}")]
    #[diagnostic(code(guardian::engine::unknown_node))]
    UnknownNode { kind: NodeKind },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] CheckpointStoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Node(#[from] NodeError),
}

/// Intake payload for a new moderation case.
#[derive(Clone, Debug)]
pub struct CaseIntake {
    pub content_id: String,
    pub content_text: String,
}

/// A moderator's decision, injected on resume.
#[derive(Clone, Debug)]
pub struct DecisionSubmission {
    pub decision: HumanDecision,
    pub moderator_id: String,
    pub comment: Option<String>,
}

/// A rollback request against a completed case.
#[derive(Clone, Debug)]
pub struct RollbackSubmission {
    pub reason: String,
    pub requested_by: String,
}

/// How a unit of work ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Execution halted at a suspension point; a later resume continues at
    /// the recorded node.
    Suspended { resume_at: NodeKind },
    /// The graph reached a terminal transition.
    Completed,
}

/// Summary of one executed unit of work.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub case_id: String,
    /// Nodes executed in this unit of work, in order.
    pub ran_nodes: Vec<NodeKind>,
    pub outcome: RunOutcome,
    /// Case status as of the final checkpoint of this unit of work.
    pub status: CaseStatus,
}

/// Read-only view of where a case stands.
#[derive(Clone, Debug)]
pub struct CaseView {
    pub case: Case,
    pub next_node: Option<NodeKind>,
    pub seq: u64,
}

/// Drives the moderation workflow over a checkpoint store.
///
/// Cheap to clone per worker: the workflow and store are shared.
#[derive(Clone)]
pub struct Engine {
    workflow: Arc<Workflow>,
    store: Arc<dyn CheckpointStore>,
    event_bus: Arc<EventBus>,
}

impl Engine {
    #[must_use]
    pub fn new(
        workflow: Arc<Workflow>,
        store: Arc<dyn CheckpointStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            workflow,
            store,
            event_bus,
        }
    }

    /// Create a case and run it until it suspends or finishes.
    ///
    /// Benign content never suspends: the whole workflow completes inside
    /// this one call. Escalated content stops at the human-review
    /// suspension point with a checkpoint recording where to resume.
    #[instrument(skip(self, intake), fields(content_id = %intake.content_id), err)]
    pub async fn start_case(&self, intake: CaseIntake) -> Result<RunReport, EngineError> {
        let case_id = Uuid::new_v4().to_string();
        let case = Case::new(&case_id, intake.content_id, intake.content_text);

        let entry = self.workflow.entry();
        self.store
            .create(Checkpoint::new(case.clone(), 0, Some(entry)))
            .await?;
        tracing::info!(case_id = %case_id, "case created");

        self.run_from(case, 0, entry).await
    }

    /// Inject a moderator decision into a suspended case and continue it.
    #[instrument(skip(self, submission), err)]
    pub async fn resume(
        &self,
        case_id: &str,
        submission: DecisionSubmission,
    ) -> Result<RunReport, EngineError> {
        let latest = self.load(case_id).await?;

        if latest.case.status != CaseStatus::PendingHumanReview {
            return Err(EngineError::Precondition {
                case_id: case_id.to_string(),
                status: latest.case.status,
                requirement: "a decision can only be submitted while pending human review",
            });
        }
        let Some(resume_at) = latest.next_node else {
            return Err(EngineError::Precondition {
                case_id: case_id.to_string(),
                status: latest.case.status,
                requirement: "checkpoint has no resume pointer",
            });
        };

        let mut case = latest.case;
        case.human_decision = Some(submission.decision.clone());
        case.record_event(format!(
            "Human decision received from {}: {}.",
            submission.moderator_id, submission.decision
        ));
        if let Some(comment) = &submission.comment {
            case.record_event(format!("Moderator comment: {comment}"));
        }

        self.run_from(case, latest.seq, resume_at).await
    }

    /// Request a rollback of a completed case's actions and run the
    /// compensation pass, ending at the re-review suspension point.
    #[instrument(skip(self, submission), err)]
    pub async fn request_rollback(
        &self,
        case_id: &str,
        submission: RollbackSubmission,
    ) -> Result<RunReport, EngineError> {
        let latest = self.load(case_id).await?;

        if !latest.case.status.rollback_eligible() {
            return Err(EngineError::Precondition {
                case_id: case_id.to_string(),
                status: latest.case.status,
                requirement: "rollback requires a completed case",
            });
        }

        let mut case = latest.case;
        case.rollback_request = Some(RollbackRequest {
            reason: submission.reason.clone(),
            requested_by: submission.requested_by.clone(),
            requested_at: chrono::Utc::now(),
        });
        case.record_event(format!(
            "Rollback requested by {}: {}",
            submission.requested_by, submission.reason
        ));

        self.run_from(case, latest.seq, NodeKind::Rollback).await
    }

    /// Latest snapshot of a case.
    #[instrument(skip(self), err)]
    pub async fn snapshot(&self, case_id: &str) -> Result<CaseView, EngineError> {
        let latest = self.load(case_id).await?;
        Ok(CaseView {
            case: latest.case,
            next_node: latest.next_node,
            seq: latest.seq,
        })
    }

    /// Full checkpoint history of a case, ascending by sequence.
    #[instrument(skip(self), err)]
    pub async fn history(&self, case_id: &str) -> Result<Vec<Checkpoint>, EngineError> {
        let history = self.store.load_history(case_id).await?;
        if history.is_empty() {
            return Err(EngineError::CaseNotFound {
                case_id: case_id.to_string(),
            });
        }
        Ok(history)
    }

    /// Ids of every known case.
    pub async fn list_cases(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.store.list_cases().await?)
    }

    async fn load(&self, case_id: &str) -> Result<Checkpoint, EngineError> {
        self.store
            .load_latest(case_id)
            .await?
            .ok_or_else(|| EngineError::CaseNotFound {
                case_id: case_id.to_string(),
            })
    }

    /// The dispatch loop: run nodes from `start`, committing a checkpoint
    /// after each, until the edge table suspends or ends the pass.
    ///
    /// `seq` is the sequence of the checkpoint this pass starts from; each
    /// committed node writes `seq + 1`, so a concurrent duplicate dispatch
    /// of the same unit of work loses the first compare-and-set and stops.
    async fn run_from(
        &self,
        mut case: Case,
        mut seq: u64,
        start: NodeKind,
    ) -> Result<RunReport, EngineError> {
        let case_id = case.case_id.clone();
        let ctx = NodeContext {
            case_id: case_id.clone(),
            event_tx: self.event_bus.sender(),
        };

        let mut current = start;
        let mut ran_nodes = Vec::new();

        loop {
            let node = self
                .workflow
                .node(current)
                .ok_or(EngineError::UnknownNode { kind: current })?;

            tracing::debug!(case_id = %case_id, node = %current, seq, "running node");
            case = node.run(case, &ctx).await?;
            ran_nodes.push(current);
            seq += 1;

            let transition = self
                .workflow
                .edge(current)
                .ok_or(EngineError::UnknownNode { kind: current })?
                .resolve(&case);

            match transition {
                Transition::Next(next) => {
                    self.store
                        .put(Checkpoint::new(case.clone(), seq, Some(next)))
                        .await?;
                    current = next;
                }
                Transition::Suspend { resume_at } => {
                    self.store
                        .put(Checkpoint::new(case.clone(), seq, Some(resume_at)))
                        .await?;
                    tracing::info!(case_id = %case_id, resume_at = %resume_at, "suspended");
                    return Ok(RunReport {
                        case_id,
                        ran_nodes,
                        outcome: RunOutcome::Suspended { resume_at },
                        status: case.status,
                    });
                }
                Transition::End => {
                    // Auto-resolved path: analysis finished and routing went
                    // straight to the terminal without an execution pass.
                    if case.status == CaseStatus::AiAnalysisComplete {
                        case.status = CaseStatus::Completed;
                        case.record_event("Case auto-resolved without human review.");
                    }
                    self.store
                        .put(Checkpoint::new(case.clone(), seq, None))
                        .await?;
                    tracing::info!(case_id = %case_id, status = %case.status, "pass finished");
                    return Ok(RunReport {
                        case_id,
                        ran_nodes,
                        outcome: RunOutcome::Completed,
                        status: case.status,
                    });
                }
            }
        }
    }
}
