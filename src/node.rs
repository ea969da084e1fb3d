//! Node execution primitives for the moderation state machine.
//!
//! A [`Node`] is one unit of the workflow: it reads the current [`Case`],
//! applies its mutation, and hands the updated case back to the engine. The
//! engine persists a checkpoint after every node and then consults the edge
//! table for the next [`Transition`].
//!
//! Nodes are stateless between dispatches; everything they need is in the
//! case snapshot and their injected collaborators.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::case::Case;
use crate::classifier::ClassifierError;
use crate::event::Event;
use crate::types::NodeKind;

/// Where execution goes after a node (or conditional edge) resolves.
///
/// This is the explicit, enumerated routing result the engine's dispatch
/// loop consumes — there are no string tags to mistype.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Continue synchronously to the given node within this dispatch.
    Next(NodeKind),
    /// Halt the dispatch here; a later resume continues at `resume_at`.
    Suspend { resume_at: NodeKind },
    /// The workflow (this pass of it) is finished.
    End,
}

impl Transition {
    /// The node this transition hands control to, if any. Used by the graph
    /// builder to validate statically-known edges.
    pub(crate) fn targets(&self) -> Option<NodeKind> {
        match self {
            Self::Next(kind) | Self::Suspend { resume_at: kind } => Some(*kind),
            Self::End => None,
        }
    }
}

/// Execution context handed to each node.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// The case being executed; mirrors `case.case_id` for event metadata.
    pub case_id: String,
    /// Channel for progress events.
    pub event_tx: flume::Sender<Event>,
}

impl NodeContext {
    /// Emit a node-scoped progress event. Never blocks and never fails the
    /// node: a full or disconnected bus drops the event.
    pub fn emit(&self, scope: impl Into<String>, message: impl Into<String>) {
        let event = Event::new(self.case_id.clone(), scope, message);
        if self.event_tx.try_send(event).is_err() {
            tracing::debug!(case = %self.case_id, "event bus full or closed, dropping event");
        }
    }
}

/// One executable node of the moderation graph.
///
/// Implementations take the case by value, mutate it, and return it; the
/// engine owns persistence and routing. A `NodeError` is fatal for the
/// current unit of work and surfaces to the dispatcher's retry policy — the
/// re-run starts from the last committed checkpoint, not from scratch.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, case: Case, ctx: &NodeContext) -> Result<Case, NodeError>;
}

/// Fatal node-execution errors.
///
/// Degraded-but-recoverable situations (an unparseable classifier verdict)
/// are handled inside the node and never reach this type.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    #[error(transparent)]
    #[diagnostic(code(guardian::node::classifier))]
    Classifier(#[from] ClassifierError),

    /// JSON serialization error while capturing an action receipt.
    #[error(transparent)]
    #[diagnostic(code(guardian::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// A node was entered without the state it needs (e.g. ExecuteAction
    /// with no recorded decision). Indicates a sequencing bug or corrupted
    /// checkpoint, not a retryable condition.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(guardian::node::missing_input),
        help("Check that the previous node committed the required field.")
    )]
    MissingInput { what: &'static str },
}
