//! Workflow graph: node registry plus the edge table that routes between
//! them.
//!
//! The graph is static data. Nodes mutate the case; edges inspect the
//! mutated case and yield a [`Transition`]. The engine is the only consumer:
//! it looks up the edge for the node it just ran and acts on the transition.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::case::{Case, SuggestedAction};
use crate::classifier::Classifier;
use crate::node::{Node, Transition};
use crate::nodes::{AnalyzeNode, ExecuteActionNode, HumanReviewNode, RollbackNode};
use crate::platform::PlatformApi;
use crate::types::NodeKind;

/// Routing rule attached to a node.
#[derive(Clone)]
pub enum Edge {
    /// Always take the same transition.
    Static(Transition),
    /// Inspect the case the node just produced and pick a transition.
    Conditional(Arc<dyn Fn(&Case) -> Transition + Send + Sync>),
}

impl Edge {
    pub(crate) fn resolve(&self, case: &Case) -> Transition {
        match self {
            Edge::Static(transition) => *transition,
            Edge::Conditional(predicate) => predicate(case),
        }
    }
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Static(t) => f.debug_tuple("Static").field(t).finish(),
            Edge::Conditional(_) => f.write_str("Conditional(..)"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowBuildError {
    #[error("node {kind} has no outgoing edge")]
    #[diagnostic(
        code(guardian::workflow::missing_edge),
        help("every registered node needs an edge, even if it is Static(End)")
    )]
    MissingEdge { kind: NodeKind },

    #[error("edge from {from} targets unregistered node {to}")]
    #[diagnostic(code(guardian::workflow::unknown_target))]
    UnknownTarget { from: NodeKind, to: NodeKind },

    #[error("entry node {kind} is not registered")]
    #[diagnostic(code(guardian::workflow::unknown_entry))]
    UnknownEntry { kind: NodeKind },
}

/// Builder mirroring how the graph is assembled: register nodes, attach one
/// edge per node, then validate.
#[derive(Default)]
pub struct WorkflowBuilder {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Edge>,
    entry: Option<NodeKind>,
}

impl WorkflowBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_node(mut self, kind: NodeKind, node: Arc<dyn Node>) -> Self {
        self.nodes.insert(kind, node);
        self
    }

    #[must_use]
    pub fn add_edge(mut self, from: NodeKind, transition: Transition) -> Self {
        self.edges.insert(from, Edge::Static(transition));
        self
    }

    #[must_use]
    pub fn add_conditional_edge<F>(mut self, from: NodeKind, predicate: F) -> Self
    where
        F: Fn(&Case) -> Transition + Send + Sync + 'static,
    {
        self.edges.insert(from, Edge::Conditional(Arc::new(predicate)));
        self
    }

    #[must_use]
    pub fn set_entry(mut self, kind: NodeKind) -> Self {
        self.entry = Some(kind);
        self
    }

    /// Validates the graph shape. Conditional edges are opaque, so only the
    /// statically known targets can be checked here; runtime dispatch still
    /// rejects transitions to unregistered nodes.
    pub fn build(self) -> Result<Workflow, WorkflowBuildError> {
        let entry = self.entry.unwrap_or(NodeKind::Analyze);
        if !self.nodes.contains_key(&entry) {
            return Err(WorkflowBuildError::UnknownEntry { kind: entry });
        }
        for kind in self.nodes.keys() {
            if !self.edges.contains_key(kind) {
                return Err(WorkflowBuildError::MissingEdge { kind: *kind });
            }
        }
        for (from, edge) in &self.edges {
            if let Edge::Static(transition) = edge {
                for to in transition.targets() {
                    if !self.nodes.contains_key(&to) {
                        return Err(WorkflowBuildError::UnknownTarget { from: *from, to });
                    }
                }
            }
        }
        Ok(Workflow {
            nodes: self.nodes,
            edges: self.edges,
            entry,
        })
    }
}

/// Immutable, validated graph shared by the engine.
pub struct Workflow {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Edge>,
    entry: NodeKind,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("entry", &self.entry)
            .finish()
    }
}

impl Workflow {
    #[must_use]
    pub fn entry(&self) -> NodeKind {
        self.entry
    }

    #[must_use]
    pub fn node(&self, kind: NodeKind) -> Option<Arc<dyn Node>> {
        self.nodes.get(&kind).cloned()
    }

    #[must_use]
    pub fn edge(&self, kind: NodeKind) -> Option<&Edge> {
        self.edges.get(&kind)
    }

    /// The standard moderation graph:
    ///
    /// ```text
    /// analyze --(escalate?)--> human_review --suspend--> execute_action
    ///    \--(otherwise)--> end                              |
    ///                                  (rollback requested?)|
    /// human_review <-- rollback <---------------------------/
    ///                                  (otherwise) --> end
    /// ```
    pub fn moderation(
        classifier: Arc<dyn Classifier>,
        platform: Arc<dyn PlatformApi>,
    ) -> Result<Self, WorkflowBuildError> {
        WorkflowBuilder::new()
            .add_node(NodeKind::Analyze, Arc::new(AnalyzeNode::new(classifier)))
            .add_node(NodeKind::HumanReview, Arc::new(HumanReviewNode))
            .add_node(
                NodeKind::ExecuteAction,
                Arc::new(ExecuteActionNode::new(platform.clone())),
            )
            .add_node(NodeKind::Rollback, Arc::new(RollbackNode::new(platform)))
            .set_entry(NodeKind::Analyze)
            .add_conditional_edge(NodeKind::Analyze, |case| {
                let escalate = case
                    .analysis_result
                    .as_ref()
                    .is_some_and(|r| r.suggested_action == SuggestedAction::Escalate);
                if escalate {
                    Transition::Next(NodeKind::HumanReview)
                } else {
                    Transition::End
                }
            })
            .add_edge(
                NodeKind::HumanReview,
                Transition::Suspend {
                    resume_at: NodeKind::ExecuteAction,
                },
            )
            .add_conditional_edge(NodeKind::ExecuteAction, |case| {
                if case.rollback_request.is_some() {
                    Transition::Next(NodeKind::Rollback)
                } else {
                    Transition::End
                }
            })
            .add_edge(NodeKind::Rollback, Transition::Next(NodeKind::HumanReview))
            .build()
    }
}
