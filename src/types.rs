//! Core identifier types for the moderation workflow graph.
//!
//! [`NodeKind`] names the nodes of the moderation state machine. Unlike a
//! general workflow framework there is no open-ended custom variant: the
//! moderation graph is closed, so an unreachable node is a compile-time
//! error rather than a runtime lookup failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within the moderation workflow graph.
///
/// `NodeKind` doubles as the persisted "next node" pointer in a checkpoint:
/// [`encode`](Self::encode) produces the stored string form and
/// [`decode`](Self::decode) restores it.
///
/// # Examples
///
/// ```rust
/// use guardian::types::NodeKind;
///
/// let node = NodeKind::ExecuteAction;
/// let encoded = node.encode();
/// assert_eq!(encoded, "execute_action");
/// assert_eq!(NodeKind::decode(encoded), Some(NodeKind::ExecuteAction));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Invokes the classifier and records the verdict.
    Analyze,
    /// Pure suspension node: marks the case as awaiting a moderator.
    HumanReview,
    /// Maps the injected human decision to platform actions.
    ExecuteAction,
    /// Reverses executed actions and re-escalates.
    Rollback,
    /// Virtual terminal node. Never registered or executed; it exists only
    /// as a routing target, matching the convention for graph endpoints.
    End,
}

impl NodeKind {
    /// Encode a NodeKind into its persisted string form.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            NodeKind::Analyze => "analyze",
            NodeKind::HumanReview => "human_review",
            NodeKind::ExecuteAction => "execute_action",
            NodeKind::Rollback => "rollback",
            NodeKind::End => "end",
        }
    }

    /// Decode a persisted string form back into a NodeKind.
    ///
    /// Returns `None` for unrecognized input; the graph is closed, so an
    /// unknown pointer in storage is corruption, not forward compatibility.
    #[must_use]
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "analyze" => Some(NodeKind::Analyze),
            "human_review" => Some(NodeKind::HumanReview),
            "execute_action" => Some(NodeKind::ExecuteAction),
            "rollback" => Some(NodeKind::Rollback),
            "end" => Some(NodeKind::End),
            _ => None,
        }
    }

    /// Returns `true` if this is the virtual [`End`](Self::End) node.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// All executable nodes, in graph order. `End` is excluded: it is a
    /// routing target, not a node implementation.
    #[must_use]
    pub fn executable() -> [NodeKind; 4] {
        [
            NodeKind::Analyze,
            NodeKind::HumanReview,
            NodeKind::ExecuteAction,
            NodeKind::Rollback,
        ]
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}
