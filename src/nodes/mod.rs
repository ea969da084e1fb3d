//! The four executable nodes of the moderation graph.
//!
//! Each node is a small, focused [`Node`](crate::node::Node) implementation;
//! routing between them lives in the workflow's edge table, not here.

mod analyze;
mod execute_action;
mod human_review;
mod rollback;

pub use analyze::AnalyzeNode;
pub use execute_action::ExecuteActionNode;
pub use human_review::HumanReviewNode;
pub use rollback::RollbackNode;
