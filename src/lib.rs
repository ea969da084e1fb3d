//! # Guardian: Durable Human-in-the-Loop Moderation Workflows
//!
//! Guardian runs content-moderation cases through a durable, suspendable
//! state machine: an external classifier proposes an action, risky cases
//! suspend until a human moderator decides, the decision is executed against
//! the platform, and executed actions can later be undone through a
//! compensating-action rollback.
//!
//! ## Core Concepts
//!
//! - **Case**: one content item under review; the unit of persisted state
//! - **Nodes**: async units of work that mutate a case snapshot
//! - **Workflow**: the closed moderation graph with conditional routing
//! - **Checkpoints**: full case snapshots, one per node, sequence-checked
//! - **Engine**: drives the graph one unit of work at a time
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use guardian::case::HumanDecision;
//! use guardian::checkpoint::InMemoryCheckpointStore;
//! use guardian::engine::{CaseIntake, DecisionSubmission, Engine, RunOutcome};
//! use guardian::event::EventBus;
//! use guardian::workflow::Workflow;
//!
//! # async fn example(
//! #     classifier: Arc<dyn guardian::classifier::Classifier>,
//! #     platform: Arc<dyn guardian::platform::PlatformApi>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = Arc::new(Workflow::moderation(classifier, platform)?);
//! let store = Arc::new(InMemoryCheckpointStore::new());
//! let bus = Arc::new(EventBus::new(1024));
//! bus.listen();
//! let engine = Engine::new(workflow, store, bus);
//!
//! // Intake: runs until the case suspends (or auto-resolves).
//! let report = engine
//!     .start_case(CaseIntake {
//!         content_id: "post-123".into(),
//!         content_text: "…".into(),
//!     })
//!     .await?;
//!
//! // Later, possibly from another process: inject the moderator decision.
//! if matches!(report.outcome, RunOutcome::Suspended { .. }) {
//!     engine
//!         .resume(
//!             &report.case_id,
//!             DecisionSubmission {
//!                 decision: HumanDecision::ApproveRemoval,
//!                 moderator_id: "mod-7".into(),
//!                 comment: None,
//!             },
//!         )
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Durability Model
//!
//! Every node execution commits a full case snapshot with a dense sequence
//! number and a resume pointer. Writes are compare-and-set on the sequence,
//! so at-least-once task delivery is safe: a duplicate dispatch re-runs from
//! the latest checkpoint and its first stale commit attempt stops it.

pub mod case;
pub mod checkpoint;
#[cfg(feature = "sqlite")]
pub mod checkpoint_sqlite;
pub mod classifier;
pub mod compensation;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod event;
pub mod node;
pub mod nodes;
pub mod platform;
pub mod types;
pub mod workflow;
