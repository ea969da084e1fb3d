//! Task dispatcher contract.
//!
//! The engine never blocks a caller-facing thread on workflow execution:
//! intake, resume, and rollback requests are enqueued as tasks and executed
//! by background workers, each worker running exactly one engine operation
//! per task. This module defines the contract those workers and queues must
//! honor; concrete broker adapters live with the deployment, not here.
//!
//! Delivery is at-least-once: a worker that crashes after committing a
//! checkpoint but before acknowledging its task will see the task again.
//! That is safe by construction — the re-run loads the latest checkpoint,
//! and its first commit attempt loses the sequence compare-and-set if the
//! step already landed. Implementations must preserve per-case ordering
//! (two tasks for the same case never execute concurrently) and should
//! retry failed tasks with backoff.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What kind of unit of work a task asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Run [`Engine::start_case`](crate::engine::Engine::start_case).
    Start,
    /// Run [`Engine::resume`](crate::engine::Engine::resume).
    Resume,
    /// Run [`Engine::request_rollback`](crate::engine::Engine::request_rollback).
    Rollback,
}

/// One queued unit of work.
///
/// `payload` carries the operation's input (intake fields, the decision
/// submission, or the rollback submission) in whatever JSON shape the
/// enqueueing surface produced; the worker deserializes it against the
/// engine's input types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    /// Empty for [`TaskKind::Start`]; the case does not exist yet.
    pub case_id: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    #[error("failed to enqueue {kind:?} task: {message}")]
    #[diagnostic(
        code(guardian::dispatch::enqueue),
        help("Check broker connectivity; the case state is unchanged.")
    )]
    Enqueue { kind: TaskKind, message: String },
}

/// Hands units of work to background workers.
///
/// Enqueueing must not execute the task inline on the caller's control
/// flow; even an in-process implementation spawns the work.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn enqueue(&self, task: Task) -> Result<(), DispatchError>;
}
