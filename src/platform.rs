//! Platform Action API collaborator contract.
//!
//! The moderated platform exposes five operations: remove/restore content,
//! ban/unban the offending user, and warn the user. Each either succeeds
//! with a receipt or raises a reportable error; there is no partial-success
//! shape. None of these calls is idempotent — the engine records every
//! invocation in the case's action log and never replays one blindly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Receipt returned by every platform operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReceipt {
    /// Platform-reported outcome tag, e.g. `"removed"`, `"banned"`.
    pub status: String,
    pub content_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ActionReceipt {
    #[must_use]
    pub fn new(status: impl Into<String>, content_id: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            content_id: content_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Failure invoking a platform operation.
#[derive(Debug, Error, Diagnostic)]
pub enum PlatformError {
    #[error("platform action {action} failed for content {content_id}: {message}")]
    #[diagnostic(
        code(guardian::platform::action),
        help("The platform API rejected or failed the call; see the action record.")
    )]
    Action {
        action: &'static str,
        content_id: String,
        message: String,
    },
}

/// The moderated platform's action surface.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn remove_content(&self, content_id: &str) -> Result<ActionReceipt, PlatformError>;
    async fn restore_content(&self, content_id: &str) -> Result<ActionReceipt, PlatformError>;
    async fn ban_user(&self, content_id: &str) -> Result<ActionReceipt, PlatformError>;
    async fn unban_user(&self, content_id: &str) -> Result<ActionReceipt, PlatformError>;
    async fn warn_user(&self, content_id: &str) -> Result<ActionReceipt, PlatformError>;
}
