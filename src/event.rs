//! Progress events emitted by workflow nodes.
//!
//! Nodes report what they are doing through a flume channel owned by the
//! engine; a background listener forwards every event to `tracing`. Tests
//! can subscribe to the receiver side to assert on emitted progress without
//! scraping log output.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task;

/// A single progress event scoped to one case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub when: DateTime<Utc>,
    pub case_id: String,
    /// Which node (or engine phase) produced the event.
    pub scope: String,
    pub message: String,
}

impl Event {
    #[must_use]
    pub fn new(
        case_id: impl Into<String>,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            when: Utc::now(),
            case_id: case_id.into(),
            scope: scope.into(),
            message: message.into(),
        }
    }
}

/// Receives node events and forwards them to `tracing`.
///
/// One bus per engine. Producers get cloned senders via
/// [`sender`](Self::sender); [`subscribe`](Self::subscribe) hands out the
/// shared receiver for tests and dashboards.
pub struct EventBus {
    channel: (flume::Sender<Event>, flume::Receiver<Event>),
    listener: Arc<Mutex<Option<task::JoinHandle<()>>>>,
}

impl EventBus {
    #[must_use]
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            channel: flume::bounded(buffer_capacity),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Clone of the sender side so nodes can emit events.
    #[must_use]
    pub fn sender(&self) -> flume::Sender<Event> {
        self.channel.0.clone()
    }

    /// Clone of the receiver side for observers. Multiple subscribers share
    /// the queue (flume receivers are work-stealing, not broadcast), so in
    /// practice either the log listener or a test harness consumes it.
    #[must_use]
    pub fn subscribe(&self) -> flume::Receiver<Event> {
        self.channel.1.clone()
    }

    /// Spawn a background task that drains events into `tracing`.
    /// Idempotent: calling multiple times has no effect.
    pub fn listen(&self) {
        let mut guard = self.listener.lock();
        if guard.is_some() {
            return;
        }
        let receiver = self.channel.1.clone();
        *guard = Some(task::spawn(async move {
            while let Ok(event) = receiver.recv_async().await {
                tracing::info!(
                    case = %event.case_id,
                    scope = %event.scope,
                    "{}",
                    event.message
                );
            }
        }));
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}
