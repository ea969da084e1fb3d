//! Shared fixtures: scripted collaborators and an engine harness.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use guardian::checkpoint::InMemoryCheckpointStore;
use guardian::classifier::{Classifier, ClassifierError};
use guardian::engine::Engine;
use guardian::event::EventBus;
use guardian::platform::{ActionReceipt, PlatformApi, PlatformError};
use guardian::workflow::Workflow;

/// Classifier returning a canned raw response.
pub struct ScriptedClassifier {
    raw: String,
}

impl ScriptedClassifier {
    pub fn verdict(suggested_action: &str, confidence_score: u8) -> Self {
        Self {
            raw: format!(
                r#"{{"confidence_score": {confidence_score}, "suggested_action": "{suggested_action}"}}"#
            ),
        }
    }

    /// Output no verdict parser will accept.
    pub fn garbage() -> Self {
        Self {
            raw: "I'd rather not say.".to_string(),
        }
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn analyze(&self, _content_text: &str) -> Result<String, ClassifierError> {
        Ok(self.raw.clone())
    }
}

/// Records every platform call in order; ops listed in `failing` error out.
#[derive(Default)]
pub struct MockPlatform {
    calls: Mutex<Vec<String>>,
    failing: Mutex<Vec<&'static str>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(ops: &[&'static str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(ops.to_vec()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn invoke(&self, op: &'static str, content_id: &str) -> Result<ActionReceipt, PlatformError> {
        self.calls.lock().push(format!("{op}:{content_id}"));
        if self.failing.lock().contains(&op) {
            return Err(PlatformError::Action {
                action: op,
                content_id: content_id.to_string(),
                message: "simulated outage".to_string(),
            });
        }
        Ok(ActionReceipt::new(op, content_id))
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn remove_content(&self, content_id: &str) -> Result<ActionReceipt, PlatformError> {
        self.invoke("remove_content", content_id)
    }
    async fn restore_content(&self, content_id: &str) -> Result<ActionReceipt, PlatformError> {
        self.invoke("restore_content", content_id)
    }
    async fn ban_user(&self, content_id: &str) -> Result<ActionReceipt, PlatformError> {
        self.invoke("ban_user", content_id)
    }
    async fn unban_user(&self, content_id: &str) -> Result<ActionReceipt, PlatformError> {
        self.invoke("unban_user", content_id)
    }
    async fn warn_user(&self, content_id: &str) -> Result<ActionReceipt, PlatformError> {
        self.invoke("warn_user", content_id)
    }
}

/// Best-effort tracing init; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Engine over an in-memory store, returning the shared pieces tests poke at.
pub fn engine_with(
    classifier: ScriptedClassifier,
    platform: Arc<MockPlatform>,
) -> (Engine, Arc<InMemoryCheckpointStore>) {
    init_tracing();
    let workflow = Workflow::moderation(Arc::new(classifier), platform).expect("valid graph");
    let store = Arc::new(InMemoryCheckpointStore::new());
    let bus = Arc::new(EventBus::new(256));
    let engine = Engine::new(Arc::new(workflow), store.clone(), bus);
    (engine, store)
}
