//! Checkpoint persistence: full case snapshots, one per node execution.
//!
//! Every committed node produces a [`Checkpoint`] carrying the complete
//! [`Case`] plus the resume pointer. Sequence numbers are dense per case and
//! writes are compare-and-set on the expected next sequence, so two workers
//! dispatched for the same case cannot both commit the same step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::case::Case;
use crate::types::NodeKind;

/// One durable snapshot of a case after a node committed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub case_id: String,
    /// Dense per-case sequence, starting at 0 for the intake snapshot.
    pub seq: u64,
    pub case: Case,
    /// Where execution continues on the next dispatch. `None` after a
    /// terminal transition; resuming such a case re-evaluates the last
    /// node's edge instead.
    pub next_node: Option<NodeKind>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(case: Case, seq: u64, next_node: Option<NodeKind>) -> Self {
        Self {
            case_id: case.case_id.clone(),
            seq,
            case,
            next_node,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointStoreError {
    #[error("case {case_id} already exists")]
    #[diagnostic(code(guardian::checkpoint::case_exists))]
    CaseExists { case_id: String },

    #[error("case {case_id} not found")]
    #[diagnostic(code(guardian::checkpoint::not_found))]
    NotFound { case_id: String },

    /// The CAS write lost: another writer committed `latest` while this one
    /// tried to commit `attempted`.
    #[error("stale write for case {case_id}: attempted seq {attempted}, latest is {latest}")]
    #[diagnostic(
        code(guardian::checkpoint::stale_write),
        help("Reload the latest checkpoint and retry from it.")
    )]
    StaleWrite {
        case_id: String,
        attempted: u64,
        latest: u64,
    },

    #[error("checkpoint serialization failed")]
    #[diagnostic(code(guardian::checkpoint::serde))]
    Serde(#[from] serde_json::Error),

    #[error("checkpoint backend error: {message}")]
    #[diagnostic(code(guardian::checkpoint::backend))]
    Backend { message: String },
}

/// Durable store of per-case checkpoint sequences.
///
/// Implementations must make `put` atomic with respect to the latest
/// sequence check, and `load_history` must return checkpoints in ascending
/// `seq` order.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist the intake snapshot (seq 0) for a brand-new case. Fails with
    /// [`CheckpointStoreError::CaseExists`] on a duplicate case id.
    async fn create(&self, checkpoint: Checkpoint) -> Result<(), CheckpointStoreError>;

    /// Append a checkpoint. Succeeds only when `checkpoint.seq` is exactly
    /// one past the latest stored sequence for the case.
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointStoreError>;

    /// Latest checkpoint for the case, or `None` for an unknown case.
    async fn load_latest(&self, case_id: &str) -> Result<Option<Checkpoint>, CheckpointStoreError>;

    /// Full checkpoint history for the case, ascending by `seq`.
    async fn load_history(&self, case_id: &str) -> Result<Vec<Checkpoint>, CheckpointStoreError>;

    /// Ids of every known case.
    async fn list_cases(&self) -> Result<Vec<String>, CheckpointStoreError>;
}

/// In-memory store for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    inner: Mutex<FxHashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn create(&self, checkpoint: Checkpoint) -> Result<(), CheckpointStoreError> {
        let mut inner = self.inner.lock();
        if inner.contains_key(&checkpoint.case_id) {
            return Err(CheckpointStoreError::CaseExists {
                case_id: checkpoint.case_id,
            });
        }
        inner.insert(checkpoint.case_id.clone(), vec![checkpoint]);
        Ok(())
    }

    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointStoreError> {
        let mut inner = self.inner.lock();
        let Some(history) = inner.get_mut(&checkpoint.case_id) else {
            return Err(CheckpointStoreError::NotFound {
                case_id: checkpoint.case_id,
            });
        };
        // create() never stores an empty history.
        let latest = history.last().map_or(0, |c| c.seq);
        if checkpoint.seq != latest + 1 {
            return Err(CheckpointStoreError::StaleWrite {
                case_id: checkpoint.case_id,
                attempted: checkpoint.seq,
                latest,
            });
        }
        history.push(checkpoint);
        Ok(())
    }

    async fn load_latest(&self, case_id: &str) -> Result<Option<Checkpoint>, CheckpointStoreError> {
        Ok(self
            .inner
            .lock()
            .get(case_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn load_history(&self, case_id: &str) -> Result<Vec<Checkpoint>, CheckpointStoreError> {
        Ok(self.inner.lock().get(case_id).cloned().unwrap_or_default())
    }

    async fn list_cases(&self) -> Result<Vec<String>, CheckpointStoreError> {
        let mut ids: Vec<String> = self.inner.lock().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(case_id: &str, seq: u64) -> Checkpoint {
        Checkpoint::new(Case::new(case_id, "post-1", "text"), seq, Some(NodeKind::Analyze))
    }

    #[tokio::test]
    async fn create_then_put_appends_in_sequence() {
        let store = InMemoryCheckpointStore::new();
        store.create(snapshot("case-1", 0)).await.unwrap();
        store.put(snapshot("case-1", 1)).await.unwrap();
        store.put(snapshot("case-1", 2)).await.unwrap();

        let latest = store.load_latest("case-1").await.unwrap().unwrap();
        assert_eq!(latest.seq, 2);
        let history = store.load_history("case-1").await.unwrap();
        assert_eq!(
            history.iter().map(|c| c.seq).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = InMemoryCheckpointStore::new();
        store.create(snapshot("case-1", 0)).await.unwrap();
        let err = store.create(snapshot("case-1", 0)).await.unwrap_err();
        assert!(matches!(err, CheckpointStoreError::CaseExists { .. }));
    }

    #[tokio::test]
    async fn stale_seq_is_rejected() {
        let store = InMemoryCheckpointStore::new();
        store.create(snapshot("case-1", 0)).await.unwrap();
        store.put(snapshot("case-1", 1)).await.unwrap();

        let err = store.put(snapshot("case-1", 1)).await.unwrap_err();
        assert!(matches!(
            err,
            CheckpointStoreError::StaleWrite {
                attempted: 1,
                latest: 1,
                ..
            }
        ));

        let err = store.put(snapshot("case-1", 5)).await.unwrap_err();
        assert!(matches!(err, CheckpointStoreError::StaleWrite { .. }));
    }

    #[tokio::test]
    async fn put_on_unknown_case_is_not_found() {
        let store = InMemoryCheckpointStore::new();
        let err = store.put(snapshot("ghost", 1)).await.unwrap_err();
        assert!(matches!(err, CheckpointStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_cases_is_sorted() {
        let store = InMemoryCheckpointStore::new();
        store.create(snapshot("case-b", 0)).await.unwrap();
        store.create(snapshot("case-a", 0)).await.unwrap();
        assert_eq!(
            store.list_cases().await.unwrap(),
            vec!["case-a".to_string(), "case-b".to_string()]
        );
    }
}
