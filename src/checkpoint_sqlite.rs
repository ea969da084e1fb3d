//! SQLite-backed [`CheckpointStore`].
//!
//! Schema:
//!
//! - `cases.id` ← `checkpoint.case_id`
//! - `checkpoints.case_id`, `checkpoints.seq` ← primary key, so the
//!   compare-and-set lives in the database: an append races through a
//!   transaction that re-reads the latest sequence and inserts, and the
//!   unique key rejects the loser even if two writers pass the read.
//! - `checkpoints.case_json` ← serialized [`Case`] snapshot
//! - `checkpoints.next_node` ← encoded resume pointer (`NULL` when terminal)
//!
//! When the `sqlite-migrations` feature is enabled (default), embedded
//! migrations run on connect; disabling it assumes external migration
//! orchestration.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::instrument;

use crate::case::Case;
use crate::checkpoint::{Checkpoint, CheckpointStore, CheckpointStoreError};
use crate::types::NodeKind;

/// Durable checkpoint store over a shared SQLite pool.
pub struct SqliteCheckpointStore {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteCheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCheckpointStore").finish()
    }
}

fn backend(context: &str, err: impl std::fmt::Display) -> CheckpointStoreError {
    CheckpointStoreError::Backend {
        message: format!("{context}: {err}"),
    }
}

impl SqliteCheckpointStore {
    /// Connect (or create) a SQLite database at `database_url`.
    /// Example URL: `sqlite://guardian.db`.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, CheckpointStoreError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| backend("connect", e))?;
        #[cfg(feature = "sqlite-migrations")]
        {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                return Err(backend("migration", e));
            }
        }
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn row_to_checkpoint(row: &SqliteRow) -> Result<Checkpoint, CheckpointStoreError> {
        let case_id: String = row.get("case_id");
        let seq: i64 = row.get("seq");
        let case_json: String = row.get("case_json");
        let next_node: Option<String> = row.get("next_node");
        let created_at_str: String = row.get("created_at");

        let case: Case = serde_json::from_str(&case_json)?;
        let next_node = match next_node.as_deref() {
            None => None,
            Some(encoded) => match NodeKind::decode(encoded) {
                Some(kind) => Some(kind),
                // An unknown node name in storage is corruption, not
                // forward compatibility.
                None => {
                    return Err(CheckpointStoreError::Backend {
                        message: format!("unknown next_node '{encoded}' for case {case_id}"),
                    });
                }
            },
        };
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Checkpoint {
            case_id,
            seq: seq as u64,
            case,
            next_node,
            created_at,
        })
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    #[instrument(skip(self, checkpoint), fields(case_id = %checkpoint.case_id), err)]
    async fn create(&self, checkpoint: Checkpoint) -> Result<(), CheckpointStoreError> {
        let case_json = serde_json::to_string(&checkpoint.case)?;

        let mut tx = self.pool.begin().await.map_err(|e| backend("tx begin", e))?;

        let inserted = sqlx::query("INSERT OR IGNORE INTO cases (id) VALUES (?1)")
            .bind(&checkpoint.case_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| backend("insert case", e))?;
        if inserted.rows_affected() == 0 {
            return Err(CheckpointStoreError::CaseExists {
                case_id: checkpoint.case_id,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO checkpoints (case_id, seq, case_json, next_node, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&checkpoint.case_id)
        .bind(checkpoint.seq as i64)
        .bind(&case_json)
        .bind(checkpoint.next_node.map(|k| k.encode()))
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| backend("insert checkpoint", e))?;

        tx.commit().await.map_err(|e| backend("tx commit", e))?;
        Ok(())
    }

    #[instrument(skip(self, checkpoint), fields(case_id = %checkpoint.case_id, seq = checkpoint.seq), err)]
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointStoreError> {
        let case_json = serde_json::to_string(&checkpoint.case)?;

        let mut tx = self.pool.begin().await.map_err(|e| backend("tx begin", e))?;

        let latest: Option<i64> =
            sqlx::query_scalar("SELECT MAX(seq) FROM checkpoints WHERE case_id = ?1")
                .bind(&checkpoint.case_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| backend("latest seq", e))?;

        let Some(latest) = latest else {
            return Err(CheckpointStoreError::NotFound {
                case_id: checkpoint.case_id,
            });
        };
        if checkpoint.seq != (latest as u64) + 1 {
            return Err(CheckpointStoreError::StaleWrite {
                case_id: checkpoint.case_id,
                attempted: checkpoint.seq,
                latest: latest as u64,
            });
        }

        // The (case_id, seq) primary key backstops the read above if a
        // concurrent writer committed between our read and this insert.
        let result = sqlx::query(
            r#"
            INSERT INTO checkpoints (case_id, seq, case_json, next_node, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&checkpoint.case_id)
        .bind(checkpoint.seq as i64)
        .bind(&case_json)
        .bind(checkpoint.next_node.map(|k| k.encode()))
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(CheckpointStoreError::StaleWrite {
                    case_id: checkpoint.case_id,
                    attempted: checkpoint.seq,
                    latest: checkpoint.seq,
                });
            }
            Err(e) => return Err(backend("insert checkpoint", e)),
        }

        tx.commit().await.map_err(|e| backend("tx commit", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn load_latest(&self, case_id: &str) -> Result<Option<Checkpoint>, CheckpointStoreError> {
        let row: Option<SqliteRow> = sqlx::query(
            r#"
            SELECT case_id, seq, case_json, next_node, created_at
            FROM checkpoints
            WHERE case_id = ?1
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(case_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| backend("select latest", e))?;

        row.map(|r| Self::row_to_checkpoint(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn load_history(&self, case_id: &str) -> Result<Vec<Checkpoint>, CheckpointStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT case_id, seq, case_json, next_node, created_at
            FROM checkpoints
            WHERE case_id = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(case_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| backend("select history", e))?;

        rows.iter().map(Self::row_to_checkpoint).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_cases(&self) -> Result<Vec<String>, CheckpointStoreError> {
        let rows = sqlx::query("SELECT id FROM cases ORDER BY id ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| backend("list cases", e))?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("id")).collect())
    }
}
