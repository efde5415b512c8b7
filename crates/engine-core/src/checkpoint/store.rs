use crate::checkpoint::model::{Checkpoint, CheckpointStatus};
use crate::error::CheckpointError;
use async_trait::async_trait;
use chrono::Utc;
use model::pagination::cursor::Cursor;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;

/// C1: the durable per-table cursor store (§4.1). Every mutating call is
/// flushed before returning; the monotonicity guard and the running-conflict
/// check are both enforced inside a single `sled` transaction so a
/// concurrent `startRun`/`advance` race can never observe a half-applied
/// update.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, table: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    async fn start_run(&self, table: &str, run_id: &str) -> Result<Checkpoint, CheckpointError>;

    async fn advance(
        &self,
        table: &str,
        cursor: Cursor,
        loaded_count: u64,
    ) -> Result<(), CheckpointError>;

    async fn complete_run(&self, table: &str, final_cursor: Cursor) -> Result<(), CheckpointError>;

    async fn fail_run(&self, table: &str, error_message: &str) -> Result<(), CheckpointError>;

    async fn reset(&self, table: &str) -> Result<(), CheckpointError>;

    async fn list_running(&self) -> Result<Vec<Checkpoint>, CheckpointError>;
}

pub struct SledCheckpointStore {
    tree: sled::Tree,
}

impl SledCheckpointStore {
    pub fn open(db: &sled::Db) -> Result<Self, CheckpointError> {
        let tree = db.open_tree("checkpoints")?;
        Ok(Self { tree })
    }

    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let db = sled::open(path)?;
        Self::open(&db)
    }

    fn read(&self, table: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        match self.tree.get(table)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CheckpointStore for SledCheckpointStore {
    async fn get(&self, table: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        self.read(table)
    }

    async fn start_run(&self, table: &str, run_id: &str) -> Result<Checkpoint, CheckpointError> {
        let table_owned = table.to_string();
        let run_id_owned = run_id.to_string();

        let result = self
            .tree
            .transaction::<_, Checkpoint, CheckpointError>(move |tx| {
                let existing = match tx.get(table_owned.as_bytes())? {
                    Some(bytes) => Some(
                        bincode::deserialize::<Checkpoint>(&bytes)
                            .map_err(|e| ConflictableTransactionError::Abort(e.into()))?,
                    ),
                    None => None,
                };

                if let Some(existing) = &existing
                    && existing.status == CheckpointStatus::Running
                    && existing.run_id.as_deref() != Some(run_id_owned.as_str())
                {
                    return Err(ConflictableTransactionError::Abort(
                        CheckpointError::Conflict {
                            table: table_owned.clone(),
                            running_run_id: existing.run_id.clone().unwrap_or_default(),
                        },
                    ));
                }

                let mut checkpoint = existing.unwrap_or_else(|| Checkpoint::idle(&table_owned));
                checkpoint.status = CheckpointStatus::Running;
                checkpoint.run_id = Some(run_id_owned.clone());
                checkpoint.last_run_at = Some(Utc::now());
                checkpoint.last_error = None;

                let bytes = bincode::serialize(&checkpoint)
                    .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
                tx.insert(table_owned.as_bytes(), bytes)?;

                Ok(checkpoint)
            });

        match result {
            Ok(checkpoint) => {
                self.tree.flush_async().await?;
                Ok(checkpoint)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(CheckpointError::Storage(e)),
        }
    }

    async fn advance(
        &self,
        table: &str,
        cursor: Cursor,
        loaded_count: u64,
    ) -> Result<(), CheckpointError> {
        let table_owned = table.to_string();

        let result = self
            .tree
            .transaction::<_, (), CheckpointError>(move |tx| {
                let existing = match tx.get(table_owned.as_bytes())? {
                    Some(bytes) => bincode::deserialize::<Checkpoint>(&bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(e.into()))?,
                    None => {
                        return Err(ConflictableTransactionError::Abort(
                            CheckpointError::NotFound(table_owned.clone()),
                        ));
                    }
                };

                if !existing.cursor.precedes(&cursor) {
                    return Err(ConflictableTransactionError::Abort(
                        CheckpointError::Monotonicity {
                            table: table_owned.clone(),
                        },
                    ));
                }

                let mut updated = existing;
                updated.cursor = cursor.clone();
                updated.records_synced += loaded_count;

                let bytes = bincode::serialize(&updated)
                    .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
                tx.insert(table_owned.as_bytes(), bytes)?;

                Ok(())
            });

        match result {
            Ok(()) => {
                self.tree.flush_async().await?;
                Ok(())
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(CheckpointError::Storage(e)),
        }
    }

    async fn complete_run(&self, table: &str, final_cursor: Cursor) -> Result<(), CheckpointError> {
        let mut checkpoint = self
            .read(table)?
            .ok_or_else(|| CheckpointError::NotFound(table.to_string()))?;
        checkpoint.status = CheckpointStatus::Completed;
        checkpoint.cursor = final_cursor;
        checkpoint.last_offset = 0;
        checkpoint.last_run_at = Some(Utc::now());
        checkpoint.last_error = None;

        let bytes = bincode::serialize(&checkpoint)?;
        self.tree.insert(table, bytes)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn fail_run(&self, table: &str, error_message: &str) -> Result<(), CheckpointError> {
        let mut checkpoint = self
            .read(table)?
            .unwrap_or_else(|| Checkpoint::idle(table));
        checkpoint.status = CheckpointStatus::Failed;
        checkpoint.last_error = Some(error_message.to_string());
        checkpoint.last_run_at = Some(Utc::now());

        let bytes = bincode::serialize(&checkpoint)?;
        self.tree.insert(table, bytes)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn reset(&self, table: &str) -> Result<(), CheckpointError> {
        self.tree.remove(table)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn list_running(&self) -> Result<Vec<Checkpoint>, CheckpointError> {
        let mut running = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            let checkpoint: Checkpoint = bincode::deserialize(&bytes)?;
            if checkpoint.status == CheckpointStatus::Running {
                running.push(checkpoint);
            }
        }
        Ok(running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;

    fn ts(hm: &str) -> chrono::DateTime<Utc> {
        format!("2026-01-01T{hm}:00Z").parse().unwrap()
    }

    #[tokio::test]
    async fn start_run_then_advance_updates_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledCheckpointStore::open_at(dir.path()).unwrap();

        store.start_run("users", "run-1").await.unwrap();
        store
            .advance(
                "users",
                Cursor::ts_pk(ts("10:00"), Value::Int(2)),
                2,
            )
            .await
            .unwrap();

        let cp = store.get("users").await.unwrap().unwrap();
        assert_eq!(cp.records_synced, 2);
        assert_eq!(cp.cursor, Cursor::ts_pk(ts("10:00"), Value::Int(2)));
    }

    #[tokio::test]
    async fn advance_rejects_non_increasing_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledCheckpointStore::open_at(dir.path()).unwrap();

        store.start_run("users", "run-1").await.unwrap();
        store
            .advance("users", Cursor::ts_pk(ts("10:01"), Value::Int(5)), 1)
            .await
            .unwrap();

        let err = store
            .advance("users", Cursor::ts_pk(ts("10:01"), Value::Int(5)), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Monotonicity { .. }));

        let err = store
            .advance("users", Cursor::ts_pk(ts("10:00"), Value::Int(99)), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Monotonicity { .. }));
    }

    #[tokio::test]
    async fn start_run_conflicts_with_other_running_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledCheckpointStore::open_at(dir.path()).unwrap();

        store.start_run("users", "run-1").await.unwrap();
        let err = store.start_run("users", "run-2").await.unwrap_err();
        assert!(matches!(err, CheckpointError::Conflict { .. }));
    }

    #[tokio::test]
    async fn complete_then_fail_preserve_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledCheckpointStore::open_at(dir.path()).unwrap();

        store.start_run("users", "run-1").await.unwrap();
        let cursor = Cursor::ts_pk(ts("10:00"), Value::Int(3));
        store.advance("users", cursor.clone(), 3).await.unwrap();
        store.complete_run("users", cursor.clone()).await.unwrap();

        let cp = store.get("users").await.unwrap().unwrap();
        assert_eq!(cp.status, CheckpointStatus::Completed);
        assert_eq!(cp.cursor, cursor);

        store.start_run("users", "run-2").await.unwrap();
        store.fail_run("users", "target unreachable").await.unwrap();
        let cp = store.get("users").await.unwrap().unwrap();
        assert_eq!(cp.status, CheckpointStatus::Failed);
        assert_eq!(cp.cursor, cursor, "cursor preserved as resume point");
        assert_eq!(cp.last_error.as_deref(), Some("target unreachable"));
    }

    #[tokio::test]
    async fn reset_deletes_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledCheckpointStore::open_at(dir.path()).unwrap();
        store.start_run("users", "run-1").await.unwrap();
        store.reset("users").await.unwrap();
        assert!(store.get("users").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_running_only_returns_running_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledCheckpointStore::open_at(dir.path()).unwrap();
        store.start_run("users", "run-1").await.unwrap();
        store.start_run("orders", "run-1").await.unwrap();
        store
            .complete_run("orders", Cursor::None)
            .await
            .unwrap();

        let running = store.list_running().await.unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].table_name, "users");
    }
}
