use crate::error::FailureStoreError;
use crate::failure::model::{FailedRecord, FailureFilter, FailureStatistics, FailureStatus};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::io::Write;
use std::path::Path;

/// C2: the append-mostly store of rejected rows (§4.2). `append` must never
/// drop a record silently — a persistence failure here is surfaced as a
/// fatal condition for the current batch by the Orchestrator, never quietly
/// swallowed.
#[async_trait]
pub trait FailureStore: Send + Sync {
    async fn append(&self, record: FailedRecord) -> Result<u64, FailureStoreError>;

    async fn append_batch(&self, records: Vec<FailedRecord>) -> Result<Vec<u64>, FailureStoreError>;

    async fn list(
        &self,
        filter: &FailureFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FailedRecord>, FailureStoreError>;

    async fn count(&self, filter: &FailureFilter) -> Result<u64, FailureStoreError>;

    async fn mark_resolved(&self, id: u64) -> Result<(), FailureStoreError>;

    async fn mark_ignored(&self, id: u64) -> Result<(), FailureStoreError>;

    async fn increment_retry(&self, id: u64) -> Result<u32, FailureStoreError>;

    async fn statistics(&self) -> Result<FailureStatistics, FailureStoreError>;

    /// Supplemental operation (spec.md Open Question 3, resolved in
    /// DESIGN.md): deletes terminal (`resolved`/`ignored`) records older
    /// than `older_than_days`. Never invoked implicitly by the sync loop.
    async fn cleanup(&self, older_than_days: i64) -> Result<u64, FailureStoreError>;

    /// Supplemental operation backing the `failures --export` CLI command.
    async fn export(&self, writer: &mut dyn Write) -> Result<u64, FailureStoreError>;
}

pub struct SledFailureStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledFailureStore {
    pub fn open(db: &sled::Db) -> Result<Self, FailureStoreError> {
        let tree = db.open_tree("failures")?;
        Ok(Self {
            db: db.clone(),
            tree,
        })
    }

    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, FailureStoreError> {
        let db = sled::open(path)?;
        Self::open(&db)
    }

    fn key_for(id: u64) -> [u8; 8] {
        id.to_be_bytes()
    }

    fn read(&self, id: u64) -> Result<Option<FailedRecord>, FailureStoreError> {
        match self.tree.get(Self::key_for(id))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, record: &FailedRecord) -> Result<(), FailureStoreError> {
        let bytes = bincode::serialize(record)?;
        self.tree.insert(Self::key_for(record.id), bytes)?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<FailedRecord>, FailureStoreError> {
        let mut records = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            records.push(bincode::deserialize(&bytes)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl FailureStore for SledFailureStore {
    async fn append(&self, mut record: FailedRecord) -> Result<u64, FailureStoreError> {
        let id = self.db.generate_id()?;
        record.id = id;
        self.write(&record)?;
        self.tree.flush_async().await?;
        Ok(id)
    }

    async fn append_batch(&self, records: Vec<FailedRecord>) -> Result<Vec<u64>, FailureStoreError> {
        let mut ids = Vec::with_capacity(records.len());
        for mut record in records {
            let id = self.db.generate_id()?;
            record.id = id;
            self.write(&record)?;
            ids.push(id);
        }
        self.tree.flush_async().await?;
        Ok(ids)
    }

    async fn list(
        &self,
        filter: &FailureFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FailedRecord>, FailureStoreError> {
        let mut records: Vec<FailedRecord> = self
            .all()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &FailureFilter) -> Result<u64, FailureStoreError> {
        Ok(self.all()?.into_iter().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn mark_resolved(&self, id: u64) -> Result<(), FailureStoreError> {
        let mut record = self
            .read(id)?
            .ok_or(FailureStoreError::NotFound(id))?;
        record.status = FailureStatus::Resolved;
        record.updated_at = Utc::now();
        self.write(&record)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn mark_ignored(&self, id: u64) -> Result<(), FailureStoreError> {
        let mut record = self
            .read(id)?
            .ok_or(FailureStoreError::NotFound(id))?;
        record.status = FailureStatus::Ignored;
        record.updated_at = Utc::now();
        self.write(&record)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn increment_retry(&self, id: u64) -> Result<u32, FailureStoreError> {
        let mut record = self
            .read(id)?
            .ok_or(FailureStoreError::NotFound(id))?;
        record.retry_count += 1;
        record.status = FailureStatus::Retrying;
        record.updated_at = Utc::now();
        self.write(&record)?;
        self.tree.flush_async().await?;
        Ok(record.retry_count)
    }

    async fn statistics(&self) -> Result<FailureStatistics, FailureStoreError> {
        let mut stats = FailureStatistics::default();
        for record in self.all()? {
            stats.total += 1;
            *stats.by_status.entry(record.status.to_string()).or_insert(0) += 1;
            *stats.by_table.entry(record.table_name.clone()).or_insert(0) += 1;
            *stats.by_stage.entry(record.stage.to_string()).or_insert(0) += 1;
        }
        Ok(stats)
    }

    async fn cleanup(&self, older_than_days: i64) -> Result<u64, FailureStoreError> {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        let mut removed = 0u64;
        for record in self.all()? {
            let terminal = matches!(
                record.status,
                FailureStatus::Resolved | FailureStatus::Ignored
            );
            if terminal && record.updated_at < cutoff {
                self.tree.remove(Self::key_for(record.id))?;
                removed += 1;
            }
        }
        self.tree.flush_async().await?;
        Ok(removed)
    }

    async fn export(&self, writer: &mut dyn Write) -> Result<u64, FailureStoreError> {
        let mut records = self.all()?;
        records.sort_by_key(|r| r.id);
        let count = records.len() as u64;
        serde_json::to_writer_pretty(writer, &records)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::model::Stage;
    use model::records::row::RowData;

    fn sample(table: &str) -> FailedRecord {
        FailedRecord {
            id: 0,
            run_id: "run-1".into(),
            table_name: table.into(),
            source_record_id: "42".into(),
            stage: Stage::Validate,
            error_kind: "maxLength".into(),
            error_message: "value too long".into(),
            source_data: RowData::new(table, vec![]),
            transformed_data: None,
            retry_count: 0,
            status: FailureStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledFailureStore::open_at(dir.path()).unwrap();

        let id1 = store.append(sample("users")).await.unwrap();
        let id2 = store.append(sample("users")).await.unwrap();
        assert!(id2 > id1);
    }

    #[tokio::test]
    async fn list_filters_by_table_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledFailureStore::open_at(dir.path()).unwrap();

        store.append(sample("users")).await.unwrap();
        let id2 = store.append(sample("orders")).await.unwrap();
        store.mark_resolved(id2).await.unwrap();

        let filter = FailureFilter {
            table: Some("orders".into()),
            ..Default::default()
        };
        let results = store.list(&filter, 10, 0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, FailureStatus::Resolved);
    }

    #[tokio::test]
    async fn statistics_aggregate_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledFailureStore::open_at(dir.path()).unwrap();
        store.append(sample("users")).await.unwrap();
        store.append(sample("users")).await.unwrap();
        store.append(sample("orders")).await.unwrap();

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_table["users"], 2);
        assert_eq!(stats.by_table["orders"], 1);
        assert_eq!(stats.by_stage["validate"], 3);
    }

    #[tokio::test]
    async fn cleanup_removes_only_terminal_past_retention() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledFailureStore::open_at(dir.path()).unwrap();

        let id1 = store.append(sample("users")).await.unwrap();
        store.mark_resolved(id1).await.unwrap();
        let id2 = store.append(sample("users")).await.unwrap();
        // id2 stays pending — must not be cleaned up regardless of age.

        // Force updated_at far in the past for id1 to simulate retention elapsed.
        let mut record = store.read(id1).unwrap().unwrap();
        record.updated_at = Utc::now() - Duration::days(100);
        store.write(&record).unwrap();

        let removed = store.cleanup(30).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.read(id1).unwrap().is_none());
        assert!(store.read(id2).unwrap().is_some());
    }
}
