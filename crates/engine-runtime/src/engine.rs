use chrono::Utc;
use connectors::{MySqlExtractor, PgLoader};
use engine_config::{RuntimeSettings, TableMapping};
use engine_core::checkpoint::SledCheckpointStore;
use engine_core::failure::SledFailureStore;
use engine_core::RetryPolicy;
use engine_pipeline::{Loader, Orchestrator, RunReport};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::RuntimeError;

/// Owns the live connections and embedded stores for one process lifetime
/// and drives a `RunReport`-producing sync across a set of tables. Multiple
/// tables are synced concurrently, bounded by `RuntimeSettings.maxWorkers`
/// (§4.7's cross-table concurrency, replacing the original's
/// `ThreadPoolExecutor` with a bounded pool of interleaved async tasks).
pub struct Engine {
    checkpoints: SledCheckpointStore,
    failures: SledFailureStore,
    extractor: MySqlExtractor,
    loader_db: PgLoader,
    settings: RuntimeSettings,
    retry: RetryPolicy,
}

impl Engine {
    pub async fn connect(
        mysql_url: &str,
        postgres_url: &str,
        settings: RuntimeSettings,
    ) -> Result<Self, RuntimeError> {
        std::fs::create_dir_all(&settings.state_path).map_err(sled::Error::from)?;
        let db = sled::open(&settings.state_path)?;
        let checkpoints = SledCheckpointStore::open(&db)?;
        let failures = SledFailureStore::open(&db)?;
        let extractor = MySqlExtractor::connect(mysql_url)?;
        let loader_db = PgLoader::connect(postgres_url).await?;
        let retry = RetryPolicy::from_settings(&settings.retry);

        Ok(Engine {
            checkpoints,
            failures,
            extractor,
            loader_db,
            settings,
            retry,
        })
    }

    pub fn checkpoints(&self) -> &SledCheckpointStore {
        &self.checkpoints
    }

    pub fn failures(&self) -> &SledFailureStore {
        &self.failures
    }

    /// Runs one invocation of the Orchestrator (§4.7) across `mappings`,
    /// concurrency-bounded by `maxWorkers`. Each table's loop is fully
    /// independent — one table's fatal error never stops another's.
    pub async fn sync(
        &self,
        mappings: &[TableMapping],
        run_id: &str,
        full_sync: bool,
        cancel: &CancellationToken,
    ) -> RunReport {
        let started_at = Utc::now();
        let semaphore = Semaphore::new(self.settings.max_workers.max(1));
        let orchestrator = Orchestrator::new(
            &self.checkpoints,
            &self.failures,
            &self.extractor,
            Loader::new(&self.loader_db, self.retry.clone()),
        );

        let mut pending = FuturesUnordered::new();
        for mapping in mappings {
            pending.push(async {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("semaphore is never closed");
                info!(table = %mapping.source_table, "starting table sync");
                orchestrator
                    .sync_table(mapping, run_id, full_sync, cancel)
                    .await
            });
        }

        let mut tables = Vec::with_capacity(mappings.len());
        while let Some(stats) = pending.next().await {
            tables.push(stats);
        }
        tables.sort_by(|a, b| a.table.cmp(&b.table));

        RunReport {
            run_id: run_id.to_string(),
            started_at,
            completed_at: Utc::now(),
            tables,
        }
    }
}
