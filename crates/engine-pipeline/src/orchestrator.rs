use crate::load::{LoadOutcome, Loader};
use crate::report::TableStats;
use crate::transform::Transformer;
use crate::validate::Validator;
use chrono::Utc;
use connectors::MySqlExtractor;
use engine_config::TableMapping;
use engine_core::failure::{FailedRecord, FailureStatus, Stage};
use engine_core::{CheckpointStore, FailureStore};
use model::pagination::cursor::Cursor;
use model::records::row::RowData;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The Pipeline Orchestrator (C7, §4.7): drives one table's
/// extract→transform→validate→load loop to completion or failure,
/// advancing the Checkpoint Store by the last *extracted* row of each
/// batch — never the last *loaded* row, so a poison row can never stall
/// the table's progress (§9's central design decision).
pub struct Orchestrator<'a> {
    checkpoints: &'a dyn CheckpointStore,
    failures: &'a dyn FailureStore,
    extractor: &'a MySqlExtractor,
    loader: Loader<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        checkpoints: &'a dyn CheckpointStore,
        failures: &'a dyn FailureStore,
        extractor: &'a MySqlExtractor,
        loader: Loader<'a>,
    ) -> Self {
        Orchestrator {
            checkpoints,
            failures,
            extractor,
            loader,
        }
    }

    /// Runs the per-table procedure of §4.7. Never returns an `Err` — a
    /// table-level failure is captured in the returned `TableStats.error`
    /// so that one table's failure never cancels another (§4.7's per-run
    /// procedure, §7's propagation rule: "a table-level error never
    /// escapes the Orchestrator").
    pub async fn sync_table(
        &self,
        mapping: &TableMapping,
        run_id: &str,
        full_sync: bool,
        cancel: &CancellationToken,
    ) -> TableStats {
        let table = mapping.source_table.clone();
        let started = std::time::Instant::now();
        let mut stats = TableStats::new(&table);

        let mut cursor = match self.starting_cursor(mapping, full_sync).await {
            Ok(c) => c,
            Err(e) => {
                stats.error = Some(e.to_string());
                stats.duration_ms = started.elapsed().as_millis() as u64;
                return stats;
            }
        };

        if let Err(e) = self.checkpoints.start_run(&table, run_id).await {
            error!(table = %table, error = %e, "failed to start run");
            stats.error = Some(e.to_string());
            stats.duration_ms = started.elapsed().as_millis() as u64;
            return stats;
        }

        loop {
            if cancel.is_cancelled() {
                info!(table = %table, "cancellation observed between batches");
                if let Err(e) = self.checkpoints.fail_run(&table, "cancelled").await {
                    error!(table = %table, error = %e, "failed to record cancellation");
                }
                stats.error = Some("cancelled".to_string());
                break;
            }

            let batch = match self.extractor.fetch_batch(mapping, &cursor).await {
                Ok(b) => b,
                Err(e) => {
                    error!(table = %table, error = %e, "extraction failed");
                    let _ = self.checkpoints.fail_run(&table, &e.to_string()).await;
                    stats.error = Some(e.to_string());
                    break;
                }
            };

            if batch.is_empty() {
                if let Err(e) = self.checkpoints.complete_run(&table, cursor.clone()).await {
                    error!(table = %table, error = %e, "failed to complete run");
                    stats.error = Some(e.to_string());
                }
                break;
            }

            stats.extracted += batch.len() as u64;

            let (transformed, transform_failed) =
                Transformer::transform_batch(mapping, batch.rows.clone());
            stats.transformed += transformed.len() as u64;
            if !transform_failed.is_empty() {
                stats.failed += transform_failed.len() as u64;
                if let Err(e) = self
                    .record_row_failures(&table, run_id, Stage::Transform, transform_failed)
                    .await
                {
                    error!(table = %table, error = %e, "failure store append failed");
                    let _ = self.checkpoints.fail_run(&table, &e.to_string()).await;
                    stats.error = Some(e.to_string());
                    break;
                }
            }

            let (validated, validate_failed) = Validator::validate_batch(mapping, transformed);
            stats.validated += validated.len() as u64;
            if !validate_failed.is_empty() {
                stats.failed += validate_failed.len() as u64;
                if let Err(e) = self
                    .record_row_failures(&table, run_id, Stage::Validate, validate_failed)
                    .await
                {
                    error!(table = %table, error = %e, "failure store append failed");
                    let _ = self.checkpoints.fail_run(&table, &e.to_string()).await;
                    stats.error = Some(e.to_string());
                    break;
                }
            }

            for (_, warnings) in &validated {
                for w in warnings {
                    warn!(table = %table, field = %w.field, rule = %w.rule, reason = %w.reason, "row validation warning");
                }
            }

            let rows: Vec<RowData> = validated.into_iter().map(|(row, _)| row).collect();
            let LoadOutcome { loaded, failed } = self.loader.load_batch(mapping, rows).await;
            stats.loaded += loaded;
            if !failed.is_empty() {
                stats.failed += failed.len() as u64;
                let failed_records = failed
                    .into_iter()
                    .map(|(row, message)| {
                        new_failed_record(&table, run_id, Stage::Load, "load", &message, row, true)
                    })
                    .collect();
                if let Err(e) = self.failures.append_batch(failed_records).await {
                    error!(table = %table, error = %e, "failure store append failed");
                    let _ = self.checkpoints.fail_run(&table, &e.to_string()).await;
                    stats.error = Some(e.to_string());
                    break;
                }
            }

            // Advance by the last *extracted* row of the batch, not the last
            // loaded one — see module docs.
            if let Err(e) = self
                .checkpoints
                .advance(&table, batch.next.clone(), loaded)
                .await
            {
                error!(table = %table, error = %e, "checkpoint advance failed");
                let _ = self.checkpoints.fail_run(&table, &e.to_string()).await;
                stats.error = Some(e.to_string());
                break;
            }

            cursor = batch.next;
        }

        stats.duration_ms = started.elapsed().as_millis() as u64;
        stats
    }

    /// §4.7 step 1: full syncs ignore the checkpoint; a `running` checkpoint
    /// resumes from its own cursor (crash recovery); otherwise resume from
    /// the last `completed` cursor.
    async fn starting_cursor(
        &self,
        mapping: &TableMapping,
        full_sync: bool,
    ) -> Result<Cursor, engine_core::CheckpointError> {
        if full_sync {
            return Ok(Cursor::None);
        }
        Ok(self
            .checkpoints
            .get(&mapping.source_table)
            .await?
            .map(|cp| cp.cursor)
            .unwrap_or(Cursor::None))
    }

    async fn record_row_failures(
        &self,
        table: &str,
        run_id: &str,
        stage: Stage,
        failed: Vec<(RowData, crate::error::RowError)>,
    ) -> Result<(), engine_core::FailureStoreError> {
        let keeps_transformed = stage != Stage::Transform;
        let records = failed
            .into_iter()
            .map(|(row, err)| {
                new_failed_record(
                    table,
                    run_id,
                    stage,
                    err.kind(),
                    &err.to_string(),
                    row,
                    keeps_transformed,
                )
            })
            .collect();
        self.failures.append_batch(records).await?;
        Ok(())
    }
}

fn new_failed_record(
    table: &str,
    run_id: &str,
    stage: Stage,
    error_kind: &str,
    error_message: &str,
    row: RowData,
    keeps_transformed: bool,
) -> FailedRecord {
    let source_record_id = row
        .field_values
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case("id"))
        .and_then(|f| f.value.as_ref())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    FailedRecord {
        id: 0,
        run_id: run_id.to_string(),
        table_name: table.to_string(),
        source_record_id,
        stage,
        error_kind: error_kind.to_string(),
        error_message: error_message.to_string(),
        transformed_data: keeps_transformed.then(|| row.clone()),
        source_data: row,
        retry_count: 0,
        status: FailureStatus::Pending,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
