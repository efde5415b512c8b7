use connectors::{ConnectorError, PgLoader};
use engine_config::TableMapping;
use engine_core::{RetryDisposition, RetryPolicy};
use model::records::row::RowData;

/// Outcome of loading one batch: how many rows landed, and which ones
/// didn't — paired with the reason, ready to be appended to the Failure
/// Store at the `Load` stage.
pub struct LoadOutcome {
    pub loaded: u64,
    pub failed: Vec<(RowData, String)>,
}

/// The Loader's retry/fallback policy (§4.6, §7): attempt the whole batch
/// in one transaction under exponential backoff for transient errors; on
/// anything else — a constraint violation or an exhausted retry budget —
/// roll back and replay the batch row by row so a single poison row can't
/// block its siblings.
pub struct Loader<'a> {
    db: &'a PgLoader,
    retry: RetryPolicy,
}

impl<'a> Loader<'a> {
    pub fn new(db: &'a PgLoader, retry: RetryPolicy) -> Self {
        Loader { db, retry }
    }

    pub async fn load_batch(&self, mapping: &TableMapping, rows: Vec<RowData>) -> LoadOutcome {
        if rows.is_empty() {
            return LoadOutcome {
                loaded: 0,
                failed: Vec::new(),
            };
        }

        let db = self.db;
        let result = self
            .retry
            .run(
                || {
                    let rows = rows.clone();
                    async move { db.upsert_batch_tx(mapping, &rows).await }
                },
                |err: &ConnectorError| {
                    if err.is_transient() {
                        RetryDisposition::Retry
                    } else {
                        RetryDisposition::Stop
                    }
                },
            )
            .await;

        match result {
            Ok(count) => LoadOutcome {
                loaded: count,
                failed: Vec::new(),
            },
            Err(_) => self.load_row_by_row(mapping, rows).await,
        }
    }

    async fn load_row_by_row(&self, mapping: &TableMapping, rows: Vec<RowData>) -> LoadOutcome {
        let mut loaded = 0;
        let mut failed = Vec::new();
        for row in rows {
            match self.db.upsert_single(mapping, &row).await {
                Ok(n) => loaded += n,
                Err(e) => failed.push((row, e.to_string())),
            }
        }
        LoadOutcome { loaded, failed }
    }
}
