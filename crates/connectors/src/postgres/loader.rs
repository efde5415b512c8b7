use crate::error::ConnectorError;
use crate::postgres::params::{PgParam, PgParamStore};
use crate::postgres::utils::connect_client;
use crate::value_row::pg_column_value;
use engine_config::TableMapping;
use model::core::data_type::DataType;
use model::core::value::Value;
use model::records::row::RowData;
use std::collections::HashSet;
use tokio::sync::Mutex;
use tokio_postgres::Client;

/// The Loader's raw database half (§4.6): single-transaction batch upsert,
/// per-row fallback for poison-row isolation, and the soft-delete
/// reconciliation primitives. Retry/fallback *policy* — when to call
/// `upsert_single` instead of `upsert_batch_tx` — lives in the pipeline
/// crate, which owns the shared `RetryPolicy`.
pub struct PgLoader {
    client: Mutex<Client>,
}

impl PgLoader {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Ok(PgLoader {
            client: Mutex::new(client),
        })
    }

    /// Upserts the whole batch inside one transaction. On any row's error
    /// the transaction is left uncommitted and dropped, rolling back
    /// cleanly — the caller decides whether to retry or fall back to
    /// `upsert_single` per row.
    pub async fn upsert_batch_tx(
        &self,
        mapping: &TableMapping,
        rows: &[RowData],
    ) -> Result<u64, ConnectorError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let mut affected = 0u64;
        for row in rows {
            affected += upsert_row(&tx, mapping, row).await?;
        }
        tx.commit().await?;
        Ok(affected)
    }

    /// Upserts a single row in its own transaction — the per-row fallback
    /// path a caught `Constraint` error degrades a failing batch to.
    pub async fn upsert_single(&self, mapping: &TableMapping, row: &RowData) -> Result<u64, ConnectorError> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let affected = upsert_row(&tx, mapping, row).await?;
        tx.commit().await?;
        Ok(affected)
    }

    /// Deletes target rows by primary key, row by row inside one
    /// transaction — used by the soft-delete reconciliation pass when a
    /// table mapping has no `soft_delete_column`.
    pub async fn delete(&self, mapping: &TableMapping, ids: &[Value]) -> Result<u64, ConnectorError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            mapping.target_table, mapping.primary_key
        );
        let mut affected = 0u64;
        for id in ids {
            let param = PgParam::from_value(id);
            affected += tx.execute(&sql, &[param.as_ref()]).await?;
        }
        tx.commit().await?;
        Ok(affected)
    }

    /// Marks rows soft-deleted (sets `soft_delete_column = true`) rather
    /// than removing them, when the mapping declares one.
    pub async fn soft_delete(
        &self,
        mapping: &TableMapping,
        column: &str,
        ids: &[Value],
    ) -> Result<u64, ConnectorError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let client = self.client.lock().await;
        let sql = format!(
            "UPDATE {} SET {} = true WHERE {} = $1",
            mapping.target_table, column, mapping.primary_key
        );
        let mut affected = 0u64;
        for id in ids {
            let param = PgParam::from_value(id);
            affected += client.execute(&sql, &[param.as_ref()]).await?;
        }
        Ok(affected)
    }

    /// Every primary key currently present in the target table, typed per
    /// the mapping's declared type for that column.
    pub async fn existing_ids(&self, mapping: &TableMapping) -> Result<HashSet<Value>, ConnectorError> {
        let client = self.client.lock().await;
        let sql = format!("SELECT {} FROM {}", mapping.primary_key, mapping.target_table);
        let rows = client.query(&sql, &[]).await?;
        let pk_type = mapping
            .field_mappings
            .iter()
            .find(|fm| fm.target.names().contains(&mapping.primary_key.as_str()))
            .map(|fm| fm.data_type.clone())
            .unwrap_or(DataType::String);
        Ok(rows
            .iter()
            .filter_map(|row| pg_column_value(row, 0, &pk_type))
            .collect())
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, ConnectorError> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "SELECT 1 FROM information_schema.tables WHERE table_name = $1",
                &[&table],
            )
            .await?;
        Ok(row.is_some())
    }
}

async fn upsert_row(
    tx: &tokio_postgres::Transaction<'_>,
    mapping: &TableMapping,
    row: &RowData,
) -> Result<u64, ConnectorError> {
    let columns: Vec<&str> = row.field_values.iter().map(|f| f.name.as_str()).collect();
    let values: Vec<Value> = row
        .field_values
        .iter()
        .map(|f| f.value.clone().unwrap_or(Value::Null))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    let update_columns: Vec<&str> = columns
        .iter()
        .filter(|c| **c != mapping.primary_key)
        .copied()
        .collect();

    let conflict_action = if update_columns.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let set_clause = update_columns
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("DO UPDATE SET {set_clause}")
    };

    let sql = format!(
        "INSERT INTO {table} ({cols}) VALUES ({placeholders}) ON CONFLICT ({pk}) {conflict_action}",
        table = mapping.target_table,
        cols = columns.join(", "),
        placeholders = placeholders.join(", "),
        pk = mapping.primary_key,
    );

    let param_store = PgParamStore::from_values(&values);
    let refs = param_store.as_refs();
    Ok(tx.execute(&sql, &refs).await?)
}
