use crate::{core::identifiers::BatchId, pagination::cursor::Cursor, records::row::RowData};

/// A page of source rows pulled by the Extractor. `next` is the composite
/// cursor of the last row in `rows` — the resume token a consumer hands
/// back on the following call to `changesSince`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: BatchId,
    pub table: String,
    pub rows: Vec<RowData>,
    pub next: Cursor,
    pub manifest: Manifest,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct Manifest {
    pub row_count: usize,
    pub checksum_xxh3: u64,
}

pub fn manifest_for(rows: &[RowData]) -> Manifest {
    use xxhash_rust::xxh3::xxh3_64_with_seed;
    let mut h: u64 = 0;
    for row in rows {
        let bytes = serde_json::to_vec(row).unwrap_or_default();
        h = xxh3_64_with_seed(&bytes, h);
    }
    Manifest {
        row_count: rows.len(),
        checksum_xxh3: h,
    }
}

impl Batch {
    pub fn new(id: impl Into<BatchId>, table: &str, rows: Vec<RowData>, next: Cursor) -> Self {
        let manifest = manifest_for(&rows);
        Batch {
            id: id.into(),
            table: table.to_string(),
            rows,
            next,
            manifest,
            fetched_at: chrono::Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.row_count == 0
    }

    pub fn len(&self) -> usize {
        self.manifest.row_count
    }
}
