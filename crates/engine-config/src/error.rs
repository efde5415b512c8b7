use thiserror::Error;

/// `ConfigError` (§7): raised at startup, before any store or connection is
/// touched. Never raised at row time — unknown transforms/rules are always a
/// configuration error, caught here.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("table mapping '{table}' is missing required field '{field}'")]
    MissingField { table: String, field: String },

    #[error("table mapping '{table}' declares unknown transform '{transform}'")]
    UnknownTransform { table: String, transform: String },

    #[error("table mapping '{table}' declares unknown validation rule '{rule}'")]
    UnknownRule { table: String, rule: String },

    #[error("table mapping '{table}' has invalid batchSize {batch_size}: must be positive")]
    InvalidBatchSize { table: String, batch_size: i64 },

    #[error(
        "transform '{transform}' on table '{table}' field '{field}' expects {expected}, got {got}"
    )]
    ArityMismatch {
        table: String,
        field: String,
        transform: String,
        expected: String,
        got: String,
    },

    #[error("schedule '{id}' references unknown table '{table}'")]
    UnknownScheduleTable { id: String, table: String },

    #[error("schedule '{id}' has invalid cron expression '{expr}': {reason}")]
    InvalidCron {
        id: String,
        expr: String,
        reason: String,
    },

    #[error("duplicate table mapping for source table '{0}'")]
    DuplicateTable(String),

    #[error("duplicate schedule id '{0}'")]
    DuplicateSchedule(String),
}
