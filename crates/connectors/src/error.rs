use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Errors raised by the MySQL extractor (C3) and Postgres loader (C6). The
/// `is_transient`/`is_constraint_violation` classifiers feed directly into
/// the §7 error taxonomy: `Transient` drives the Loader's backoff retry,
/// `Constraint` drives its per-row fallback.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("TLS configuration error: {0}")]
    Tls(#[from] native_tls::Error),

    /// `SourceIntegrity` (§7): the source table has two rows sharing the
    /// same `(timestampColumn, primaryKey)` pair. Fatal — the composite
    /// cursor can no longer order the stream deterministically.
    #[error(
        "source integrity violation on table '{table}': duplicate (timestamp, primary key) pair at ({ts}, {pk})"
    )]
    SourceIntegrity {
        table: String,
        ts: String,
        pk: String,
    },

    #[error("column '{0}' missing from result row")]
    MissingColumn(String),

    #[error("unsupported column type '{0}' while decoding row for table '{1}'")]
    UnsupportedType(String, String),
}

impl ConnectorError {
    /// `Transient` in §7: connectivity, deadlock, lock-timeout errors that
    /// the Loader's exponential-backoff retry should absorb.
    pub fn is_transient(&self) -> bool {
        match self {
            ConnectorError::MySql(err) => mysql_is_transient(err),
            ConnectorError::Postgres(err) => pg_is_transient(err),
            ConnectorError::Tls(_) => true,
            _ => false,
        }
    }

    /// `Constraint` in §7: a unique/fk/not-null violation that should
    /// degrade the batch to row-by-row loading rather than retry.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, ConnectorError::Postgres(err) if pg_is_constraint(err))
    }
}

fn mysql_is_transient(err: &mysql_async::Error) -> bool {
    match err {
        mysql_async::Error::Io(_) => true,
        mysql_async::Error::Driver(_) => true,
        mysql_async::Error::Server(server_err) => {
            // 1205 lock wait timeout, 1213 deadlock found, 1040 too many
            // connections, 2006/2013 server/connection gone.
            matches!(server_err.code, 1205 | 1213 | 1040 | 2006 | 2013)
        }
        _ => false,
    }
}

fn pg_is_transient(err: &tokio_postgres::Error) -> bool {
    if err.is_closed() {
        return true;
    }
    match err.code() {
        Some(code) => {
            *code == SqlState::T_R_SERIALIZATION_FAILURE
                || *code == SqlState::T_R_DEADLOCK_DETECTED
                || *code == SqlState::T_R_LOCK_NOT_AVAILABLE
                || *code == SqlState::CONNECTION_EXCEPTION
                || *code == SqlState::CONNECTION_DOES_NOT_EXIST
                || *code == SqlState::CONNECTION_FAILURE
                || *code == SqlState::ADMIN_SHUTDOWN
                || *code == SqlState::TOO_MANY_CONNECTIONS
        }
        None => err.is_closed(),
    }
}

fn pg_is_constraint(err: &tokio_postgres::Error) -> bool {
    match err.code() {
        Some(code) => {
            *code == SqlState::UNIQUE_VIOLATION
                || *code == SqlState::FOREIGN_KEY_VIOLATION
                || *code == SqlState::NOT_NULL_VIOLATION
                || *code == SqlState::CHECK_VIOLATION
                || *code == SqlState::EXCLUSION_VIOLATION
                || *code == SqlState::STRING_DATA_RIGHT_TRUNCATION
                || *code == SqlState::DATATYPE_MISMATCH
                || *code == SqlState::INVALID_TEXT_REPRESENTATION
        }
        None => false,
    }
}
