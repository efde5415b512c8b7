//! Driver-facing halves of the sync engine: a MySQL extractor reading the
//! source in composite-cursor order (C3) and a Postgres loader writing the
//! target under the batch/fallback transaction discipline (C6). Transform
//! and validation policy, and the retry/fallback decision itself, live in
//! the pipeline crate — this crate only knows how to talk to the two
//! databases.

pub mod error;
pub mod mysql;
pub mod postgres;
mod value_row;

pub use error::ConnectorError;
pub use mysql::MySqlExtractor;
pub use postgres::PgLoader;
