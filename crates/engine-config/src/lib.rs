//! Declarative configuration surfaces loaded once at startup: table mappings,
//! schedule documents, and runtime settings. Everything here is validated
//! before a single connection or store is touched (§6, §7 `ConfigError`).

pub mod error;
pub mod loader;
pub mod mapping;
pub mod schedule;
pub mod settings;

pub use error::ConfigError;
pub use mapping::{
    ConfigValue, FieldMapping, FieldRef, RowValidator, Severity, TableMapping, Transform, ValidationRule,
};
pub use schedule::{Schedule, ScheduleDocument};
pub use settings::{RetrySettings, RuntimeSettings};
