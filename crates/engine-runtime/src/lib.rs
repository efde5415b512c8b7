//! Process-level wiring for the sync engine: live connections and embedded
//! stores (`Engine`), the cron-driven single-writer run loop (`Scheduler`),
//! and the PID-file lock backing it (§4.7, §4.8).

pub mod engine;
pub mod error;
pub mod lock;
pub mod scheduler;

pub use engine::Engine;
pub use error::RuntimeError;
pub use lock::{FileLock, LockError};
pub use scheduler::{RunOutcome, Scheduler};
