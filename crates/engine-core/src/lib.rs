pub mod checkpoint;
pub mod error;
pub mod failure;
pub mod retry;

pub use checkpoint::{Checkpoint, CheckpointStatus, CheckpointStore, SledCheckpointStore};
pub use error::{CheckpointError, FailureStoreError};
pub use failure::{FailedRecord, FailureFilter, FailureStatistics, FailureStatus, FailureStore, SledFailureStore, Stage};
pub use retry::{RetryDisposition, RetryError, RetryPolicy};
