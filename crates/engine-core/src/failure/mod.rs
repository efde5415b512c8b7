pub mod model;
pub mod store;

pub use model::{FailedRecord, FailureFilter, FailureStatistics, FailureStatus, Stage};
pub use store::{FailureStore, SledFailureStore};
