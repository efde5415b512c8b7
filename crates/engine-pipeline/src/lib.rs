//! The transform, validate, and load stages of the per-batch pipeline
//! (§4.4-§4.6). Extraction (C3) and the raw database ops it and the Loader
//! sit on live in `connectors`; this crate owns the policy in between:
//! closed-catalog transform/validation dispatch and the retry/fallback
//! decision the Loader applies to a batch.

pub mod error;
pub mod load;
pub mod orchestrator;
pub mod report;
pub mod transform;
pub mod validate;

pub use error::{OrchestratorError, RowError};
pub use load::{LoadOutcome, Loader};
pub use orchestrator::Orchestrator;
pub use report::{RunReport, RunStatus, TableStats};
pub use transform::Transformer;
pub use validate::{Validator, ValidationWarning};
