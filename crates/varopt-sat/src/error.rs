use std::time::Duration;

use thiserror::Error;

/// Why an enumeration run did not exhaust the model space.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumerationError {
    /// The clauses contradict each other before any branching decision
    #[error("Contradiction in clause {clause}")]
    Contradiction { clause: String },

    #[error("Enumeration timed out after {elapsed:?} ({models_found} models found)")]
    Timeout { elapsed: Duration, models_found: usize },

    #[error("Enumeration was cancelled")]
    Cancelled,
}
