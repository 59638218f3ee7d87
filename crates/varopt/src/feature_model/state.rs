use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use varopt_sat::EnumerationError;

use super::valid_models::ValidModels;
use crate::error::VaroptError;

/// Lifecycle of a feature model's valid-model enumeration
#[derive(Debug, Clone)]
pub enum EnumerationState {
    /// Constructed, `start_enumeration` not yet called
    NotStarted,
    /// A worker owns the search
    Enumerating,
    /// Enumeration exhausted the model space; the snapshot is frozen
    Ready(Arc<ValidModels>),
    /// Enumeration stopped early, `restart` may relaunch it
    Failed(FailureReason),
}

impl EnumerationState {
    pub fn is_ready(&self) -> bool {
        matches!(self, EnumerationState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, EnumerationState::Failed(_))
    }

    pub fn is_running(&self) -> bool {
        matches!(self, EnumerationState::Enumerating)
    }

    pub fn as_str(&self) -> &str {
        match self {
            EnumerationState::NotStarted => "not-started",
            EnumerationState::Enumerating => "enumerating",
            EnumerationState::Ready(_) => "ready",
            EnumerationState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for EnumerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumerationState::Ready(models) => write!(f, "ready ({} valid models)", models.len()),
            EnumerationState::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Why an enumeration ended in [`EnumerationState::Failed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Contradiction { clause: String },
    Timeout { elapsed: Duration, models_found: usize },
    Cancelled,
    /// The worker thread died before publishing a result
    WorkerPanicked(String),
}

impl FailureReason {
    /// The caller-facing error for queries made while failed
    pub fn to_error(&self) -> VaroptError {
        match self {
            FailureReason::Contradiction { clause } => {
                VaroptError::EnumerationFailed(EnumerationError::Contradiction { clause: clause.clone() })
            }
            FailureReason::Timeout { elapsed, models_found } => {
                VaroptError::EnumerationFailed(EnumerationError::Timeout {
                    elapsed: *elapsed,
                    models_found: *models_found,
                })
            }
            FailureReason::Cancelled => VaroptError::EnumerationFailed(EnumerationError::Cancelled),
            FailureReason::WorkerPanicked(message) => VaroptError::InterruptedDuringEnumeration(message.clone()),
        }
    }
}

impl From<EnumerationError> for FailureReason {
    fn from(error: EnumerationError) -> Self {
        match error {
            EnumerationError::Contradiction { clause } => FailureReason::Contradiction { clause },
            EnumerationError::Timeout { elapsed, models_found } => FailureReason::Timeout { elapsed, models_found },
            EnumerationError::Cancelled => FailureReason::Cancelled,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Contradiction { clause } => write!(f, "contradiction in clause {}", clause),
            FailureReason::Timeout { elapsed, models_found } => {
                write!(f, "timed out after {:?} with {} models", elapsed, models_found)
            }
            FailureReason::Cancelled => f.write_str("cancelled"),
            FailureReason::WorkerPanicked(message) => write!(f, "worker panicked: {}", message),
        }
    }
}
