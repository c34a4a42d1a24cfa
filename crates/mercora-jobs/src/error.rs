//! Job engine error types.

use mercora_core::{JobId, MercoraError};
use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Job-related errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// Handler execution failed. Transient: retried per backoff policy
    /// until attempts are exhausted.
    #[error("Job execution failed: {0}")]
    Handler(String),

    /// No handler registered for a job's type. A configuration fault, not
    /// a transient one: the job fails immediately without consuming a
    /// retry, because retrying would never help.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Job not found (or belongs to a different tenant).
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// Operation attempted from a status that does not permit it.
    #[error("Cannot {operation} job: current status is {status}")]
    InvalidState {
        operation: &'static str,
        status: String,
    },

    /// Persistence-layer failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl JobError {
    /// Creates a handler failure from any displayable error.
    #[must_use]
    pub fn handler<T: ToString>(err: T) -> Self {
        Self::Handler(err.to_string())
    }

    /// Creates an invalid state error naming the current status.
    #[must_use]
    pub fn invalid_state<T: ToString>(operation: &'static str, status: T) -> Self {
        Self::InvalidState {
            operation,
            status: status.to_string(),
        }
    }

    /// Returns true if this error is transient and the job should be
    /// retried on a later tick.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Handler(_) | Self::Store(_))
    }
}

impl From<sqlx::Error> for JobError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<MercoraError> for JobError {
    fn from(err: MercoraError) -> Self {
        match err {
            MercoraError::Database(msg) => Self::Store(msg),
            other => Self::Store(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_errors_are_transient() {
        assert!(JobError::handler("boom").is_transient());
        assert!(JobError::Store("connection reset".into()).is_transient());
    }

    #[test]
    fn test_configuration_errors_are_not_transient() {
        let err = JobError::Configuration("no handler registered for type noop".into());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_invalid_state_names_status() {
        let err = JobError::invalid_state("cancel", "running");
        let msg = err.to_string();
        assert!(msg.contains("cancel") && msg.contains("running"));
    }

    #[test]
    fn test_not_found_display() {
        let id = JobId::new();
        let err = JobError::NotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
