//! Unified error types shared across the platform crates.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for the Mercora platform.
///
/// Covers domain, application, and infrastructure failures with a single
/// taxonomy so that callers at any layer can classify an error without
/// knowing which component produced it.
#[derive(Error, Debug)]
pub enum MercoraError {
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict error (e.g., duplicate entry)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation attempted from a state that does not permit it
    #[error("Invalid state for {operation}: current status is {current}")]
    InvalidState {
        operation: &'static str,
        current: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MercoraError {
    /// Returns the HTTP status code for this error.
    ///
    /// The REST layer sits outside this workspace but maps errors through
    /// this single function, so the mapping lives with the taxonomy.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) | Self::InvalidState { .. } => 409,
            Self::Database(_) | Self::Configuration(_) | Self::Internal(_) | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an invalid state error naming the current status.
    #[must_use]
    pub fn invalid_state<T: ToString>(operation: &'static str, current: T) -> Self {
        Self::InvalidState {
            operation,
            current: current.to_string(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is transient and worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for MercoraError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource_type: "database_row",
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    // PostgreSQL unique violation
                    if code == "23505" {
                        return Self::Conflict(db_err.message().to_string());
                    }
                }
                Self::Database(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for MercoraError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}
