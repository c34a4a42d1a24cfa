//! Result alias used across the platform crates.

use crate::error::MercoraError;

/// Result type for Mercora operations.
pub type MercoraResult<T> = Result<T, MercoraError>;
