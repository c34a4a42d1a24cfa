//! # Mercora Core
//!
//! Core types, typed ids, tenancy, and error definitions shared by the
//! Mercora platform crates. Everything here is storage- and
//! transport-agnostic; the ERP/storefront services and the jobs engine
//! build on these foundations.

pub mod error;
pub mod id;
pub mod pagination;
pub mod result;
pub mod telemetry;
pub mod tenant;

pub use error::*;
pub use id::*;
pub use pagination::*;
pub use result::*;
pub use telemetry::{init_telemetry, TelemetryConfig};
pub use tenant::*;

// Re-export shaku for dependency injection
pub use shaku::Interface;
