//! Tracing subscriber setup shared by binaries and test harnesses.

use crate::MercoraResult;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name stamped on every log line.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Emit JSON lines instead of the human-readable format.
    #[serde(default)]
    pub json_output: bool,
}

fn default_service_name() -> String {
    "mercora".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            json_output: false,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`; without it, platform crates log at debug and
/// everything else at info. Calling this twice fails, so binaries call
/// it once at startup and tests do not call it at all.
pub fn init_telemetry(config: &TelemetryConfig) -> MercoraResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mercora=debug"));

    if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
            .map_err(|e| {
                crate::MercoraError::Internal(format!("Failed to init tracing: {e}"))
            })?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .map_err(|e| {
                crate::MercoraError::Internal(format!("Failed to init tracing: {e}"))
            })?;
    }

    tracing::info!(service_name = %config.service_name, "Telemetry initialized");
    Ok(())
}
