//! # HTLC Telemetry
//!
//! Structured logging and Prometheus metrics for the HTLC relayer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use htlc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HTLC_SERVICE_NAME` | `htlc-relayer` | Service name in logs |
//! | `HTLC_LOG_LEVEL` | `info` | Log level filter |
//! | `HTLC_JSON_LOGS` | `false` | JSON log output |
//! | `HTLC_METRICS_PORT` | `9100` | Prometheus port |
//! | `HTLC_NETWORK` | `testnet` | Network label |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{encode_metrics, register_metrics, MetricsHandle};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Subscriber could not be installed.
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Bad configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_tracing(&config)?;

    Ok(TelemetryGuard { metrics, config })
}

/// Keeps telemetry active.
pub struct TelemetryGuard {
    metrics: MetricsHandle,
    config: TelemetryConfig,
}

impl TelemetryGuard {
    /// Registered metrics.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Configuration telemetry was started with.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("[htlc] Shutting down telemetry");
    }
}
