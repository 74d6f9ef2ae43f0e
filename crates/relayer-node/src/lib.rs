//! # Relayer Node Library
//!
//! Exposes the node's wiring for tests. The entry point is the `main.rs`
//! binary.

#![warn(missing_docs)]

pub mod admin;
pub mod config;
pub mod metrics;
pub mod runtime;

pub use config::{ConfigError, NodeConfig};
pub use metrics::PrometheusSwapMetrics;
pub use runtime::{build_orchestrator, wire_orchestrator, RelayerRuntime};
