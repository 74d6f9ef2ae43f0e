//! Prometheus metrics for the HTLC relayer.
//!
//! All metrics follow the naming convention: `htlc_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: swaps initiated, state transitions, ledger calls, forced refunds
//! - **Gauge**: active (non-terminal) swaps
//! - **Histogram**: ledger call latency

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SWAP METRICS
    // =========================================================================

    /// Swaps created, by direction
    pub static ref SWAPS_INITIATED: CounterVec = CounterVec::new(
        Opts::new("htlc_swaps_initiated_total", "Total swaps created"),
        &["direction"]  // direction: a_to_b/b_to_a
    ).expect("metric creation failed");

    /// State machine transitions
    pub static ref SWAP_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("htlc_swap_transitions_total", "Swap state transitions"),
        &["from", "to"]
    ).expect("metric creation failed");

    /// Swaps not yet in a terminal state
    pub static ref ACTIVE_SWAPS: Gauge = Gauge::new(
        "htlc_swaps_active",
        "Number of swaps not in a terminal state"
    ).expect("metric creation failed");

    // =========================================================================
    // LEDGER METRICS
    // =========================================================================

    /// Ledger calls by outcome
    pub static ref CHAIN_CALLS: CounterVec = CounterVec::new(
        Opts::new("htlc_chain_calls_total", "Ledger calls made by the coordinator"),
        &["chain", "op", "outcome"]  // outcome: ok/error/already_resolved
    ).expect("metric creation failed");

    /// Ledger call latency, retries included
    pub static ref CHAIN_CALL_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "htlc_chain_call_duration_seconds",
            "Time spent in ledger calls including retries"
        ).buckets(exponential_buckets(0.005, 2.0, 14).expect("bucket creation failed")),
        &["chain", "op"]
    ).expect("metric creation failed");

    /// Refunds issued by the expiry monitor
    pub static ref FORCED_REFUNDS: CounterVec = CounterVec::new(
        Opts::new("htlc_forced_refunds_total", "Expired locks refunded by the monitor"),
        &["chain"]
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Registry the metrics were registered with.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SWAPS_INITIATED.clone()),
        Box::new(SWAP_TRANSITIONS.clone()),
        Box::new(ACTIVE_SWAPS.clone()),
        Box::new(CHAIN_CALLS.clone()),
        Box::new(CHAIN_CALL_DURATION.clone()),
        Box::new(FORCED_REFUNDS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Count a created swap.
pub fn observe_swap_initiated(direction: &str) {
    SWAPS_INITIATED.with_label_values(&[direction]).inc();
}

/// Count a state transition.
pub fn observe_transition(from: &str, to: &str) {
    SWAP_TRANSITIONS.with_label_values(&[from, to]).inc();
}

/// Count a ledger call and record its latency.
pub fn observe_chain_call(chain: &str, op: &str, outcome: &str, elapsed: Duration) {
    CHAIN_CALLS.with_label_values(&[chain, op, outcome]).inc();
    CHAIN_CALL_DURATION
        .with_label_values(&[chain, op])
        .observe(elapsed.as_secs_f64());
}

/// Count a monitor refund.
pub fn observe_forced_refund(chain: &str) {
    FORCED_REFUNDS.with_label_values(&[chain]).inc();
}

/// Set the active swap gauge.
pub fn set_active_swaps(count: usize) {
    ACTIVE_SWAPS.set(count as f64);
}
