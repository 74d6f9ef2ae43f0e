//! Prometheus-backed [`SwapMetrics`].

use htlc_coordinator::{CallOutcome, ChainKind, Direction, SwapMetrics, SwapState};
use htlc_telemetry::{log_chain_event, metrics};
use std::time::Duration;

/// Forwards coordinator events to the global Prometheus registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusSwapMetrics;

impl SwapMetrics for PrometheusSwapMetrics {
    fn record_initiated(&self, direction: Direction) {
        metrics::observe_swap_initiated(direction.label());
    }

    fn record_transition(&self, from: SwapState, to: SwapState) {
        metrics::observe_transition(from.as_str(), to.as_str());
    }

    fn record_chain_call(
        &self,
        chain: ChainKind,
        op: &'static str,
        outcome: CallOutcome,
        elapsed: Duration,
    ) {
        metrics::observe_chain_call(chain.label(), op, outcome.label(), elapsed);
        if outcome != CallOutcome::Ok {
            log_chain_event!(
                debug,
                "[htlc] Ledger call did not succeed",
                chain,
                op,
                outcome = outcome.label(),
                elapsed_ms = elapsed.as_millis() as u64
            );
        }
    }

    fn record_forced_refund(&self, chain: ChainKind) {
        metrics::observe_forced_refund(chain.label());
    }

    fn set_active_swaps(&self, count: usize) {
        metrics::set_active_swaps(count);
    }
}
