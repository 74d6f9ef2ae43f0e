//! # Expiry Monitor
//!
//! Background loop that keeps stalled swaps moving. Each tick scans the
//! registry and, per swap:
//!
//! | State | Condition | Action |
//! |-------|-----------|--------|
//! | `INIT` | past source timelock | `abandon_unlocked` |
//! | `DEST_LOCKED` | before dest timelock | `get_status` (detect an on-chain claim) |
//! | `FAILED` | both locks still live | `get_status` (a claim reopens the source leg) |
//! | `DEST_CLAIMED` | before source timelock | `claim_source` |
//! | any non-terminal, `FAILED` | an outstanding lock is expired | `request_refund` |
//!
//! Every action goes through the orchestrator, so per-swap serialization and
//! all state guards apply. Errors are logged and retried on the next tick.

use super::orchestrator::SwapOrchestrator;
use crate::domain::{Leg, Swap, SwapError, SwapState};
use crate::ports::SwapApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome of one monitor pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Swaps examined.
    pub scanned: usize,
    /// `INIT` swaps failed for never locking.
    pub abandoned: usize,
    /// Source claims completed.
    pub source_claims: usize,
    /// Locks refunded.
    pub refunds: usize,
    /// Status polls.
    pub polls: usize,
    /// Actions that returned an error.
    pub errors: usize,
}

impl TickReport {
    /// Whether the pass changed anything or hit an error.
    pub fn is_quiet(&self) -> bool {
        self.abandoned == 0 && self.source_claims == 0 && self.refunds == 0 && self.errors == 0
    }
}

/// Periodic driver for timelock-based transitions.
pub struct ExpiryMonitor {
    orchestrator: Arc<SwapOrchestrator>,
    interval: Duration,
}

impl ExpiryMonitor {
    /// Monitor using the orchestrator's configured interval.
    pub fn new(orchestrator: Arc<SwapOrchestrator>) -> Self {
        let interval = orchestrator.config().monitor.interval;
        Self {
            orchestrator,
            interval,
        }
    }

    /// Override the scan interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run on a tokio task until `shutdown` flips to `true` or its sender drops.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Tick every interval until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        // `interval` panics on a zero period.
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, "[htlc] Expiry monitor started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    if !report.is_quiet() {
                        info!(?report, "[htlc] Expiry monitor pass");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("[htlc] Expiry monitor stopped");
    }

    /// One pass over the registry.
    pub async fn tick(&self) -> TickReport {
        let orchestrator = &self.orchestrator;
        let mut report = TickReport::default();

        for swap in orchestrator.list_swaps() {
            let now = orchestrator.now();
            if swap.state.is_terminal() && swap.state != SwapState::Failed {
                continue;
            }
            report.scanned += 1;

            match swap.state {
                SwapState::Init if now >= swap.timelock_source => {
                    match orchestrator.abandon_unlocked(&swap.id).await {
                        Ok(_) => report.abandoned += 1,
                        Err(err) => self.record_error(&mut report, &swap, "abandon", &err),
                    }
                }
                SwapState::DestClaimed if now < swap.timelock_source => {
                    match orchestrator.claim_source(&swap.id).await {
                        Ok(_) => report.source_claims += 1,
                        Err(err) => self.record_error(&mut report, &swap, "claim_source", &err),
                    }
                }
                _ if swap.has_refundable_lock(now) => self.force_refund(&mut report, &swap).await,
                SwapState::DestLocked => self.poll(&mut report, &swap).await,
                SwapState::Failed
                    if Leg::BOTH
                        .iter()
                        .all(|leg| swap.lock(*leg).map_or(false, |l| l.is_outstanding())) =>
                {
                    self.poll(&mut report, &swap).await
                }
                _ => {}
            }
        }

        orchestrator
            .metrics()
            .set_active_swaps(orchestrator.active_swaps().len());
        report
    }

    async fn poll(&self, report: &mut TickReport, swap: &Swap) {
        report.polls += 1;
        match self.orchestrator.get_status(&swap.id).await {
            Ok(updated) if updated.state == SwapState::DestClaimed => {
                debug!(swap_id = %swap.id, from = %swap.state, "[htlc] Destination claim detected");
            }
            Ok(_) => {}
            Err(err) => self.record_error(report, swap, "get_status", &err),
        }
    }

    async fn force_refund(&self, report: &mut TickReport, swap: &Swap) {
        let orchestrator = &self.orchestrator;
        match orchestrator.request_refund(&swap.id).await {
            Ok(receipt) => {
                for leg in Leg::BOTH {
                    let was_outstanding = swap.lock(leg).map_or(false, |l| l.is_outstanding());
                    let tx = match leg {
                        Leg::Source => &receipt.source_tx,
                        Leg::Dest => &receipt.dest_tx,
                    };
                    if was_outstanding && tx.is_some() {
                        report.refunds += 1;
                        orchestrator.metrics().record_forced_refund(swap.chain(leg));
                    }
                }
                info!(swap_id = %swap.id, state = %receipt.state, "[htlc] Forced refund");
            }
            Err(err) => self.record_error(report, swap, "refund", &err),
        }
    }

    fn record_error(&self, report: &mut TickReport, swap: &Swap, action: &str, err: &SwapError) {
        report.errors += 1;
        warn!(swap_id = %swap.id, state = %swap.state, action, error = %err, "[htlc] Monitor action failed");
    }
}
