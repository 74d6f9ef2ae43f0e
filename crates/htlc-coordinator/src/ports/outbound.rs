//! # Outbound Ports
//!
//! What the coordinator needs from the outside world: ledgers, a clock and a
//! metrics sink.

use crate::domain::{
    Amount, ChainKind, ChainLockRef, Direction, Hashlock, LockStatus, Preimage, SwapError,
    SwapState, TxRef,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Parameters for a new hash time-locked lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockRequest {
    /// Funding party; may refund after `timelock`.
    pub sender: String,
    /// Party that may claim with the preimage before `timelock`.
    pub receiver: String,
    /// Asset code.
    pub asset: String,
    /// Amount (decimal, converted by the adapter).
    pub amount: Amount,
    /// SHA-256 hashlock.
    pub hashlock: Hashlock,
    /// Absolute deadline (unix seconds).
    pub timelock: u64,
}

/// Uniform lock/claim/refund surface over one ledger.
///
/// Implementations own retries and timeouts; an `Err` means the retry budget
/// is spent or the ledger rejected the call outright.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Ledger this adapter talks to.
    fn chain(&self) -> ChainKind;

    /// Relayer account on this ledger (counterparty of every lock).
    fn relayer_account(&self) -> &str;

    /// Place a lock and return its handle.
    async fn create_lock(&self, request: &LockRequest) -> Result<ChainLockRef, SwapError>;

    /// Claim `lock` with `preimage`.
    async fn claim(&self, lock: &ChainLockRef, preimage: &Preimage) -> Result<TxRef, SwapError>;

    /// Refund `lock` to its sender.
    async fn refund(&self, lock: &ChainLockRef) -> Result<TxRef, SwapError>;

    /// Current on-chain status of `lock`.
    async fn get_status(&self, lock: &ChainLockRef) -> Result<LockStatus, SwapError>;
}

/// Wall clock in unix seconds.
pub trait TimeSource: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> u64;
}

/// System clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Settable clock shared by tests and in-memory ledgers.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    time: AtomicU64,
}

impl MockTimeSource {
    /// Start at `initial`.
    pub fn new(initial: u64) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.time.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to `time`.
    pub fn set(&self, time: u64) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }
}

/// Outcome label for a ledger call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// Succeeded.
    Ok,
    /// Failed after retries or with a rejection.
    Error,
    /// Lock was already claimed/refunded.
    AlreadyResolved,
}

impl CallOutcome {
    /// Label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            CallOutcome::Ok => "ok",
            CallOutcome::Error => "error",
            CallOutcome::AlreadyResolved => "already_resolved",
        }
    }

    /// Classify a call result.
    pub fn of<T>(result: &Result<T, SwapError>) -> Self {
        match result {
            Ok(_) => CallOutcome::Ok,
            Err(SwapError::AlreadyResolved { .. }) => CallOutcome::AlreadyResolved,
            Err(_) => CallOutcome::Error,
        }
    }
}

/// Metrics sink for swap activity.
pub trait SwapMetrics: Send + Sync {
    /// A swap was created.
    fn record_initiated(&self, direction: Direction);

    /// A swap changed state.
    fn record_transition(&self, from: SwapState, to: SwapState);

    /// A ledger call finished.
    fn record_chain_call(&self, chain: ChainKind, op: &'static str, outcome: CallOutcome, elapsed: Duration);

    /// The monitor refunded an expired lock.
    fn record_forced_refund(&self, chain: ChainKind);

    /// Non-terminal swap count after a monitor pass.
    fn set_active_swaps(&self, count: usize);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl SwapMetrics for NoopMetrics {
    fn record_initiated(&self, _direction: Direction) {}
    fn record_transition(&self, _from: SwapState, _to: SwapState) {}
    fn record_chain_call(&self, _chain: ChainKind, _op: &'static str, _outcome: CallOutcome, _elapsed: Duration) {}
    fn record_forced_refund(&self, _chain: ChainKind) {}
    fn set_active_swaps(&self, _count: usize) {}
}
