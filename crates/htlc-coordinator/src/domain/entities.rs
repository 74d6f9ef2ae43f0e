//! # Domain Entities
//!
//! The swap aggregate and the lock handles it carries.

use super::errors::SwapError;
use super::preimage::Preimage;
use super::value_objects::{
    Amount, ChainKind, Direction, Hashlock, LockStatus, SwapId, SwapState, TxRef,
};
use serde::{Deserialize, Serialize};

/// Handle to a lock on one ledger plus its last observed status.
///
/// `lock_id` is produced and interpreted only by the owning adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLockRef {
    /// Ledger holding the lock.
    pub chain: ChainKind,
    /// Adapter-specific handle (escrow lock id, claimable balance id).
    pub lock_id: String,
    /// Party that funded the lock and may refund it.
    pub sender: String,
    /// Party that may claim with the preimage.
    pub receiver: String,
    /// Deadline of this lock (unix seconds).
    pub timelock: u64,
    /// Last observed status.
    pub status: LockStatus,
    /// Transaction that created the lock.
    pub lock_tx: TxRef,
    /// Transaction that claimed or refunded the lock.
    pub resolve_tx: Option<TxRef>,
}

impl ChainLockRef {
    /// Funds may still be moved by a claim or a refund.
    pub fn is_outstanding(&self) -> bool {
        !self.status.is_resolved()
    }

    /// Refund branch is open at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.timelock
    }
}

/// Caller-facing swap request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Caller-chosen id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Which ledger hosts the source lock.
    pub direction: Direction,
    /// Asset locked by the sender.
    pub from_asset: String,
    /// Asset delivered to the receiver.
    pub to_asset: String,
    /// Decimal amount, identical on both legs.
    pub amount: String,
    /// Sender address on the source ledger.
    pub sender: String,
    /// Receiver address on the destination ledger.
    pub receiver: String,
    /// Source timelock duration; the destination gets half.
    pub timelock_seconds: u64,
}

/// One entry of a swap's audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTransition {
    /// State before.
    pub from: SwapState,
    /// State after.
    pub to: SwapState,
    /// Unix seconds.
    pub at: u64,
    /// Free-form cause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Atomic swap aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Swap {
    /// Unique swap identifier.
    pub id: SwapId,
    /// Which ledger hosts the source lock.
    pub direction: Direction,
    /// Asset locked by the sender.
    pub from_asset: String,
    /// Asset delivered to the receiver.
    pub to_asset: String,
    /// Amount on both legs.
    pub amount: Amount,
    /// Sender address on the source ledger.
    pub sender: String,
    /// Receiver address on the destination ledger.
    pub receiver: String,
    /// hex(SHA-256(preimage)); set once.
    pub hashlock: Hashlock,
    /// Present only once revealed by a destination claim.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub preimage: Option<Preimage>,
    /// Source lock deadline (unix seconds).
    pub timelock_source: u64,
    /// Destination lock deadline (unix seconds).
    pub timelock_dest: u64,
    /// Lock on the source ledger.
    pub source_lock: Option<ChainLockRef>,
    /// Lock on the destination ledger.
    pub dest_lock: Option<ChainLockRef>,
    /// Current state.
    pub state: SwapState,
    /// Creation time (unix seconds).
    pub created_at: u64,
    /// Last mutation time (unix seconds).
    pub updated_at: u64,
    /// Cause of the last failure, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure_cause: Option<String>,
    /// Every state change, oldest first.
    pub history: Vec<SwapTransition>,
}

/// Validated parameters for [`Swap::new`].
#[derive(Clone, Debug)]
pub struct SwapParams {
    /// Unique identifier.
    pub id: SwapId,
    /// Direction.
    pub direction: Direction,
    /// Source asset.
    pub from_asset: String,
    /// Destination asset.
    pub to_asset: String,
    /// Amount.
    pub amount: Amount,
    /// Sender.
    pub sender: String,
    /// Receiver.
    pub receiver: String,
    /// Hashlock.
    pub hashlock: Hashlock,
    /// Source deadline.
    pub timelock_source: u64,
    /// Destination deadline.
    pub timelock_dest: u64,
    /// Creation timestamp.
    pub created_at: u64,
}

impl Swap {
    /// Create a swap in `INIT`.
    pub fn new(params: SwapParams) -> Self {
        Self {
            id: params.id,
            direction: params.direction,
            from_asset: params.from_asset,
            to_asset: params.to_asset,
            amount: params.amount,
            sender: params.sender,
            receiver: params.receiver,
            hashlock: params.hashlock,
            preimage: None,
            timelock_source: params.timelock_source,
            timelock_dest: params.timelock_dest,
            source_lock: None,
            dest_lock: None,
            state: SwapState::Init,
            created_at: params.created_at,
            updated_at: params.created_at,
            failure_cause: None,
            history: Vec::new(),
        }
    }

    /// Move to `next` if the state machine allows it.
    pub fn transition_to(
        &mut self,
        next: SwapState,
        now: u64,
        note: Option<String>,
    ) -> Result<(), SwapError> {
        if !self.state.can_transition_to(next) {
            return Err(SwapError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.record(next, now, note);
        Ok(())
    }

    /// Move to `next` because the ledgers already show it.
    pub fn reconcile_to(
        &mut self,
        next: SwapState,
        now: u64,
        note: Option<String>,
    ) -> Result<(), SwapError> {
        if !self.state.can_reconcile_to(next) {
            return Err(SwapError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.record(next, now, note);
        Ok(())
    }

    fn record(&mut self, next: SwapState, now: u64, note: Option<String>) {
        self.history.push(SwapTransition {
            from: self.state,
            to: next,
            at: now,
            note,
        });
        self.state = next;
        self.updated_at = now;
    }

    /// Mark `FAILED` with `cause`. No-op on terminal swaps except recording the cause.
    pub fn fail(&mut self, now: u64, cause: impl Into<String>) {
        let cause = cause.into();
        if self.state.can_transition_to(SwapState::Failed) {
            self.record(SwapState::Failed, now, Some(cause.clone()));
        }
        self.failure_cause = Some(cause);
        self.updated_at = now;
    }

    /// Chain of the source lock.
    pub fn source_chain(&self) -> ChainKind {
        self.direction.source_chain()
    }

    /// Chain of the destination lock.
    pub fn dest_chain(&self) -> ChainKind {
        self.direction.dest_chain()
    }

    /// Locks that still hold funds.
    pub fn outstanding_locks(&self) -> impl Iterator<Item = &ChainLockRef> {
        self.source_lock
            .iter()
            .chain(self.dest_lock.iter())
            .filter(|l| l.is_outstanding())
    }

    /// Whether any outstanding lock can be refunded at `now`.
    pub fn has_refundable_lock(&self, now: u64) -> bool {
        self.outstanding_locks().any(|l| l.is_expired(now))
    }

    /// Lock on `leg`, if placed.
    pub fn lock(&self, leg: Leg) -> Option<&ChainLockRef> {
        match leg {
            Leg::Source => self.source_lock.as_ref(),
            Leg::Dest => self.dest_lock.as_ref(),
        }
    }

    /// Mutable lock on `leg`, if placed.
    pub fn lock_mut(&mut self, leg: Leg) -> Option<&mut ChainLockRef> {
        match leg {
            Leg::Source => self.source_lock.as_mut(),
            Leg::Dest => self.dest_lock.as_mut(),
        }
    }

    /// Ledger hosting `leg`.
    pub fn chain(&self, leg: Leg) -> ChainKind {
        match leg {
            Leg::Source => self.source_chain(),
            Leg::Dest => self.dest_chain(),
        }
    }
}

/// One side of a swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    /// Sender's lock.
    Source,
    /// Receiver's lock.
    Dest,
}

impl Leg {
    /// Both legs, source first.
    pub const BOTH: [Leg; 2] = [Leg::Source, Leg::Dest];
}

/// Result of a refund request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    /// Swap refunded.
    pub swap_id: SwapId,
    /// Refund tx on the source ledger, if refunded.
    pub source_tx: Option<TxRef>,
    /// Refund tx on the destination ledger, if refunded.
    pub dest_tx: Option<TxRef>,
    /// Swap state after the call.
    pub state: SwapState,
}

impl RefundReceipt {
    /// Build from a swap's recorded refund transactions.
    pub fn from_swap(swap: &Swap) -> Self {
        let refund_tx = |lock: &Option<ChainLockRef>| {
            lock.as_ref()
                .filter(|l| l.status == LockStatus::Refunded)
                .and_then(|l| l.resolve_tx.clone())
        };
        Self {
            swap_id: swap.id.clone(),
            source_tx: refund_tx(&swap.source_lock),
            dest_tx: refund_tx(&swap.dest_lock),
            state: swap.state,
        }
    }
}
