//! # Domain Errors
//!
//! Error taxonomy for swap coordination.
//!
//! Only [`SwapError::ChainRpc`] is transient. Every other variant is final for
//! the call that produced it; retrying the same input yields the same error.

use super::value_objects::{ChainKind, LockStatus, SwapState};
use thiserror::Error;

/// Hash type (32-byte SHA-256).
pub type Hash = [u8; 32];

/// Ledger-level rejection of a submitted operation.
///
/// These come back from a contract revert or a failed ledger operation and are
/// never retried.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChainRejection {
    /// Locked value is zero or below the contract minimum.
    #[error("insufficient value")]
    InsufficientValue,

    /// Requested timelock is not in the future.
    #[error("timelock in the past")]
    TimelockInPast,

    /// Caller is not the lock receiver.
    #[error("caller is not the receiver")]
    NotReceiver,

    /// Caller is not the lock sender.
    #[error("caller is not the sender")]
    NotSender,

    /// Refund attempted before the timelock.
    #[error("timelock not yet reached")]
    TimelockNotReached,

    /// Claim attempted at or after the timelock.
    #[error("timelock already reached")]
    TimelockReached,

    /// Preimage does not hash to the lock's hashlock.
    #[error("invalid preimage")]
    InvalidPreimage,

    /// Claimant predicate evaluated to false.
    #[error("claim predicate not satisfied")]
    PredicateNotSatisfied,

    /// Source account cannot cover the lock.
    #[error("source account underfunded")]
    Underfunded,

    /// Lock handle does not exist on the ledger.
    #[error("lock not found")]
    LockNotFound,

    /// Ledger result could not be interpreted (e.g. no lock id in receipt).
    #[error("malformed ledger result: {0}")]
    MalformedResult(String),

    /// Any other revert reason.
    #[error("{0}")]
    Other(String),
}

/// Swap coordination errors.
#[derive(Debug, Error)]
pub enum SwapError {
    /// Request is malformed; rejected before any chain call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation is not allowed from the swap's current state.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: SwapState,
        /// Attempted state
        to: SwapState,
    },

    /// Preimage does not hash to the swap's hashlock.
    #[error("Preimage does not match hashlock")]
    HashlockMismatch,

    /// Network failure or timeout talking to a ledger (retries exhausted).
    #[error("{chain} RPC error: {message}")]
    ChainRpc {
        /// Ledger that failed
        chain: ChainKind,
        /// Transport or timeout detail
        message: String,
    },

    /// Non-transient rejection from a ledger.
    #[error("{chain} rejected operation: {reason}")]
    Chain {
        /// Ledger that rejected
        chain: ChainKind,
        /// Rejection reason
        reason: ChainRejection,
    },

    /// Relevant timelock has passed.
    #[error("Timelock expired at {timelock} (now {now})")]
    Expired {
        /// Deadline that passed
        timelock: u64,
        /// Observed time
        now: u64,
    },

    /// Lock was already claimed or refunded on chain.
    #[error("Lock {lock_id} already resolved ({status})")]
    AlreadyResolved {
        /// Chain-specific lock handle
        lock_id: String,
        /// Observed terminal status
        status: LockStatus,
    },

    /// Preimage requested by a public reader before it was revealed.
    #[error("Preimage withheld while swap is {0}")]
    PreimageWithheld(SwapState),

    /// Unknown swap id.
    #[error("Swap not found: {0}")]
    SwapNotFound(String),
}

impl SwapError {
    /// Whether the error is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, SwapError::ChainRpc { .. })
    }

    /// Build a transport error for `chain`.
    pub fn rpc(chain: ChainKind, message: impl Into<String>) -> Self {
        SwapError::ChainRpc {
            chain,
            message: message.into(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SwapError::Validation(_) => "validation",
            SwapError::InvalidTransition { .. } => "invalid_transition",
            SwapError::HashlockMismatch => "hashlock_mismatch",
            SwapError::ChainRpc { .. } => "chain_rpc",
            SwapError::Chain { .. } => "chain_rejected",
            SwapError::Expired { .. } => "expired",
            SwapError::AlreadyResolved { .. } => "already_resolved",
            SwapError::PreimageWithheld(_) => "preimage_withheld",
            SwapError::SwapNotFound(_) => "not_found",
        }
    }
}
