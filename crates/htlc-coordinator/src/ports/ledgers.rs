//! # Ledger Ports
//!
//! Raw call surfaces of the two ledgers. Chain adapters sit on top of these
//! and translate them into [`ChainAdapter`](super::ChainAdapter) semantics.

use crate::domain::{ChainKind, ChainRejection, Hashlock, LockStatus, Preimage, SwapError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a raw ledger call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerCallError {
    /// Network failure, timeout, 5xx. Retryable.
    #[error("transport: {0}")]
    Transport(String),

    /// Ledger refused the operation.
    #[error("rejected: {0}")]
    Rejected(ChainRejection),

    /// Target lock was already claimed or refunded.
    #[error("already resolved")]
    AlreadyResolved,
}

impl LedgerCallError {
    /// Map onto the coordinator taxonomy.
    ///
    /// `AlreadyResolved` comes back with [`LockStatus::Unknown`]; adapters
    /// query the ledger to fill in the real status.
    pub fn into_swap_error(self, chain: ChainKind, lock_id: &str) -> SwapError {
        match self {
            LedgerCallError::Transport(message) => SwapError::rpc(chain, message),
            LedgerCallError::Rejected(ChainRejection::InvalidPreimage) => SwapError::HashlockMismatch,
            LedgerCallError::Rejected(reason) => SwapError::Chain { chain, reason },
            LedgerCallError::AlreadyResolved => SwapError::AlreadyResolved {
                lock_id: lock_id.to_string(),
                status: LockStatus::Unknown,
            },
        }
    }
}

/// Map a ledger operation result code (`op_*`) onto a rejection.
pub fn rejection_from_code(code: &str) -> ChainRejection {
    match code {
        "op_underfunded" | "op_low_reserve" => ChainRejection::Underfunded,
        "op_cannot_claim" => ChainRejection::PredicateNotSatisfied,
        "op_does_not_exist" => ChainRejection::LockNotFound,
        "op_invalid_preimage" => ChainRejection::InvalidPreimage,
        "op_malformed" => ChainRejection::InsufficientValue,
        other => ChainRejection::Other(other.to_string()),
    }
}

// =============================================================================
// Escrow-contract chain
// =============================================================================

/// Event emitted by the escrow contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EscrowEvent {
    /// A lock was created.
    Created {
        /// Contract-assigned lock id.
        #[serde(rename = "lockId")]
        lock_id: String,
        /// Funding account.
        sender: String,
        /// Claiming account.
        receiver: String,
        /// Value in base units.
        #[serde(with = "u128_string")]
        amount: u128,
        /// SHA-256 hashlock.
        hashlock: Hashlock,
        /// Deadline (unix seconds).
        timelock: u64,
    },
    /// A lock was claimed.
    Claimed {
        /// Lock id.
        #[serde(rename = "lockId")]
        lock_id: String,
        /// Revealed preimage (hex).
        preimage: String,
    },
    /// A lock was refunded.
    Refunded {
        /// Lock id.
        #[serde(rename = "lockId")]
        lock_id: String,
    },
}

/// Mined transaction with decoded contract events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowReceipt {
    /// Transaction hash.
    #[serde(rename = "txHash")]
    pub tx_hash: String,
    /// Decoded escrow events, in log order.
    pub events: Vec<EscrowEvent>,
}

/// On-chain escrow entry as returned by `getEscrow`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// Funding account.
    pub sender: String,
    /// Claiming account.
    pub receiver: String,
    /// Value in base units.
    #[serde(with = "u128_string")]
    pub amount: u128,
    /// SHA-256 hashlock.
    pub hashlock: Hashlock,
    /// Deadline (unix seconds).
    pub timelock: u64,
    /// Claimed with a valid preimage.
    pub claimed: bool,
    /// Refunded to sender.
    pub refunded: bool,
}

/// Escrow contract calls, signed and submitted by a gateway that holds keys.
#[async_trait]
pub trait EscrowRpc: Send + Sync {
    /// `createEscrow(receiver, hashlock, timelock)` paying `value` from `sender`.
    async fn create_escrow(
        &self,
        sender: &str,
        receiver: &str,
        hashlock: &Hashlock,
        timelock: u64,
        value: u128,
    ) -> Result<EscrowReceipt, LedgerCallError>;

    /// `claim(lockId, preimage)`.
    async fn claim(&self, lock_id: &str, preimage: &Preimage) -> Result<EscrowReceipt, LedgerCallError>;

    /// `refund(lockId)`.
    async fn refund(&self, lock_id: &str) -> Result<EscrowReceipt, LedgerCallError>;

    /// `getEscrow(lockId)`; `None` if the id is unknown.
    async fn get_escrow(&self, lock_id: &str) -> Result<Option<EscrowRecord>, LedgerCallError>;
}

/// Base-unit amounts travel as decimal strings; 18-decimal values overflow
/// JSON numbers.
mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Claimable-balance ledger
// =============================================================================

/// Condition under which a claimant may claim a balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaimPredicate {
    /// Claim must carry a preimage hashing to `hash`.
    HashX {
        /// SHA-256 hashlock.
        hash: Hashlock,
    },
    /// Ledger close time strictly before `epoch`.
    BeforeAbsoluteTime {
        /// Unix seconds.
        epoch: u64,
    },
    /// Negation.
    Not {
        /// Inner predicate.
        predicate: Box<ClaimPredicate>,
    },
    /// Conjunction.
    And {
        /// Left operand.
        left: Box<ClaimPredicate>,
        /// Right operand.
        right: Box<ClaimPredicate>,
    },
}

impl ClaimPredicate {
    /// Receiver branch: preimage required, before `timelock`.
    pub fn hash_before(hashlock: Hashlock, timelock: u64) -> Self {
        ClaimPredicate::And {
            left: Box::new(ClaimPredicate::HashX { hash: hashlock }),
            right: Box::new(ClaimPredicate::BeforeAbsoluteTime { epoch: timelock }),
        }
    }

    /// Sender branch: at or after `timelock`.
    pub fn not_before(timelock: u64) -> Self {
        ClaimPredicate::Not {
            predicate: Box::new(ClaimPredicate::BeforeAbsoluteTime { epoch: timelock }),
        }
    }

    /// Evaluate at ledger close time `close_time` with optional preimage.
    pub fn evaluate(&self, close_time: u64, preimage: Option<&Preimage>) -> bool {
        match self {
            ClaimPredicate::HashX { hash } => preimage
                .map(|p| crate::algorithms::verify_secret(p.as_bytes(), hash))
                .unwrap_or(false),
            ClaimPredicate::BeforeAbsoluteTime { epoch } => close_time < *epoch,
            ClaimPredicate::Not { predicate } => !predicate.evaluate(close_time, preimage),
            ClaimPredicate::And { left, right } => {
                left.evaluate(close_time, preimage) && right.evaluate(close_time, preimage)
            }
        }
    }
}

/// Account allowed to claim, with its predicate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claimant {
    /// Claiming account.
    pub destination: String,
    /// Claim condition.
    pub predicate: ClaimPredicate,
}

/// `CreateClaimableBalance` operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBalanceOp {
    /// Funding account.
    pub source: String,
    /// Asset code.
    pub asset: String,
    /// Amount in stroops (10^-7).
    pub amount: i64,
    /// Who may claim and when.
    pub claimants: Vec<Claimant>,
}

/// Per-operation result inside a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationResult {
    /// Balance created.
    CreateClaimableBalance {
        /// Ledger-assigned balance id.
        balance_id: String,
    },
    /// Balance claimed.
    ClaimClaimableBalance,
    /// Operation failed with a ledger result code.
    Failed {
        /// Result code, e.g. `op_underfunded`.
        code: String,
    },
}

/// Submitted transaction result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTxResult {
    /// Transaction hash.
    pub tx_hash: String,
    /// One result per operation, in order.
    pub operation_results: Vec<OperationResult>,
}

/// Live claimable balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Balance id.
    pub id: String,
    /// Asset code.
    pub asset: String,
    /// Amount in stroops.
    pub amount: i64,
    /// Account that created the balance.
    pub sponsor: String,
    /// Claimants with predicates.
    pub claimants: Vec<Claimant>,
}

/// The operation that consumed a balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Balance id.
    pub balance_id: String,
    /// Account that claimed.
    pub claimant: String,
    /// Transaction hash.
    pub tx_hash: String,
}

/// Claimable-balance ledger operations and queries.
#[async_trait]
pub trait ClaimableBalanceLedger: Send + Sync {
    /// Submit `CreateClaimableBalance`.
    async fn create_claimable_balance(
        &self,
        op: &CreateBalanceOp,
    ) -> Result<LedgerTxResult, LedgerCallError>;

    /// Submit `ClaimClaimableBalance` as `claimant`, attaching `preimage` for hash predicates.
    async fn claim_claimable_balance(
        &self,
        claimant: &str,
        balance_id: &str,
        preimage: Option<&Preimage>,
    ) -> Result<LedgerTxResult, LedgerCallError>;

    /// Fetch a live balance; `None` once claimed or never created.
    async fn get_claimable_balance(
        &self,
        balance_id: &str,
    ) -> Result<Option<BalanceRecord>, LedgerCallError>;

    /// Find the claim that consumed `balance_id`.
    async fn get_claim_operation(
        &self,
        balance_id: &str,
    ) -> Result<Option<ClaimRecord>, LedgerCallError>;
}
