//! # Adapters Layer (Hexagonal Architecture)
//!
//! Chain adapters implementing [`ChainAdapter`](crate::ports::ChainAdapter),
//! the raw ledger clients they sit on, and in-memory ledgers for tests.
//! The in-memory ledgers only exist under `cfg(test)` or the `test-util`
//! feature; a node build never links them.

mod claimable_balance;
mod escrow;
mod escrow_rpc;
mod horizon;
#[cfg(any(test, feature = "test-util"))]
mod in_memory_escrow;
#[cfg(any(test, feature = "test-util"))]
mod in_memory_ledger;
pub mod retry;

pub use claimable_balance::{created_balance_id, lock_claimants, ClaimableBalanceAdapter};
pub use escrow::{created_lock_id, record_status, EscrowAdapter};
pub use escrow_rpc::{map_rpc_error, JsonRpcEscrowClient};
pub use horizon::{classify_failure, HorizonLedgerClient};
#[cfg(any(test, feature = "test-util"))]
pub use in_memory_escrow::InMemoryEscrowChain;
#[cfg(any(test, feature = "test-util"))]
pub use in_memory_ledger::InMemoryClaimableLedger;
pub use retry::retry_with_timeout;
