//! # HTLC Coordinator
//!
//! Trustless cross-chain atomic swaps between an escrow-contract chain and a
//! claimable-balance ledger, using Hash Time-Locked Contracts.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A relayer holds liquidity on both ledgers and coordinates each swap:
//! - SHA-256 hashlocks shared by both legs
//! - The destination deadline expires strictly before the source deadline
//! - Revealing the preimage on one ledger makes it usable on the other
//! - Expired locks are refunded by a background monitor
//!
//! ## Swap Lifecycle
//!
//! ```text
//! INIT -> SOURCE_LOCKED -> DEST_LOCKED -> DEST_CLAIMED -> COMPLETED
//!   |          |               |              |
//!   +----------+---------------+--> EXPIRED --+--> REFUNDING -> REFUNDED
//!   |
//!   +--> FAILED (from any non-terminal state)
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! htlc-coordinator/
//! ├── domain/          # Swap, SwapState, Preimage, Hashlock, errors
//! ├── algorithms/      # Secret generation, timelocks, swap setup
//! ├── ports/           # SwapApi, ChainAdapter, ledger clients
//! ├── adapters/        # Escrow + claimable-balance adapters, RPC clients
//! └── service/         # Registry, orchestrator, expiry monitor
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{ClaimableBalanceAdapter, EscrowAdapter, HorizonLedgerClient, JsonRpcEscrowClient};
#[cfg(any(test, feature = "test-util"))]
pub use adapters::{InMemoryClaimableLedger, InMemoryEscrowChain};
pub use algorithms::{calculate_timelocks, create_hash_lock, create_swap, generate_secret, verify_secret};
pub use config::{MonitorConfig, RetryPolicy, SwapConfig};
pub use domain::{
    Amount, ChainKind, ChainLockRef, ChainRejection, Direction, Hashlock, Leg, LockStatus,
    Preimage, RefundReceipt, Swap, SwapError, SwapId, SwapRequest, SwapState, SwapTransition,
    TxRef, DEFAULT_SAFETY_MARGIN_SECS,
};
pub use ports::{
    CallOutcome, ChainAdapter, LockRequest, MockTimeSource, NoopMetrics, PreimageAccess, SwapApi,
    SwapMetrics, SystemTimeSource, TimeSource,
};
pub use service::{ExpiryMonitor, RegistryStats, SecretVault, SwapOrchestrator, SwapRegistry, TickReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
