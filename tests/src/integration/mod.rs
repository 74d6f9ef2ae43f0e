//! # Integration Tests
//!
//! Full swap lifecycles across the escrow chain and the claimable-balance
//! ledger, driven through the public `SwapApi` and the expiry monitor.

pub mod concurrency;
pub mod recovery;
pub mod scenarios;
