//! # Exploit Simulations
//!
//! Attempts to extract the preimage early, move funds twice, or slip a bogus
//! ledger result past the coordinator.

pub mod double_spend;
pub mod malformed_receipts;
