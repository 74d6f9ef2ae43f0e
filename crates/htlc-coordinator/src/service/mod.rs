//! # Service Layer
//!
//! Swap orchestration: the registry, the secret vault, the state machine
//! driving both ledgers and the background expiry monitor.

mod monitor;
mod orchestrator;
mod registry;
mod vault;

pub use monitor::{ExpiryMonitor, TickReport};
pub use orchestrator::SwapOrchestrator;
pub use registry::{RegistryStats, SwapRegistry};
pub use vault::SecretVault;
