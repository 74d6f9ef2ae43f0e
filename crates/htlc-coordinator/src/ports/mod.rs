//! # Ports Module
//!
//! Hexagonal architecture ports (inbound API, outbound dependencies).

pub mod inbound;
pub mod ledgers;
pub mod outbound;

pub use inbound::*;
pub use ledgers::*;
pub use outbound::*;
