//! # Algorithms Module
//!
//! Pure swap logic: secrets, timelocks, request validation.

pub mod secret;
pub mod swap_setup;
pub mod timelocks;

pub use secret::{create_hash_lock, generate_secret, verify_secret};
pub use swap_setup::create_swap;
pub use timelocks::calculate_timelocks;
