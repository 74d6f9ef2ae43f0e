//! # Domain Module
//!
//! Core domain types for swap coordination.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod preimage;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use preimage::{Preimage, PREIMAGE_LEN};
pub use value_objects::*;
