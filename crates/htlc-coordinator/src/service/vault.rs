//! Private preimage store.
//!
//! Holds each swap's secret from creation until (and after) it is revealed on
//! the destination ledger. Never serialized, never logged.

use crate::domain::{Preimage, SwapId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Preimages keyed by swap id.
#[derive(Default)]
pub struct SecretVault {
    secrets: RwLock<HashMap<SwapId, Preimage>>,
}

impl SecretVault {
    /// Empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the secret for `id`. The first value wins.
    pub fn store(&self, id: SwapId, preimage: Preimage) {
        self.secrets.write().entry(id).or_insert(preimage);
    }

    /// Copy of the secret for `id`.
    pub fn get(&self, id: &SwapId) -> Option<Preimage> {
        self.secrets.read().get(id).cloned()
    }
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault")
            .field("entries", &self.secrets.read().len())
            .finish()
    }
}
