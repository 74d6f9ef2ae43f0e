//! # Swap Registry
//!
//! Concurrency-safe store of swap records keyed by id.
//!
//! Reads are lock-free snapshots. Mutations are serialized per swap through
//! [`SwapRegistry::with_lock`], which holds an async mutex dedicated to that
//! id for the whole read-modify-write, chain calls included. Different swaps
//! never contend.

use crate::domain::{Swap, SwapError, SwapId, SwapState};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Per-state counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// All swaps ever stored.
    pub total: usize,
    /// Swaps not in a terminal state.
    pub active: usize,
    /// Count per state.
    pub by_state: HashMap<SwapState, usize>,
}

/// In-memory swap store.
#[derive(Default)]
pub struct SwapRegistry {
    swaps: RwLock<HashMap<SwapId, Swap>>,
    locks: Mutex<HashMap<SwapId, Arc<tokio::sync::Mutex<()>>>>,
}

impl SwapRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a swap whose id is not yet taken.
    pub fn insert_new(&self, swap: Swap) -> Result<(), SwapError> {
        let mut swaps = self.swaps.write();
        if swaps.contains_key(&swap.id) {
            return Err(SwapError::Validation(format!("duplicate swap id {}", swap.id)));
        }
        swaps.insert(swap.id.clone(), swap);
        Ok(())
    }

    /// Snapshot of one swap.
    pub fn get(&self, id: &SwapId) -> Option<Swap> {
        self.swaps.read().get(id).cloned()
    }

    /// Snapshot of one swap or [`SwapError::SwapNotFound`].
    pub fn require(&self, id: &SwapId) -> Result<Swap, SwapError> {
        self.get(id)
            .ok_or_else(|| SwapError::SwapNotFound(id.to_string()))
    }

    /// Overwrite a stored swap. Call only inside [`with_lock`](Self::with_lock).
    pub fn put(&self, swap: Swap) {
        self.swaps.write().insert(swap.id.clone(), swap);
    }

    /// All swaps, oldest first.
    pub fn list(&self) -> Vec<Swap> {
        let mut swaps: Vec<Swap> = self.swaps.read().values().cloned().collect();
        swaps.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        swaps
    }

    /// Number of stored swaps.
    pub fn len(&self) -> usize {
        self.swaps.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts per state.
    pub fn stats(&self) -> RegistryStats {
        let swaps = self.swaps.read();
        let mut stats = RegistryStats {
            total: swaps.len(),
            ..Default::default()
        };
        for swap in swaps.values() {
            *stats.by_state.entry(swap.state).or_insert(0) += 1;
            if !swap.state.is_terminal() {
                stats.active += 1;
            }
        }
        stats
    }

    /// Run `f` while holding the mutation lock for `id`.
    pub async fn with_lock<F, Fut, T>(&self, id: &SwapId, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        f().await
    }

    fn lock_for(&self, id: &SwapId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
