//! In-memory escrow contract.
//!
//! Enforces the contract rules (value > 0, future timelock, claim only before
//! the timelock with a matching preimage, refund only at or after it, each lock
//! resolved once). Supports injected transport faults and artificial latency.

use crate::algorithms::verify_secret;
use crate::domain::{ChainRejection, Hashlock, Preimage};
use crate::ports::{EscrowEvent, EscrowReceipt, EscrowRecord, EscrowRpc, LedgerCallError, TimeSource};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Escrow contract kept in process memory.
pub struct InMemoryEscrowChain {
    escrows: RwLock<HashMap<String, EscrowRecord>>,
    clock: Arc<dyn TimeSource>,
    nonce: AtomicU64,
    mutations: AtomicU64,
    faults: Mutex<VecDeque<LedgerCallError>>,
    latency: RwLock<Duration>,
}

impl InMemoryEscrowChain {
    /// Contract whose block time follows `clock`.
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            escrows: RwLock::new(HashMap::new()),
            clock,
            nonce: AtomicU64::new(0),
            mutations: AtomicU64::new(0),
            faults: Mutex::new(VecDeque::new()),
            latency: RwLock::new(Duration::ZERO),
        }
    }

    /// Fail the next `count` calls with `error` before they reach the contract.
    pub fn fail_next(&self, count: usize, error: LedgerCallError) {
        let mut faults = self.faults.lock();
        faults.extend(std::iter::repeat(error).take(count));
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Successful state-changing calls so far.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Snapshot of an escrow entry.
    pub fn record(&self, lock_id: &str) -> Option<EscrowRecord> {
        self.escrows.read().get(lock_id).cloned()
    }

    async fn enter(&self) -> Result<(), LedgerCallError> {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.faults.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn tx_hash(&self, tag: &[u8], lock_id: &str) -> String {
        let n = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Sha256::new();
        hasher.update(tag);
        hasher.update(n.to_le_bytes());
        hasher.update(lock_id.as_bytes());
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

fn generate_lock_id(nonce: u64, sender: &str, receiver: &str, hashlock: &Hashlock, timelock: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce.to_le_bytes());
    hasher.update(sender.as_bytes());
    hasher.update(receiver.as_bytes());
    hasher.update(hashlock.as_bytes());
    hasher.update(timelock.to_le_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[async_trait]
impl EscrowRpc for InMemoryEscrowChain {
    async fn create_escrow(
        &self,
        sender: &str,
        receiver: &str,
        hashlock: &Hashlock,
        timelock: u64,
        value: u128,
    ) -> Result<EscrowReceipt, LedgerCallError> {
        self.enter().await?;

        if value == 0 {
            return Err(LedgerCallError::Rejected(ChainRejection::InsufficientValue));
        }
        if timelock <= self.clock.now() {
            return Err(LedgerCallError::Rejected(ChainRejection::TimelockInPast));
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let lock_id = generate_lock_id(nonce, sender, receiver, hashlock, timelock);
        debug!(lock_id = %lock_id, "[htlc] in-memory escrow created");

        self.escrows.write().insert(
            lock_id.clone(),
            EscrowRecord {
                sender: sender.to_string(),
                receiver: receiver.to_string(),
                amount: value,
                hashlock: *hashlock,
                timelock,
                claimed: false,
                refunded: false,
            },
        );
        self.mutations.fetch_add(1, Ordering::SeqCst);

        Ok(EscrowReceipt {
            tx_hash: self.tx_hash(b"create", &lock_id),
            events: vec![EscrowEvent::Created {
                lock_id,
                sender: sender.to_string(),
                receiver: receiver.to_string(),
                amount: value,
                hashlock: *hashlock,
                timelock,
            }],
        })
    }

    async fn claim(&self, lock_id: &str, preimage: &Preimage) -> Result<EscrowReceipt, LedgerCallError> {
        self.enter().await?;

        {
            let mut escrows = self.escrows.write();
            let record = escrows
                .get_mut(lock_id)
                .ok_or(LedgerCallError::Rejected(ChainRejection::LockNotFound))?;

            if record.claimed || record.refunded {
                return Err(LedgerCallError::AlreadyResolved);
            }
            if self.clock.now() >= record.timelock {
                return Err(LedgerCallError::Rejected(ChainRejection::TimelockReached));
            }
            if !verify_secret(preimage.as_bytes(), &record.hashlock) {
                return Err(LedgerCallError::Rejected(ChainRejection::InvalidPreimage));
            }
            record.claimed = true;
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);

        Ok(EscrowReceipt {
            tx_hash: self.tx_hash(b"claim", lock_id),
            events: vec![EscrowEvent::Claimed {
                lock_id: lock_id.to_string(),
                preimage: preimage.to_hex(),
            }],
        })
    }

    async fn refund(&self, lock_id: &str) -> Result<EscrowReceipt, LedgerCallError> {
        self.enter().await?;

        {
            let mut escrows = self.escrows.write();
            let record = escrows
                .get_mut(lock_id)
                .ok_or(LedgerCallError::Rejected(ChainRejection::LockNotFound))?;

            if record.claimed || record.refunded {
                return Err(LedgerCallError::AlreadyResolved);
            }
            if self.clock.now() < record.timelock {
                return Err(LedgerCallError::Rejected(ChainRejection::TimelockNotReached));
            }
            record.refunded = true;
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);

        Ok(EscrowReceipt {
            tx_hash: self.tx_hash(b"refund", lock_id),
            events: vec![EscrowEvent::Refunded {
                lock_id: lock_id.to_string(),
            }],
        })
    }

    async fn get_escrow(&self, lock_id: &str) -> Result<Option<EscrowRecord>, LedgerCallError> {
        self.enter().await?;
        Ok(self.record(lock_id))
    }
}
