//! In-memory claimable-balance ledger.
//!
//! Balances live until one claimant's predicate is satisfied at the current
//! close time; the consuming claim is kept so later lookups can tell who took
//! the funds.

use crate::domain::{ChainRejection, Preimage};
use crate::ports::{
    BalanceRecord, ClaimRecord, ClaimableBalanceLedger, CreateBalanceOp, LedgerCallError,
    LedgerTxResult, OperationResult, TimeSource,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Balance ids carry an 8-hex-digit type prefix before the 32-byte hash.
const BALANCE_ID_PREFIX: &str = "00000000";

/// Claimable-balance ledger kept in process memory.
pub struct InMemoryClaimableLedger {
    balances: RwLock<HashMap<String, BalanceRecord>>,
    claims: RwLock<HashMap<String, ClaimRecord>>,
    clock: Arc<dyn TimeSource>,
    nonce: AtomicU64,
    mutations: AtomicU64,
    faults: Mutex<VecDeque<LedgerCallError>>,
    latency: RwLock<Duration>,
}

impl InMemoryClaimableLedger {
    /// Ledger whose close time follows `clock`.
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            claims: RwLock::new(HashMap::new()),
            clock,
            nonce: AtomicU64::new(0),
            mutations: AtomicU64::new(0),
            faults: Mutex::new(VecDeque::new()),
            latency: RwLock::new(Duration::ZERO),
        }
    }

    /// Fail the next `count` calls with `error` before they reach the ledger.
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

    /// Live balance snapshot.
    pub fn balance(&self, balance_id: &str) -> Option<BalanceRecord> {
        self.balances.read().get(balance_id).cloned()
    }

    /// Claim that consumed `balance_id`.
    pub fn claim_record(&self, balance_id: &str) -> Option<ClaimRecord> {
        self.claims.read().get(balance_id).cloned()
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

    fn next_hash(&self, tag: &[u8], data: &[u8]) -> String {
        let n = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Sha256::new();
        hasher.update(tag);
        hasher.update(n.to_le_bytes());
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ClaimableBalanceLedger for InMemoryClaimableLedger {
    async fn create_claimable_balance(
        &self,
        op: &CreateBalanceOp,
    ) -> Result<LedgerTxResult, LedgerCallError> {
        self.enter().await?;

        if op.amount <= 0 || op.claimants.is_empty() {
            return Err(LedgerCallError::Rejected(ChainRejection::InsufficientValue));
        }

        let balance_id = format!(
            "{BALANCE_ID_PREFIX}{}",
            self.next_hash(b"balance", op.source.as_bytes())
        );
        debug!(balance_id = %balance_id, "[htlc] in-memory claimable balance created");

        self.balances.write().insert(
            balance_id.clone(),
            BalanceRecord {
                id: balance_id.clone(),
                asset: op.asset.clone(),
                amount: op.amount,
                sponsor: op.source.clone(),
                claimants: op.claimants.clone(),
            },
        );
        self.mutations.fetch_add(1, Ordering::SeqCst);

        Ok(LedgerTxResult {
            tx_hash: self.next_hash(b"tx", balance_id.as_bytes()),
            operation_results: vec![OperationResult::CreateClaimableBalance { balance_id }],
        })
    }

    async fn claim_claimable_balance(
        &self,
        claimant: &str,
        balance_id: &str,
        preimage: Option<&Preimage>,
    ) -> Result<LedgerTxResult, LedgerCallError> {
        self.enter().await?;
        let now = self.clock.now();
        let tx_hash = self.next_hash(b"tx", balance_id.as_bytes());

        {
            let mut balances = self.balances.write();
            let balance = match balances.get(balance_id) {
                Some(b) => b,
                None if self.claims.read().contains_key(balance_id) => {
                    return Err(LedgerCallError::AlreadyResolved)
                }
                None => return Err(LedgerCallError::Rejected(ChainRejection::LockNotFound)),
            };

            let entry = balance
                .claimants
                .iter()
                .find(|c| c.destination == claimant)
                .ok_or(LedgerCallError::Rejected(ChainRejection::PredicateNotSatisfied))?;
            if !entry.predicate.evaluate(now, preimage) {
                return Err(LedgerCallError::Rejected(ChainRejection::PredicateNotSatisfied));
            }

            balances.remove(balance_id);
            self.claims.write().insert(
                balance_id.to_string(),
                ClaimRecord {
                    balance_id: balance_id.to_string(),
                    claimant: claimant.to_string(),
                    tx_hash: tx_hash.clone(),
                },
            );
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);

        Ok(LedgerTxResult {
            tx_hash,
            operation_results: vec![OperationResult::ClaimClaimableBalance],
        })
    }

    async fn get_claimable_balance(
        &self,
        balance_id: &str,
    ) -> Result<Option<BalanceRecord>, LedgerCallError> {
        self.enter().await?;
        Ok(self.balance(balance_id))
    }

    async fn get_claim_operation(
        &self,
        balance_id: &str,
    ) -> Result<Option<ClaimRecord>, LedgerCallError> {
        self.enter().await?;
        Ok(self.claim_record(balance_id))
    }
}
