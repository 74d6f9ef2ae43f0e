//! Claimable Balance Adapter
//!
//! Implements [`ChainAdapter`] on a claimable-balance ledger. A lock is one
//! balance with two claimants:
//!
//! - receiver: `And(HashX(hashlock), BeforeAbsoluteTime(timelock))`
//! - sender: `Not(BeforeAbsoluteTime(timelock))`
//!
//! Claim and refund both submit `ClaimClaimableBalance`, as the receiver with
//! the preimage or as the sender without it. Once a balance is consumed the
//! ledger forgets it, so status comes from the claim operation that took it.

use super::retry::retry_with_timeout;
use crate::config::RetryPolicy;
use crate::domain::{ChainKind, ChainLockRef, ChainRejection, LockStatus, Preimage, SwapError, TxRef};
use crate::ports::{
    rejection_from_code, CallOutcome, ChainAdapter, ClaimPredicate, ClaimableBalanceLedger,
    Claimant, CreateBalanceOp, LedgerTxResult, LockRequest, NoopMetrics, OperationResult,
    SwapMetrics,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const CHAIN: ChainKind = ChainKind::ClaimableBalance;

/// [`ChainAdapter`] for the claimable-balance ledger.
pub struct ClaimableBalanceAdapter {
    ledger: Arc<dyn ClaimableBalanceLedger>,
    relayer: String,
    retry: RetryPolicy,
    metrics: Arc<dyn SwapMetrics>,
}

impl ClaimableBalanceAdapter {
    /// Create an adapter acting as `relayer` on the ledger.
    pub fn new(
        ledger: Arc<dyn ClaimableBalanceLedger>,
        relayer: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            relayer: relayer.into(),
            retry,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Report call outcomes to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn SwapMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    async fn timed<T, F>(&self, op: &'static str, call: F) -> Result<T, SwapError>
    where
        F: Future<Output = Result<T, SwapError>>,
    {
        let started = Instant::now();
        let result = call.await;
        self.metrics
            .record_chain_call(CHAIN, op, CallOutcome::of(&result), started.elapsed());
        result
    }

    async fn submit_claim(
        &self,
        label: &'static str,
        claimant: &str,
        lock: &ChainLockRef,
        preimage: Option<&Preimage>,
    ) -> Result<TxRef, SwapError> {
        let ledger = self.ledger.as_ref();
        let balance_id = lock.lock_id.as_str();

        let result = self
            .timed(
                label,
                retry_with_timeout(label, CHAIN, &self.retry, move || async move {
                    ledger
                        .claim_claimable_balance(claimant, balance_id, preimage)
                        .await
                        .map_err(|e| e.into_swap_error(CHAIN, balance_id))
                }),
            )
            .await;

        match result {
            Ok(tx) => {
                check_results(&tx)?;
                Ok(TxRef(tx.tx_hash))
            }
            // A consumed balance looks the same as one that never existed.
            Err(SwapError::AlreadyResolved { .. })
            | Err(SwapError::Chain {
                reason: ChainRejection::LockNotFound,
                ..
            }) => match self.resolved_status(lock).await? {
                LockStatus::Unknown => Err(SwapError::Chain {
                    chain: CHAIN,
                    reason: ChainRejection::LockNotFound,
                }),
                status => Err(SwapError::AlreadyResolved {
                    lock_id: lock.lock_id.clone(),
                    status,
                }),
            },
            Err(err) => Err(err),
        }
    }

    async fn resolved_status(&self, lock: &ChainLockRef) -> Result<LockStatus, SwapError> {
        let ledger = self.ledger.as_ref();
        let balance_id = lock.lock_id.as_str();

        let live = retry_with_timeout("get_claimable_balance", CHAIN, &self.retry, move || async move {
            ledger
                .get_claimable_balance(balance_id)
                .await
                .map_err(|e| e.into_swap_error(CHAIN, balance_id))
        })
        .await?;
        if live.is_some() {
            return Ok(LockStatus::Locked);
        }

        let claim = retry_with_timeout("get_claim_operation", CHAIN, &self.retry, move || async move {
            ledger
                .get_claim_operation(balance_id)
                .await
                .map_err(|e| e.into_swap_error(CHAIN, balance_id))
        })
        .await?;

        Ok(match claim {
            Some(record) if record.claimant == lock.receiver => LockStatus::Claimed,
            Some(record) if record.claimant == lock.sender => LockStatus::Refunded,
            _ => LockStatus::Unknown,
        })
    }
}

/// Two-claimant layout for one lock.
pub fn lock_claimants(request: &LockRequest) -> Vec<Claimant> {
    vec![
        Claimant {
            destination: request.receiver.clone(),
            predicate: ClaimPredicate::hash_before(request.hashlock, request.timelock),
        },
        Claimant {
            destination: request.sender.clone(),
            predicate: ClaimPredicate::not_before(request.timelock),
        },
    ]
}

fn check_results(tx: &LedgerTxResult) -> Result<(), SwapError> {
    match tx.operation_results.iter().find_map(|r| match r {
        OperationResult::Failed { code } => Some(code),
        _ => None,
    }) {
        Some(code) => Err(SwapError::Chain {
            chain: CHAIN,
            reason: rejection_from_code(code),
        }),
        None => Ok(()),
    }
}

/// Pull the balance id out of a create result.
pub fn created_balance_id(tx: &LedgerTxResult) -> Result<String, SwapError> {
    check_results(tx)?;
    tx.operation_results
        .iter()
        .find_map(|r| match r {
            OperationResult::CreateClaimableBalance { balance_id } => Some(balance_id.clone()),
            _ => None,
        })
        .ok_or_else(|| SwapError::Chain {
            chain: CHAIN,
            reason: ChainRejection::MalformedResult(format!("no balance id in {}", tx.tx_hash)),
        })
}

#[async_trait]
impl ChainAdapter for ClaimableBalanceAdapter {
    fn chain(&self) -> ChainKind {
        CHAIN
    }

    fn relayer_account(&self) -> &str {
        &self.relayer
    }

    async fn create_lock(&self, request: &LockRequest) -> Result<ChainLockRef, SwapError> {
        let stroops = request.amount.to_base_units(CHAIN.decimals())?;
        let amount = i64::try_from(stroops).map_err(|_| {
            SwapError::Validation(format!("amount {} exceeds ledger range", request.amount.as_str()))
        })?;
        let op = CreateBalanceOp {
            source: request.sender.clone(),
            asset: request.asset.clone(),
            amount,
            claimants: lock_claimants(request),
        };
        let ledger = self.ledger.as_ref();
        let op_ref = &op;

        let tx = self
            .timed(
                "create_lock",
                retry_with_timeout("create_claimable_balance", CHAIN, &self.retry, move || async move {
                    ledger
                        .create_claimable_balance(op_ref)
                        .await
                        .map_err(|e| e.into_swap_error(CHAIN, ""))
                }),
            )
            .await?;

        let balance_id = created_balance_id(&tx)?;
        info!(balance_id = %balance_id, tx = %tx.tx_hash, "[htlc] Claimable balance created");

        Ok(ChainLockRef {
            chain: CHAIN,
            lock_id: balance_id,
            sender: request.sender.clone(),
            receiver: request.receiver.clone(),
            timelock: request.timelock,
            status: LockStatus::Locked,
            lock_tx: TxRef(tx.tx_hash),
            resolve_tx: None,
        })
    }

    async fn claim(&self, lock: &ChainLockRef, preimage: &Preimage) -> Result<TxRef, SwapError> {
        debug!(balance_id = %lock.lock_id, "[htlc] Claiming balance as receiver");
        self.submit_claim("claim", &lock.receiver, lock, Some(preimage))
            .await
    }

    async fn refund(&self, lock: &ChainLockRef) -> Result<TxRef, SwapError> {
        debug!(balance_id = %lock.lock_id, "[htlc] Reclaiming balance as sender");
        self.submit_claim("refund", &lock.sender, lock, None).await
    }

    async fn get_status(&self, lock: &ChainLockRef) -> Result<LockStatus, SwapError> {
        self.timed("get_status", self.resolved_status(lock)).await
    }
}
