//! Escrow Contract Adapter
//!
//! Implements [`ChainAdapter`] on top of an [`EscrowRpc`] gateway. Amounts are
//! converted to 18-decimal base units; the lock id is read from the `Created`
//! event in the receipt.

use super::retry::retry_with_timeout;
use crate::config::RetryPolicy;
use crate::domain::{ChainKind, ChainLockRef, ChainRejection, LockStatus, Preimage, SwapError, TxRef};
use crate::ports::{
    CallOutcome, ChainAdapter, EscrowEvent, EscrowReceipt, EscrowRecord, EscrowRpc, LockRequest,
    NoopMetrics, SwapMetrics,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const CHAIN: ChainKind = ChainKind::Escrow;

/// [`ChainAdapter`] for the escrow-contract ledger.
pub struct EscrowAdapter {
    rpc: Arc<dyn EscrowRpc>,
    relayer: String,
    retry: RetryPolicy,
    metrics: Arc<dyn SwapMetrics>,
}

impl EscrowAdapter {
    /// Create an adapter acting as `relayer` on the escrow chain.
    pub fn new(rpc: Arc<dyn EscrowRpc>, relayer: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            rpc,
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

    async fn fetch_record(&self, lock_id: &str) -> Result<Option<EscrowRecord>, SwapError> {
        let rpc = self.rpc.as_ref();
        retry_with_timeout("get_escrow", CHAIN, &self.retry, move || async move {
            rpc.get_escrow(lock_id)
                .await
                .map_err(|e| e.into_swap_error(CHAIN, lock_id))
        })
        .await
    }

    /// Replace the placeholder status on `AlreadyResolved` with the ledger's view.
    async fn resolve_status(&self, err: SwapError) -> SwapError {
        match err {
            SwapError::AlreadyResolved { lock_id, .. } => {
                let status = match self.fetch_record(&lock_id).await {
                    Ok(record) => record_status(record.as_ref()),
                    Err(_) => LockStatus::Unknown,
                };
                SwapError::AlreadyResolved { lock_id, status }
            }
            other => other,
        }
    }
}

/// Lock status implied by an escrow record.
pub fn record_status(record: Option<&EscrowRecord>) -> LockStatus {
    match record {
        None => LockStatus::Unknown,
        Some(r) if r.claimed => LockStatus::Claimed,
        Some(r) if r.refunded => LockStatus::Refunded,
        Some(_) => LockStatus::Locked,
    }
}

fn malformed(detail: impl Into<String>) -> SwapError {
    SwapError::Chain {
        chain: CHAIN,
        reason: ChainRejection::MalformedResult(detail.into()),
    }
}

/// Pull the lock id out of a `createEscrow` receipt.
pub fn created_lock_id(receipt: &EscrowReceipt, request: &LockRequest) -> Result<String, SwapError> {
    receipt
        .events
        .iter()
        .find_map(|event| match event {
            EscrowEvent::Created {
                lock_id, hashlock, ..
            } if *hashlock == request.hashlock => Some(lock_id.clone()),
            _ => None,
        })
        .ok_or_else(|| malformed(format!("no Created event in {}", receipt.tx_hash)))
}

fn expect_event(receipt: &EscrowReceipt, lock_id: &str, claimed: bool) -> Result<TxRef, SwapError> {
    let found = receipt.events.iter().any(|event| match event {
        EscrowEvent::Claimed { lock_id: id, .. } => claimed && id == lock_id,
        EscrowEvent::Refunded { lock_id: id } => !claimed && id == lock_id,
        EscrowEvent::Created { .. } => false,
    });
    if found {
        Ok(TxRef(receipt.tx_hash.clone()))
    } else {
        let name = if claimed { "Claimed" } else { "Refunded" };
        Err(malformed(format!("no {name} event for {lock_id} in {}", receipt.tx_hash)))
    }
}

#[async_trait]
impl ChainAdapter for EscrowAdapter {
    fn chain(&self) -> ChainKind {
        CHAIN
    }

    fn relayer_account(&self) -> &str {
        &self.relayer
    }

    async fn create_lock(&self, request: &LockRequest) -> Result<ChainLockRef, SwapError> {
        let value = request.amount.to_base_units(CHAIN.decimals())?;
        let rpc = self.rpc.as_ref();
        let (sender, receiver, hashlock, timelock) = (
            request.sender.as_str(),
            request.receiver.as_str(),
            &request.hashlock,
            request.timelock,
        );

        let receipt = self
            .timed(
                "create_lock",
                retry_with_timeout("create_escrow", CHAIN, &self.retry, move || async move {
                    rpc.create_escrow(sender, receiver, hashlock, timelock, value)
                        .await
                        .map_err(|e| e.into_swap_error(CHAIN, ""))
                }),
            )
            .await?;

        let lock_id = created_lock_id(&receipt, request)?;
        info!(lock_id = %lock_id, tx = %receipt.tx_hash, "[htlc] Escrow lock created");

        Ok(ChainLockRef {
            chain: CHAIN,
            lock_id,
            sender: request.sender.clone(),
            receiver: request.receiver.clone(),
            timelock: request.timelock,
            status: LockStatus::Locked,
            lock_tx: TxRef(receipt.tx_hash),
            resolve_tx: None,
        })
    }

    async fn claim(&self, lock: &ChainLockRef, preimage: &Preimage) -> Result<TxRef, SwapError> {
        debug!(lock_id = %lock.lock_id, "[htlc] Claiming escrow lock");
        let rpc = self.rpc.as_ref();
        let lock_id = lock.lock_id.as_str();

        let result = self
            .timed(
                "claim",
                retry_with_timeout("claim", CHAIN, &self.retry, move || async move {
                    rpc.claim(lock_id, preimage)
                        .await
                        .map_err(|e| e.into_swap_error(CHAIN, lock_id))
                }),
            )
            .await;

        match result {
            Ok(receipt) => expect_event(&receipt, lock_id, true),
            Err(err) => Err(self.resolve_status(err).await),
        }
    }

    async fn refund(&self, lock: &ChainLockRef) -> Result<TxRef, SwapError> {
        debug!(lock_id = %lock.lock_id, "[htlc] Refunding escrow lock");
        let rpc = self.rpc.as_ref();
        let lock_id = lock.lock_id.as_str();

        let result = self
            .timed(
                "refund",
                retry_with_timeout("refund", CHAIN, &self.retry, move || async move {
                    rpc.refund(lock_id)
                        .await
                        .map_err(|e| e.into_swap_error(CHAIN, lock_id))
                }),
            )
            .await;

        match result {
            Ok(receipt) => expect_event(&receipt, lock_id, false),
            Err(err) => Err(self.resolve_status(err).await),
        }
    }

    async fn get_status(&self, lock: &ChainLockRef) -> Result<LockStatus, SwapError> {
        let record = self
            .timed("get_status", self.fetch_record(&lock.lock_id))
            .await?;
        Ok(record_status(record.as_ref()))
    }
}
