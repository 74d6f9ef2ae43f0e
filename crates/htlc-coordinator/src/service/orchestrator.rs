//! Swap Orchestrator - the per-swap state machine.
//!
//! Sequences locking, claiming and refunding across both ledgers. Every
//! mutating operation runs under [`SwapRegistry::with_lock`], so at most one
//! operation per swap is in flight; the expiry monitor goes through the same
//! entry points.
//!
//! ```text
//! INIT -> SOURCE_LOCKED -> DEST_LOCKED -> DEST_CLAIMED -> COMPLETED
//!              \               \              \
//!               +---------------+--------------+-> EXPIRED -> REFUNDING -> REFUNDED
//! any non-terminal -> FAILED
//! FAILED -> DEST_CLAIMED | REFUNDED   (reconciled from observed lock statuses)
//! ```

use super::registry::SwapRegistry;
use super::vault::SecretVault;
use crate::algorithms::{create_swap, verify_secret};
use crate::config::SwapConfig;
use crate::domain::{
    ChainKind, ChainLockRef, ChainRejection, Leg, LockStatus, Preimage, RefundReceipt, Swap,
    SwapError, SwapId, SwapRequest, SwapState, TxRef,
};
use crate::ports::{
    ChainAdapter, LockRequest, NoopMetrics, PreimageAccess, SwapApi, SwapMetrics, TimeSource,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Drives swaps through their lifecycle.
pub struct SwapOrchestrator {
    registry: Arc<SwapRegistry>,
    vault: SecretVault,
    escrow: Arc<dyn ChainAdapter>,
    ledger: Arc<dyn ChainAdapter>,
    clock: Arc<dyn TimeSource>,
    metrics: Arc<dyn SwapMetrics>,
    config: SwapConfig,
}

impl SwapOrchestrator {
    /// Create an orchestrator over the escrow-chain and claimable-balance adapters.
    ///
    /// Fails if either adapter reports the wrong [`ChainKind`].
    pub fn new(
        escrow: Arc<dyn ChainAdapter>,
        ledger: Arc<dyn ChainAdapter>,
        clock: Arc<dyn TimeSource>,
        config: SwapConfig,
    ) -> Result<Self, SwapError> {
        for (adapter, expected) in [(&escrow, ChainKind::Escrow), (&ledger, ChainKind::ClaimableBalance)] {
            if adapter.chain() != expected {
                return Err(SwapError::Validation(format!(
                    "adapter for {expected} reports {}",
                    adapter.chain()
                )));
            }
        }
        Ok(Self {
            registry: Arc::new(SwapRegistry::new()),
            vault: SecretVault::new(),
            escrow,
            ledger,
            clock,
            metrics: Arc::new(NoopMetrics),
            config,
        })
    }

    /// Report transitions to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn SwapMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Shared registry handle.
    pub fn registry(&self) -> &Arc<SwapRegistry> {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    /// Current time from the injected clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Metrics sink.
    pub fn metrics(&self) -> &Arc<dyn SwapMetrics> {
        &self.metrics
    }

    /// Every swap, oldest first.
    pub fn list_swaps(&self) -> Vec<Swap> {
        self.registry.list()
    }

    /// Fail an `INIT` swap whose source timelock passed before anything was locked.
    pub async fn abandon_unlocked(&self, id: &SwapId) -> Result<Swap, SwapError> {
        self.registry
            .with_lock(id, move || async move {
                let mut swap = self.registry.require(id)?;
                let now = self.clock.now();
                if swap.state != SwapState::Init || now < swap.timelock_source {
                    return Err(SwapError::InvalidTransition {
                        from: swap.state,
                        to: SwapState::Failed,
                    });
                }
                self.fail(&mut swap, "expired before locking");
                self.registry.put(swap.clone());
                Ok(swap)
            })
            .await
    }

    fn adapter(&self, chain: ChainKind) -> &dyn ChainAdapter {
        match chain {
            ChainKind::Escrow => self.escrow.as_ref(),
            ChainKind::ClaimableBalance => self.ledger.as_ref(),
        }
    }

    fn guard(swap: &Swap, next: SwapState) -> Result<(), SwapError> {
        if swap.state.can_transition_to(next) {
            Ok(())
        } else {
            Err(SwapError::InvalidTransition {
                from: swap.state,
                to: next,
            })
        }
    }

    fn required_lock(swap: &Swap, leg: Leg) -> Result<ChainLockRef, SwapError> {
        swap.lock(leg)
            .cloned()
            .ok_or_else(|| SwapError::Validation(format!("swap {} has no {leg:?} lock", swap.id)))
    }

    fn advance(&self, swap: &mut Swap, next: SwapState, note: Option<String>) -> Result<(), SwapError> {
        let from = swap.state;
        swap.transition_to(next, self.clock.now(), note)?;
        self.metrics.record_transition(from, next);
        info!(swap_id = %swap.id, %from, to = %next, "[htlc] Swap state changed");
        Ok(())
    }

    fn reconcile_state(&self, swap: &mut Swap, next: SwapState, note: &str) {
        let from = swap.state;
        if swap.reconcile_to(next, self.clock.now(), Some(note.to_string())).is_ok() {
            self.metrics.record_transition(from, next);
            info!(swap_id = %swap.id, %from, to = %next, "[htlc] Swap reconciled: {note}");
        }
    }

    fn fail(&self, swap: &mut Swap, cause: impl Into<String>) {
        let from = swap.state;
        let cause = cause.into();
        swap.fail(self.clock.now(), cause.clone());
        if from != swap.state {
            self.metrics.record_transition(from, swap.state);
        }
        error!(swap_id = %swap.id, %from, cause = %cause, "[htlc] Swap failed");
    }

    fn apply_lock_status(swap: &mut Swap, leg: Leg, status: LockStatus, tx: Option<TxRef>) {
        if let Some(lock) = swap.lock_mut(leg) {
            lock.status = status;
            if tx.is_some() {
                lock.resolve_tx = tx;
            }
        }
    }

    /// Fold observed lock statuses into the swap state.
    fn reconcile(&self, swap: &mut Swap) {
        let source = swap.source_lock.as_ref().map(|l| l.status);
        let dest = swap.dest_lock.as_ref().map(|l| l.status);

        if dest == Some(LockStatus::Claimed) {
            // Claimed on chain means the preimage is public.
            if swap.preimage.is_none() {
                swap.preimage = self.vault.get(&swap.id);
            }
            let source_outstanding = source.map_or(false, |s| !s.is_resolved());
            if source_outstanding && !swap.state.preimage_revealed() {
                self.reconcile_state(swap, SwapState::DestClaimed, "destination claim observed on ledger");
            }
        }

        match (swap.state, source) {
            (SwapState::DestClaimed, Some(LockStatus::Claimed)) => {
                self.reconcile_state(swap, SwapState::Completed, "source claim observed on ledger");
            }
            (SwapState::DestClaimed, Some(LockStatus::Refunded)) => {
                self.fail(swap, "source lock refunded after destination claim");
            }
            _ => {}
        }

        let placed: Vec<LockStatus> = [source, dest].into_iter().flatten().collect();
        let none_outstanding = !placed.is_empty() && placed.iter().all(|s| s.is_resolved());
        let any_refunded = placed.contains(&LockStatus::Refunded);
        match swap.state {
            SwapState::Refunding if none_outstanding => {
                self.reconcile_state(swap, SwapState::Refunded, "no lock outstanding");
            }
            SwapState::SourceLocked | SwapState::DestLocked | SwapState::Expired
                if none_outstanding && any_refunded =>
            {
                self.reconcile_state(swap, SwapState::Refunded, "refund observed on ledger");
            }
            // Both legs existed and both came back: the swap unwound cleanly.
            SwapState::Failed
                if source == Some(LockStatus::Refunded) && dest == Some(LockStatus::Refunded) =>
            {
                self.reconcile_state(swap, SwapState::Refunded, "every lock refunded");
            }
            _ => {}
        }
    }

    async fn place_lock(&self, id: &SwapId, leg: Leg) -> Result<Swap, SwapError> {
        let mut swap = self.registry.require(id)?;
        let next = match leg {
            Leg::Source => SwapState::SourceLocked,
            Leg::Dest => SwapState::DestLocked,
        };
        Self::guard(&swap, next)?;

        let timelock = match leg {
            Leg::Source => swap.timelock_source,
            Leg::Dest => swap.timelock_dest,
        };
        let now = self.clock.now();
        if now >= timelock {
            return Err(SwapError::Expired { timelock, now });
        }

        let adapter = self.adapter(swap.chain(leg));
        let request = match leg {
            Leg::Source => LockRequest {
                sender: swap.sender.clone(),
                receiver: adapter.relayer_account().to_string(),
                asset: swap.from_asset.clone(),
                amount: swap.amount.clone(),
                hashlock: swap.hashlock,
                timelock,
            },
            Leg::Dest => LockRequest {
                sender: adapter.relayer_account().to_string(),
                receiver: swap.receiver.clone(),
                asset: swap.to_asset.clone(),
                amount: swap.amount.clone(),
                hashlock: swap.hashlock,
                timelock,
            },
        };

        match adapter.create_lock(&request).await {
            Ok(lock) => {
                info!(swap_id = %id, ?leg, lock_id = %lock.lock_id, "[htlc] Lock placed");
                match leg {
                    Leg::Source => swap.source_lock = Some(lock),
                    Leg::Dest => swap.dest_lock = Some(lock),
                }
                self.advance(&mut swap, next, None)?;
                self.registry.put(swap.clone());
                Ok(swap)
            }
            Err(err) => {
                self.fail(&mut swap, format!("{leg:?} lock failed: {err}"));
                self.registry.put(swap);
                Err(err)
            }
        }
    }

    async fn do_claim_destination(&self, id: &SwapId, preimage_hex: &str) -> Result<TxRef, SwapError> {
        let mut swap = self.registry.require(id)?;
        Self::guard(&swap, SwapState::DestClaimed)?;

        let preimage = Preimage::from_hex(preimage_hex)?;
        if !verify_secret(preimage.as_bytes(), &swap.hashlock) {
            warn!(swap_id = %id, "[htlc] Rejected preimage that does not match hashlock");
            return Err(SwapError::HashlockMismatch);
        }

        let now = self.clock.now();
        if now >= swap.timelock_dest {
            return Err(SwapError::Expired {
                timelock: swap.timelock_dest,
                now,
            });
        }

        let lock = Self::required_lock(&swap, Leg::Dest)?;
        match self.adapter(swap.dest_chain()).claim(&lock, &preimage).await {
            Ok(tx) => {
                Self::apply_lock_status(&mut swap, Leg::Dest, LockStatus::Claimed, Some(tx.clone()));
                swap.preimage = Some(preimage);
                self.advance(&mut swap, SwapState::DestClaimed, None)?;
                self.registry.put(swap);
                Ok(tx)
            }
            Err(SwapError::AlreadyResolved { lock_id, status }) => {
                Self::apply_lock_status(&mut swap, Leg::Dest, status, None);
                self.reconcile(&mut swap);
                self.registry.put(swap);
                Err(SwapError::AlreadyResolved { lock_id, status })
            }
            Err(
                err @ SwapError::Chain {
                    reason: ChainRejection::TimelockReached | ChainRejection::PredicateNotSatisfied,
                    ..
                },
            ) => {
                // The ledger judged the deadline passed while the claim was in flight.
                let now = self.clock.now();
                let cause = format!("destination claim rejected: {err}");
                warn!(swap_id = %id, error = %err, "[htlc] Destination claim missed its deadline");
                self.advance(&mut swap, SwapState::Expired, Some(cause.clone()))?;
                swap.failure_cause = Some(cause);
                self.registry.put(swap.clone());
                Err(SwapError::Expired {
                    timelock: swap.timelock_dest,
                    now,
                })
            }
            Err(err) if err.is_transient() => {
                // The claim may still have landed; status polls settle it either way.
                warn!(swap_id = %id, error = %err, "[htlc] Destination claim failed; lock still live");
                swap.failure_cause = Some(format!("destination claim failed: {err}"));
                swap.updated_at = self.clock.now();
                self.registry.put(swap);
                Err(err)
            }
            Err(err) => {
                self.fail(&mut swap, format!("destination claim failed: {err}"));
                self.registry.put(swap);
                Err(err)
            }
        }
    }

    async fn do_claim_source(&self, id: &SwapId) -> Result<TxRef, SwapError> {
        let mut swap = self.registry.require(id)?;
        Self::guard(&swap, SwapState::Completed)?;

        let now = self.clock.now();
        if now >= swap.timelock_source {
            return Err(SwapError::Expired {
                timelock: swap.timelock_source,
                now,
            });
        }

        let preimage = swap
            .preimage
            .clone()
            .or_else(|| self.vault.get(id))
            .ok_or_else(|| SwapError::Validation(format!("no preimage for swap {id}")))?;
        let lock = Self::required_lock(&swap, Leg::Source)?;

        match self.adapter(swap.source_chain()).claim(&lock, &preimage).await {
            Ok(tx) => {
                Self::apply_lock_status(&mut swap, Leg::Source, LockStatus::Claimed, Some(tx.clone()));
                self.advance(&mut swap, SwapState::Completed, None)?;
                self.registry.put(swap);
                Ok(tx)
            }
            Err(SwapError::AlreadyResolved { lock_id, status }) => {
                Self::apply_lock_status(&mut swap, Leg::Source, status, None);
                self.reconcile(&mut swap);
                self.registry.put(swap);
                Err(SwapError::AlreadyResolved { lock_id, status })
            }
            Err(err) if err.is_transient() => {
                // Preimage is public; the claim stays available until the source timelock.
                warn!(swap_id = %id, error = %err, "[htlc] Source claim failed; will retry");
                swap.failure_cause = Some(format!("source claim failed: {err}"));
                swap.updated_at = now;
                self.registry.put(swap);
                Err(err)
            }
            Err(err) => {
                self.fail(&mut swap, format!("source claim failed: {err}"));
                self.registry.put(swap);
                Err(err)
            }
        }
    }

    async fn do_refund(&self, id: &SwapId) -> Result<RefundReceipt, SwapError> {
        let mut swap = self.registry.require(id)?;
        let now = self.clock.now();

        if swap.state == SwapState::Refunded {
            return Ok(RefundReceipt::from_swap(&swap));
        }
        let refunding_to = SwapState::Refunding;
        if swap.state == SwapState::Completed {
            return Err(SwapError::InvalidTransition {
                from: swap.state,
                to: refunding_to,
            });
        }
        if !swap.has_refundable_lock(now) {
            let settled_failure = swap.state == SwapState::Failed
                && swap.outstanding_locks().next().is_none()
                && Leg::BOTH
                    .iter()
                    .any(|leg| swap.lock(*leg).map(|l| l.status) == Some(LockStatus::Refunded));
            if settled_failure {
                return Ok(RefundReceipt::from_swap(&swap));
            }
            return Err(SwapError::InvalidTransition {
                from: swap.state,
                to: refunding_to,
            });
        }

        if swap.state != SwapState::Failed {
            if swap.state.can_transition_to(SwapState::Expired) {
                self.advance(&mut swap, SwapState::Expired, None)?;
            }
            if swap.state == SwapState::Expired {
                self.advance(&mut swap, SwapState::Refunding, None)?;
            }
        }

        let mut first_error = None;
        for leg in Leg::BOTH {
            let lock = match swap.lock(leg) {
                Some(lock) if lock.is_outstanding() && lock.is_expired(now) => lock.clone(),
                _ => continue,
            };
            match self.adapter(swap.chain(leg)).refund(&lock).await {
                Ok(tx) => {
                    info!(swap_id = %id, ?leg, tx = %tx, "[htlc] Lock refunded");
                    Self::apply_lock_status(&mut swap, leg, LockStatus::Refunded, Some(tx));
                }
                Err(SwapError::AlreadyResolved { status, .. }) if status.is_resolved() => {
                    Self::apply_lock_status(&mut swap, leg, status, None);
                }
                Err(err) => {
                    warn!(swap_id = %id, ?leg, error = %err, "[htlc] Refund failed; will retry");
                    swap.failure_cause = Some(format!("{leg:?} refund failed: {err}"));
                    swap.updated_at = self.clock.now();
                    first_error.get_or_insert(err);
                }
            }
        }

        self.reconcile(&mut swap);
        self.registry.put(swap.clone());

        match first_error {
            Some(err) => Err(err),
            None => Ok(RefundReceipt::from_swap(&swap)),
        }
    }

    async fn do_get_status(&self, id: &SwapId) -> Result<Swap, SwapError> {
        let mut swap = self.registry.require(id)?;

        for leg in Leg::BOTH {
            let lock = match swap.lock(leg) {
                Some(lock) if lock.is_outstanding() => lock.clone(),
                _ => continue,
            };
            match self.adapter(lock.chain).get_status(&lock).await {
                Ok(LockStatus::Unknown) => {
                    warn!(swap_id = %id, ?leg, lock_id = %lock.lock_id, "[htlc] Lock status unknown");
                }
                Ok(status) if status != lock.status => {
                    info!(swap_id = %id, ?leg, from = %lock.status, to = %status, "[htlc] Lock status drift");
                    Self::apply_lock_status(&mut swap, leg, status, None);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(swap_id = %id, ?leg, error = %err, "[htlc] Status poll failed");
                }
            }
        }

        self.reconcile(&mut swap);
        self.registry.put(swap.clone());
        Ok(swap)
    }
}

#[async_trait]
impl SwapApi for SwapOrchestrator {
    async fn initiate_swap(&self, request: SwapRequest) -> Result<Swap, SwapError> {
        let (swap, preimage) = create_swap(&request, self.clock.now(), &self.config)?;
        self.registry.insert_new(swap.clone())?;
        self.vault.store(swap.id.clone(), preimage);
        self.metrics.record_initiated(swap.direction);
        info!(
            swap_id = %swap.id,
            direction = swap.direction.label(),
            amount = swap.amount.as_str(),
            timelock_source = swap.timelock_source,
            timelock_dest = swap.timelock_dest,
            "[htlc] Swap initiated"
        );
        Ok(swap)
    }

    async fn lock_source(&self, id: &SwapId) -> Result<Swap, SwapError> {
        self.registry
            .with_lock(id, move || self.place_lock(id, Leg::Source))
            .await
    }

    async fn lock_destination(&self, id: &SwapId) -> Result<Swap, SwapError> {
        self.registry
            .with_lock(id, move || self.place_lock(id, Leg::Dest))
            .await
    }

    async fn claim_destination(&self, id: &SwapId, preimage_hex: &str) -> Result<TxRef, SwapError> {
        self.registry
            .with_lock(id, move || self.do_claim_destination(id, preimage_hex))
            .await
    }

    async fn claim_source(&self, id: &SwapId) -> Result<TxRef, SwapError> {
        self.registry
            .with_lock(id, move || self.do_claim_source(id))
            .await
    }

    async fn request_refund(&self, id: &SwapId) -> Result<RefundReceipt, SwapError> {
        self.registry
            .with_lock(id, move || self.do_refund(id))
            .await
    }

    async fn get_status(&self, id: &SwapId) -> Result<Swap, SwapError> {
        self.registry
            .with_lock(id, move || self.do_get_status(id))
            .await
    }

    async fn get_preimage(&self, id: &SwapId, access: PreimageAccess) -> Result<Preimage, SwapError> {
        let swap = self.registry.require(id)?;
        match access {
            PreimageAccess::Relayer => self
                .vault
                .get(id)
                .ok_or_else(|| SwapError::SwapNotFound(id.to_string())),
            PreimageAccess::Public => swap.preimage.ok_or(SwapError::PreimageWithheld(swap.state)),
        }
    }

    fn active_swaps(&self) -> Vec<Swap> {
        self.registry
            .list()
            .into_iter()
            .filter(|s| !s.state.is_terminal())
            .collect()
    }
}
