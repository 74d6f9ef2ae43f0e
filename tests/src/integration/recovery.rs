//! # Failure Recovery
//!
//! Transient ledger errors, retry exhaustion, and ledger activity the
//! coordinator did not initiate.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use htlc_coordinator::ports::{ClaimableBalanceLedger, EscrowRpc, LedgerCallError};
    use htlc_coordinator::{ChainRejection, LockStatus, PreimageAccess, SwapApi, SwapError, SwapState};

    fn transport() -> LedgerCallError {
        LedgerCallError::Transport("connection reset by peer".into())
    }

    #[tokio::test]
    async fn test_transient_lock_error_is_retried() {
        let h = Harness::new();
        let swap = h.orchestrator.initiate_swap(a_to_b()).await.unwrap();
        h.orchestrator.lock_source(&swap.id).await.unwrap();

        h.ledger.fail_next(1, transport());
        let swap = h.orchestrator.lock_destination(&swap.id).await.unwrap();
        assert_eq!(swap.state, SwapState::DestLocked);
        assert!(swap.dest_lock.unwrap().lock_id.starts_with("00000000"));
    }

    #[tokio::test]
    async fn test_retry_exhaustion_fails_swap_and_refunds_source() {
        let h = Harness::new();
        let swap = h.orchestrator.initiate_swap(a_to_b()).await.unwrap();
        h.orchestrator.lock_source(&swap.id).await.unwrap();

        h.ledger.fail_next(2, transport());
        let err = h.orchestrator.lock_destination(&swap.id).await.unwrap_err();
        assert!(err.is_transient());

        let failed = h.stored(&swap);
        assert_eq!(failed.state, SwapState::Failed);
        assert!(failed.dest_lock.is_none());
        assert!(failed.failure_cause.as_deref().unwrap().contains("lock failed"));

        // Nothing to refund until the source deadline.
        assert!(matches!(
            h.orchestrator.request_refund(&swap.id).await,
            Err(SwapError::InvalidTransition { .. })
        ));

        h.set_time(failed.timelock_source);
        let report = h.monitor.tick().await;
        assert_eq!(report.refunds, 1);

        let swap = h.stored(&swap);
        assert_eq!(swap.state, SwapState::Failed);
        assert_eq!(swap.source_lock.as_ref().unwrap().status, LockStatus::Refunded);

        // Settled failures answer refund requests with the recorded receipt.
        let receipt = h.orchestrator.request_refund(&swap.id).await.unwrap();
        assert_eq!(receipt.state, SwapState::Failed);
        assert!(receipt.source_tx.is_some());
    }

    #[tokio::test]
    async fn test_transient_dest_claim_then_ledger_claim_completes() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;

        h.ledger.fail_next(2, transport());
        let err = h
            .orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        let stuck = h.stored(&swap);
        assert_eq!(stuck.state, SwapState::DestLocked);
        assert!(stuck.failure_cause.as_deref().unwrap().contains("destination claim failed"));

        // The receiver claims anyway with the preimage the relayer handed out.
        let balance_id = swap.dest_lock.as_ref().unwrap().lock_id.clone();
        h.ledger
            .claim_claimable_balance(XLM_USER, &balance_id, Some(&preimage))
            .await
            .unwrap();

        let report = h.monitor.tick().await;
        assert_eq!(report.polls, 1);
        assert_eq!(h.stored(&swap).state, SwapState::DestClaimed);

        let report = h.monitor.tick().await;
        assert_eq!(report.source_claims, 1);
        let done = h.stored(&swap);
        assert_eq!(done.state, SwapState::Completed);
        assert_eq!(done.source_lock.as_ref().unwrap().status, LockStatus::Claimed);
    }

    #[tokio::test]
    async fn test_rejected_dest_claim_then_ledger_claim_completes() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;

        h.ledger
            .fail_next(1, LedgerCallError::Rejected(ChainRejection::Underfunded));
        h.orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap_err();
        assert_eq!(h.stored(&swap).state, SwapState::Failed);

        let balance_id = swap.dest_lock.as_ref().unwrap().lock_id.clone();
        h.ledger
            .claim_claimable_balance(XLM_USER, &balance_id, Some(&preimage))
            .await
            .unwrap();

        // A failed swap with both locks live is still polled.
        let report = h.monitor.tick().await;
        assert_eq!(report.polls, 1);
        assert_eq!(h.stored(&swap).state, SwapState::DestClaimed);

        h.orchestrator.claim_source(&swap.id).await.unwrap();
        assert_eq!(h.stored(&swap).state, SwapState::Completed);
    }

    #[tokio::test]
    async fn test_counterparty_claim_is_reconciled() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        let balance_id = swap.dest_lock.as_ref().unwrap().lock_id.clone();

        // Receiver claims on the ledger directly.
        h.ledger
            .claim_claimable_balance(XLM_USER, &balance_id, Some(&preimage))
            .await
            .unwrap();

        let swap = h.orchestrator.get_status(&swap.id).await.unwrap();
        assert_eq!(swap.state, SwapState::DestClaimed);
        assert_eq!(swap.dest_lock.as_ref().unwrap().status, LockStatus::Claimed);
        let public = h
            .orchestrator
            .get_preimage(&swap.id, PreimageAccess::Public)
            .await
            .unwrap();
        assert_eq!(public.to_hex(), preimage.to_hex());

        let report = h.monitor.tick().await;
        assert_eq!(report.source_claims, 1);
        assert_eq!(h.stored(&swap).state, SwapState::Completed);
    }

    #[tokio::test]
    async fn test_claim_after_counterparty_claim_reports_already_resolved() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        let balance_id = swap.dest_lock.as_ref().unwrap().lock_id.clone();
        h.ledger
            .claim_claimable_balance(XLM_USER, &balance_id, Some(&preimage))
            .await
            .unwrap();

        let err = h
            .orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::AlreadyResolved {
                status: LockStatus::Claimed,
                ..
            }
        ));
        assert_eq!(h.stored(&swap).state, SwapState::DestClaimed);
    }

    #[tokio::test]
    async fn test_transient_source_claim_retried_by_monitor() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        h.orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap();

        h.escrow.fail_next(2, transport());
        let err = h.orchestrator.claim_source(&swap.id).await.unwrap_err();
        assert!(err.is_transient());
        let stuck = h.stored(&swap);
        assert_eq!(stuck.state, SwapState::DestClaimed);
        assert!(stuck.failure_cause.is_some());

        let report = h.monitor.tick().await;
        assert_eq!(report.source_claims, 1);
        assert_eq!(h.stored(&swap).state, SwapState::Completed);
    }

    #[tokio::test]
    async fn test_failed_status_poll_changes_nothing() {
        let h = Harness::new();
        let (swap, _) = h.locked(a_to_b()).await;

        h.ledger.fail_next(4, transport());
        let polled = h.orchestrator.get_status(&swap.id).await.unwrap();
        assert_eq!(polled.state, SwapState::DestLocked);
        assert_eq!(polled.dest_lock.unwrap().status, LockStatus::Locked);
    }

    #[tokio::test]
    async fn test_external_refund_observed_then_finished_by_monitor() {
        let h = Harness::new();
        let (swap, _) = h.locked(a_to_b()).await;
        h.set_time(swap.timelock_source + 1);

        // Someone else refunds the escrow lock first.
        let escrow_id = swap.source_lock.as_ref().unwrap().lock_id.clone();
        EscrowRpc::refund(h.escrow.as_ref(), &escrow_id).await.unwrap();

        let polled = h.orchestrator.get_status(&swap.id).await.unwrap();
        assert_eq!(polled.source_lock.as_ref().unwrap().status, LockStatus::Refunded);
        assert_eq!(polled.state, SwapState::DestLocked);

        let report = h.monitor.tick().await;
        assert_eq!(report.refunds, 1);
        let swap = h.stored(&swap);
        assert_eq!(swap.state, SwapState::Refunded);
        assert_eq!(swap.dest_lock.as_ref().unwrap().status, LockStatus::Refunded);
    }
}
