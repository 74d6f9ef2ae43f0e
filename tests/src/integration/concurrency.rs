//! # Concurrency
//!
//! Mutations on one swap are serialized; mutations on different swaps run in
//! parallel. Whatever the interleaving, each lock is resolved on chain at most
//! once.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use htlc_coordinator::{ExpiryMonitor, LockStatus, SwapApi, SwapError, SwapState};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_claim_racing_deadline_and_monitor_moves_funds_once() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        let before = h.ledger.mutation_count();
        h.set_time(swap.timelock_dest - 1);
        h.ledger.set_latency(Duration::from_millis(100));

        let claim = {
            let orchestrator = h.orchestrator.clone();
            let id = swap.id.clone();
            let hex = preimage.to_hex();
            tokio::spawn(async move { orchestrator.claim_destination(&id, &hex).await })
        };

        // Deadline passes while the claim is in flight; the monitor wants to refund.
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.set_time(swap.timelock_dest + 1);
        let report = h.monitor.tick().await;
        let claim = claim.await.unwrap();

        let stored = h.stored(&swap);
        let dest = stored.dest_lock.as_ref().unwrap();
        let record = h.ledger.claim_record(&dest.lock_id).unwrap();
        // The source lock is not expired yet and must still be live.
        assert_eq!(stored.source_lock.as_ref().unwrap().status, LockStatus::Locked);

        if record.claimant == XLM_USER {
            assert!(claim.is_ok());
            assert_eq!(dest.status, LockStatus::Claimed);
            assert_eq!(h.monitor.tick().await.source_claims, 1);
            assert_eq!(h.stored(&swap).state, SwapState::Completed);
        } else {
            assert_eq!(record.claimant, XLM_RELAYER);
            assert!(matches!(claim, Err(SwapError::Expired { .. })));
            assert_eq!(report.refunds, 1);
            assert_eq!(dest.status, LockStatus::Refunded);
            assert_eq!(stored.state, SwapState::Refunding);

            h.set_time(swap.timelock_source);
            assert_eq!(h.monitor.tick().await.refunds, 1);
            let settled = h.stored(&swap);
            assert_eq!(settled.state, SwapState::Refunded);
            assert_eq!(settled.source_lock.as_ref().unwrap().status, LockStatus::Refunded);
        }
        assert_eq!(h.ledger.mutation_count(), before + 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dest_claim_rejected_at_deadline_ends_refunded() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        h.set_time(swap.timelock_dest - 1);
        h.ledger.set_latency(Duration::from_millis(100));

        let claim = {
            let orchestrator = h.orchestrator.clone();
            let id = swap.id.clone();
            let hex = preimage.to_hex();
            tokio::spawn(async move { orchestrator.claim_destination(&id, &hex).await })
        };
        // The ledger sees the claim only after the deadline.
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.set_time(swap.timelock_dest + 1);
        let claim = claim.await.unwrap();

        assert!(matches!(claim, Err(SwapError::Expired { .. })));
        let expired = h.stored(&swap);
        assert_eq!(expired.state, SwapState::Expired);
        assert_eq!(expired.dest_lock.as_ref().unwrap().status, LockStatus::Locked);
        assert!(expired.failure_cause.is_some());

        h.ledger.set_latency(Duration::ZERO);
        h.set_time(swap.timelock_source + 1);
        let report = h.monitor.tick().await;
        assert_eq!(report.refunds, 2);
        assert_eq!(report.errors, 0);

        let settled = h.stored(&swap);
        assert_eq!(settled.state, SwapState::Refunded);
        assert_eq!(settled.source_lock.as_ref().unwrap().status, LockStatus::Refunded);
        assert_eq!(settled.dest_lock.as_ref().unwrap().status, LockStatus::Refunded);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_refund_waits_for_inflight_claim() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        let before = h.ledger.mutation_count();
        h.ledger.set_latency(Duration::from_millis(100));

        let claim = {
            let orchestrator = h.orchestrator.clone();
            let id = swap.id.clone();
            let hex = preimage.to_hex();
            tokio::spawn(async move { orchestrator.claim_destination(&id, &hex).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let refund = h.orchestrator.request_refund(&swap.id).await;
        let claim = claim.await.unwrap();

        assert!(claim.is_ok());
        assert!(matches!(
            refund,
            Err(SwapError::InvalidTransition {
                from: SwapState::DestClaimed,
                to: SwapState::Refunding
            })
        ));
        assert_eq!(h.ledger.mutation_count(), before + 1);
        assert_eq!(h.stored(&swap).state, SwapState::DestClaimed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_refunds_move_funds_once() {
        let h = Harness::new();
        let (swap, _) = h.locked(a_to_b()).await;
        let escrow_before = h.escrow.mutation_count();
        let ledger_before = h.ledger.mutation_count();
        h.escrow.set_latency(Duration::from_millis(10));
        h.ledger.set_latency(Duration::from_millis(10));
        h.set_time(swap.timelock_source + 1);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let orchestrator = h.orchestrator.clone();
            let id = swap.id.clone();
            handles.push(tokio::spawn(async move { orchestrator.request_refund(&id).await }));
        }
        let monitor = ExpiryMonitor::new(h.orchestrator.clone());
        let tick = tokio::spawn(async move { monitor.tick().await });

        for handle in handles {
            let receipt = handle.await.unwrap().unwrap();
            assert_eq!(receipt.state, SwapState::Refunded);
            assert!(receipt.source_tx.is_some());
            assert!(receipt.dest_tx.is_some());
        }
        assert_eq!(tick.await.unwrap().errors, 0);

        assert_eq!(h.escrow.mutation_count(), escrow_before + 1);
        assert_eq!(h.ledger.mutation_count(), ledger_before + 1);
        assert_eq!(h.stored(&swap).state, SwapState::Refunded);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_independent_swaps_complete_in_parallel() {
        let h = Harness::new();
        h.escrow.set_latency(Duration::from_millis(5));
        h.ledger.set_latency(Duration::from_millis(5));

        let mut handles = Vec::new();
        for i in 0..8 {
            let orchestrator = h.orchestrator.clone();
            let mut request = if i % 2 == 0 { a_to_b() } else { b_to_a() };
            request.id = Some(format!("swap-{i}"));
            handles.push(tokio::spawn(async move {
                let swap = orchestrator.initiate_swap(request).await?;
                orchestrator.lock_source(&swap.id).await?;
                orchestrator.lock_destination(&swap.id).await?;
                let preimage = orchestrator
                    .get_preimage(&swap.id, htlc_coordinator::PreimageAccess::Relayer)
                    .await?;
                orchestrator.claim_destination(&swap.id, &preimage.to_hex()).await?;
                orchestrator.claim_source(&swap.id).await?;
                orchestrator.get_status(&swap.id).await
            }));
        }

        for handle in handles {
            let swap = handle.await.unwrap().unwrap();
            assert_eq!(swap.state, SwapState::Completed);
        }
        // One create and one claim per swap on each ledger.
        assert_eq!(h.escrow.mutation_count(), 16);
        assert_eq!(h.ledger.mutation_count(), 16);
        assert!(h.orchestrator.active_swaps().is_empty());
        assert_eq!(h.orchestrator.registry().stats().total, 8);
    }
}
