//! # End-to-End Scenarios
//!
//! 1. Happy path: lock both legs, claim destination, claim source, COMPLETED
//! 2. Nobody claims: the monitor refunds both legs once the timelocks pass
//! 3. Wrong preimage: rejected without side effects, correct one succeeds

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use htlc_coordinator::{
        LockStatus, PreimageAccess, SwapApi, SwapError, SwapState, DEFAULT_SAFETY_MARGIN_SECS,
    };

    // =============================================================================
    // SCENARIO 1: HAPPY PATH
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_happy_path_a_to_b() {
        let h = Harness::new();
        let swap = h.orchestrator.initiate_swap(a_to_b()).await.unwrap();
        assert_eq!(swap.state, SwapState::Init);
        assert_eq!(swap.timelock_source, T0 + 3_600);
        assert_eq!(swap.timelock_dest, T0 + 1_800);
        assert!(swap.timelock_source - swap.timelock_dest >= DEFAULT_SAFETY_MARGIN_SECS);

        let swap = h.orchestrator.lock_source(&swap.id).await.unwrap();
        assert_eq!(swap.state, SwapState::SourceLocked);
        let swap = h.orchestrator.lock_destination(&swap.id).await.unwrap();
        assert_eq!(swap.state, SwapState::DestLocked);

        let preimage = h
            .orchestrator
            .get_preimage(&swap.id, PreimageAccess::Relayer)
            .await
            .unwrap();
        h.orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap();
        h.orchestrator.claim_source(&swap.id).await.unwrap();

        let swap = h.orchestrator.get_status(&swap.id).await.unwrap();
        assert_eq!(swap.state, SwapState::Completed);
        assert_eq!(swap.source_lock.as_ref().unwrap().status, LockStatus::Claimed);
        assert_eq!(swap.dest_lock.as_ref().unwrap().status, LockStatus::Claimed);

        let states: Vec<_> = swap.history.iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![
                SwapState::SourceLocked,
                SwapState::DestLocked,
                SwapState::DestClaimed,
                SwapState::Completed
            ]
        );

        // Receiver got the balance, relayer got the escrow.
        let balance_id = &swap.dest_lock.as_ref().unwrap().lock_id;
        assert_eq!(h.ledger.claim_record(balance_id).unwrap().claimant, XLM_USER);
        let escrow_id = &swap.source_lock.as_ref().unwrap().lock_id;
        assert!(h.escrow.record(escrow_id).unwrap().claimed);
    }

    #[tokio::test]
    async fn test_scenario_happy_path_b_to_a() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(b_to_a()).await;
        assert_eq!(swap.source_lock.as_ref().unwrap().receiver, XLM_RELAYER);
        assert_eq!(swap.dest_lock.as_ref().unwrap().sender, ETH_RELAYER);

        h.orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap();
        h.orchestrator.claim_source(&swap.id).await.unwrap();

        let swap = h.stored(&swap);
        assert_eq!(swap.state, SwapState::Completed);
        let balance_id = &swap.source_lock.as_ref().unwrap().lock_id;
        assert_eq!(h.ledger.claim_record(balance_id).unwrap().claimant, XLM_RELAYER);
    }

    #[tokio::test]
    async fn test_monitor_finishes_source_claim() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        h.orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap();

        let report = h.monitor.tick().await;
        assert_eq!(report.source_claims, 1);
        assert_eq!(h.stored(&swap).state, SwapState::Completed);
    }

    // =============================================================================
    // SCENARIO 2: EXPIRY REFUND
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_expiry_refunds_both_legs() {
        let h = Harness::new();
        let (swap, _) = h.locked(a_to_b()).await;

        // Nothing to do before the destination deadline.
        let report = h.monitor.tick().await;
        assert_eq!(report.refunds, 0);
        assert_eq!(report.polls, 1);
        assert_eq!(h.stored(&swap).state, SwapState::DestLocked);

        h.set_time(swap.timelock_dest);
        let report = h.monitor.tick().await;
        assert_eq!(report.refunds, 1);
        let mid = h.stored(&swap);
        assert_eq!(mid.state, SwapState::Refunding);
        assert_eq!(mid.dest_lock.as_ref().unwrap().status, LockStatus::Refunded);
        assert_eq!(mid.source_lock.as_ref().unwrap().status, LockStatus::Locked);

        h.set_time(swap.timelock_source + 1);
        let report = h.monitor.tick().await;
        assert_eq!(report.refunds, 1);

        let swap = h.orchestrator.get_status(&swap.id).await.unwrap();
        assert_eq!(swap.state, SwapState::Refunded);
        assert_eq!(swap.source_lock.as_ref().unwrap().status, LockStatus::Refunded);
        assert_eq!(swap.dest_lock.as_ref().unwrap().status, LockStatus::Refunded);

        // Funds went back to whoever locked them.
        let balance_id = &swap.dest_lock.as_ref().unwrap().lock_id;
        assert_eq!(h.ledger.claim_record(balance_id).unwrap().claimant, XLM_RELAYER);
        let escrow_id = &swap.source_lock.as_ref().unwrap().lock_id;
        assert!(h.escrow.record(escrow_id).unwrap().refunded);
    }

    #[tokio::test]
    async fn test_scenario_expiry_single_tick_past_both() {
        let h = Harness::new();
        let (swap, _) = h.locked(a_to_b()).await;

        h.set_time(swap.timelock_source + 10);
        let report = h.monitor.tick().await;
        assert_eq!(report.refunds, 2);
        assert_eq!(report.errors, 0);
        assert_eq!(h.stored(&swap).state, SwapState::Refunded);

        // Terminal swaps are left alone.
        assert!(h.monitor.tick().await.is_quiet());
    }

    #[tokio::test]
    async fn test_unlocked_swap_abandoned_after_deadline() {
        let h = Harness::new();
        let swap = h.orchestrator.initiate_swap(a_to_b()).await.unwrap();

        h.set_time(swap.timelock_source);
        let report = h.monitor.tick().await;
        assert_eq!(report.abandoned, 1);

        let swap = h.stored(&swap);
        assert_eq!(swap.state, SwapState::Failed);
        assert_eq!(h.escrow.mutation_count(), 0);
        assert_eq!(h.ledger.mutation_count(), 0);
    }

    // =============================================================================
    // SCENARIO 3: WRONG PREIMAGE
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_wrong_preimage_then_correct() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        let mutations = h.ledger.mutation_count();

        let err = h
            .orchestrator
            .claim_destination(&swap.id, &"ab".repeat(32))
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::HashlockMismatch));
        assert_eq!(h.stored(&swap).state, SwapState::DestLocked);
        assert_eq!(h.ledger.mutation_count(), mutations);

        h.orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap();
        assert_eq!(h.stored(&swap).state, SwapState::DestClaimed);
        assert_eq!(h.ledger.mutation_count(), mutations + 1);
    }

    #[tokio::test]
    async fn test_malformed_preimage_hex_rejected() {
        let h = Harness::new();
        let (swap, _) = h.locked(a_to_b()).await;

        let too_long = "00".repeat(33);
        for bad in ["", "zz", "abcd", too_long.as_str()] {
            let err = h.orchestrator.claim_destination(&swap.id, bad).await.unwrap_err();
            assert!(matches!(err, SwapError::Validation(_)), "{bad:?} gave {err}");
        }
        assert_eq!(h.stored(&swap).state, SwapState::DestLocked);
    }
}
