//! # Double Spend
//!
//! Each lock moves funds at most once, whichever way it resolves and however
//! often the resolution is requested.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use htlc_coordinator::{LockStatus, SwapApi, SwapError, SwapState};

    #[tokio::test]
    async fn test_second_refund_is_a_no_op() {
        let h = Harness::new();
        let (swap, _) = h.locked(a_to_b()).await;
        h.set_time(swap.timelock_source);

        let first = h.orchestrator.request_refund(&swap.id).await.unwrap();
        assert_eq!(first.state, SwapState::Refunded);
        let escrow_calls = h.escrow.mutation_count();
        let ledger_calls = h.ledger.mutation_count();

        let second = h.orchestrator.request_refund(&swap.id).await.unwrap();
        assert_eq!(second.state, SwapState::Refunded);
        assert_eq!(second.source_tx, first.source_tx);
        assert_eq!(second.dest_tx, first.dest_tx);
        assert_eq!(h.escrow.mutation_count(), escrow_calls);
        assert_eq!(h.ledger.mutation_count(), ledger_calls);
    }

    #[tokio::test]
    async fn test_refund_after_completion_rejected() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        h.orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap();
        h.orchestrator.claim_source(&swap.id).await.unwrap();

        h.set_time(swap.timelock_source + 1);
        let err = h.orchestrator.request_refund(&swap.id).await.unwrap_err();
        assert!(matches!(
            err,
            SwapError::InvalidTransition {
                from: SwapState::Completed,
                to: SwapState::Refunding,
            }
        ));

        let escrow = h.escrow.record(&swap.source_lock.unwrap().lock_id).unwrap();
        assert!(escrow.claimed);
        assert!(!escrow.refunded);
    }

    #[tokio::test]
    async fn test_refund_before_deadline_rejected() {
        let h = Harness::new();
        let (swap, _) = h.locked(a_to_b()).await;
        h.set_time(swap.timelock_dest - 1);

        let err = h.orchestrator.request_refund(&swap.id).await.unwrap_err();
        assert!(matches!(
            err,
            SwapError::InvalidTransition {
                from: SwapState::DestLocked,
                ..
            }
        ));
        assert_eq!(h.stored(&swap).state, SwapState::DestLocked);
        assert_eq!(h.escrow.mutation_count(), 1);
        assert_eq!(h.ledger.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_claim_after_refund_rejected() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        h.set_time(swap.timelock_source);
        h.orchestrator.request_refund(&swap.id).await.unwrap();

        let err = h
            .orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::InvalidTransition { from: SwapState::Refunded, .. }));

        let stored = h.stored(&swap);
        assert!(stored.preimage.is_none());
        assert_eq!(stored.dest_lock.unwrap().status, LockStatus::Refunded);
    }

    #[tokio::test]
    async fn test_repeated_destination_claim_rejected() {
        let h = Harness::new();
        let (swap, preimage) = h.locked(a_to_b()).await;
        h.orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap();
        let ledger_calls = h.ledger.mutation_count();

        let err = h
            .orchestrator
            .claim_destination(&swap.id, &preimage.to_hex())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::InvalidTransition {
                from: SwapState::DestClaimed,
                to: SwapState::DestClaimed,
            }
        ));
        assert_eq!(h.ledger.mutation_count(), ledger_calls);
    }

    #[tokio::test]
    async fn test_guessed_preimage_never_reaches_ledger() {
        let h = Harness::new();
        let (swap, _) = h.locked(a_to_b()).await;

        let guess = hex::encode([0u8; 32]);
        let err = h.orchestrator.claim_destination(&swap.id, &guess).await.unwrap_err();
        assert!(matches!(err, SwapError::HashlockMismatch));
        assert_eq!(h.ledger.mutation_count(), 1);
        assert_eq!(h.stored(&swap).state, SwapState::DestLocked);
    }
}
