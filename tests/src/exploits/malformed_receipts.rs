//! # Malformed Receipts
//!
//! A gateway that reports success without the lock it claims to have made.
//! The coordinator must fail the swap instead of recording a lock id it never
//! saw on chain.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use async_trait::async_trait;
    use htlc_coordinator::adapters::{created_balance_id, created_lock_id};
    use htlc_coordinator::ports::{
        BalanceRecord, ClaimRecord, ClaimableBalanceLedger, CreateBalanceOp, EscrowEvent,
        EscrowReceipt, EscrowRecord, EscrowRpc, LedgerCallError, LedgerTxResult, OperationResult,
    };
    use htlc_coordinator::{
        Amount, ChainKind, ChainRejection, ClaimableBalanceAdapter, EscrowAdapter, Hashlock,
        InMemoryClaimableLedger, InMemoryEscrowChain, LockRequest, MockTimeSource, Preimage,
        SwapApi, SwapConfig, SwapError, SwapOrchestrator, SwapState,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Escrow gateway that mines `createEscrow` but returns `events`.
    struct LyingEscrow {
        events: Vec<EscrowEvent>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EscrowRpc for LyingEscrow {
        async fn create_escrow(
            &self,
            _sender: &str,
            _receiver: &str,
            _hashlock: &Hashlock,
            _timelock: u64,
            _value: u128,
        ) -> Result<EscrowReceipt, LedgerCallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(EscrowReceipt {
                tx_hash: format!("0x{}", hex::encode([0xee; 32])),
                events: self.events.clone(),
            })
        }

        async fn claim(&self, _lock_id: &str, _preimage: &Preimage) -> Result<EscrowReceipt, LedgerCallError> {
            Err(LedgerCallError::Transport("unreachable".into()))
        }

        async fn refund(&self, _lock_id: &str) -> Result<EscrowReceipt, LedgerCallError> {
            Err(LedgerCallError::Transport("unreachable".into()))
        }

        async fn get_escrow(&self, _lock_id: &str) -> Result<Option<EscrowRecord>, LedgerCallError> {
            Ok(None)
        }
    }

    /// Ledger gateway that accepts every transaction with `results`.
    struct LyingLedger {
        results: Vec<OperationResult>,
    }

    #[async_trait]
    impl ClaimableBalanceLedger for LyingLedger {
        async fn create_claimable_balance(
            &self,
            _op: &CreateBalanceOp,
        ) -> Result<LedgerTxResult, LedgerCallError> {
            Ok(LedgerTxResult {
                tx_hash: hex::encode([0xdd; 32]),
                operation_results: self.results.clone(),
            })
        }

        async fn claim_claimable_balance(
            &self,
            _claimant: &str,
            _balance_id: &str,
            _preimage: Option<&Preimage>,
        ) -> Result<LedgerTxResult, LedgerCallError> {
            Err(LedgerCallError::Transport("unreachable".into()))
        }

        async fn get_claimable_balance(
            &self,
            _balance_id: &str,
        ) -> Result<Option<BalanceRecord>, LedgerCallError> {
            Ok(None)
        }

        async fn get_claim_operation(
            &self,
            _balance_id: &str,
        ) -> Result<Option<ClaimRecord>, LedgerCallError> {
            Ok(None)
        }
    }

    fn orchestrator(
        escrow: Arc<dyn EscrowRpc>,
        ledger: Arc<dyn ClaimableBalanceLedger>,
        clock: Arc<MockTimeSource>,
    ) -> SwapOrchestrator {
        SwapOrchestrator::new(
            Arc::new(EscrowAdapter::new(escrow, ETH_RELAYER, fast_retry())),
            Arc::new(ClaimableBalanceAdapter::new(ledger, XLM_RELAYER, fast_retry())),
            clock,
            SwapConfig::default(),
        )
        .unwrap()
    }

    fn lock_request(hashlock: Hashlock) -> LockRequest {
        LockRequest {
            sender: ETH_USER.into(),
            receiver: ETH_RELAYER.into(),
            asset: "ETH".into(),
            amount: Amount::parse("1").unwrap(),
            hashlock,
            timelock: T0 + 3_600,
        }
    }

    fn is_malformed(err: &SwapError, expected: ChainKind) -> bool {
        matches!(
            err,
            SwapError::Chain {
                chain,
                reason: ChainRejection::MalformedResult(_),
            } if *chain == expected
        )
    }

    #[tokio::test]
    async fn test_escrow_receipt_without_created_event_fails_swap() {
        let clock = Arc::new(MockTimeSource::new(T0));
        let escrow = Arc::new(LyingEscrow {
            events: Vec::new(),
            calls: AtomicUsize::new(0),
        });
        let ledger = Arc::new(InMemoryClaimableLedger::new(clock.clone()));
        let orch = orchestrator(escrow.clone(), ledger.clone(), clock);

        let swap = orch.initiate_swap(a_to_b()).await.unwrap();
        let err = orch.lock_source(&swap.id).await.unwrap_err();
        assert!(is_malformed(&err, ChainKind::Escrow), "got {err:?}");
        assert!(!err.is_transient());
        assert_eq!(escrow.calls.load(Ordering::SeqCst), 1);

        let stored = orch.registry().get(&swap.id).unwrap();
        assert_eq!(stored.state, SwapState::Failed);
        assert!(stored.source_lock.is_none());
        assert!(stored.failure_cause.is_some());
        assert_eq!(ledger.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_created_event_for_foreign_hashlock_ignored() {
        let clock = Arc::new(MockTimeSource::new(T0));
        let escrow = Arc::new(LyingEscrow {
            events: vec![EscrowEvent::Created {
                lock_id: format!("0x{}", hex::encode([0x11; 32])),
                sender: ETH_USER.into(),
                receiver: ETH_RELAYER.into(),
                amount: 1_000_000_000_000_000_000,
                hashlock: Hashlock::new([0x22; 32]),
                timelock: T0 + 3_600,
            }],
            calls: AtomicUsize::new(0),
        });
        let ledger = Arc::new(InMemoryClaimableLedger::new(clock.clone()));
        let orch = orchestrator(escrow, ledger, clock);

        let swap = orch.initiate_swap(a_to_b()).await.unwrap();
        let err = orch.lock_source(&swap.id).await.unwrap_err();
        assert!(is_malformed(&err, ChainKind::Escrow), "got {err:?}");
        assert!(orch.registry().get(&swap.id).unwrap().source_lock.is_none());
    }

    #[tokio::test]
    async fn test_ledger_result_without_balance_id_fails_swap() {
        let clock = Arc::new(MockTimeSource::new(T0));
        let escrow = Arc::new(InMemoryEscrowChain::new(clock.clone()));
        let ledger = Arc::new(LyingLedger {
            results: vec![OperationResult::ClaimClaimableBalance],
        });
        let orch = orchestrator(escrow.clone(), ledger, clock);

        let swap = orch.initiate_swap(b_to_a()).await.unwrap();
        let err = orch.lock_source(&swap.id).await.unwrap_err();
        assert!(is_malformed(&err, ChainKind::ClaimableBalance), "got {err:?}");

        let stored = orch.registry().get(&swap.id).unwrap();
        assert_eq!(stored.state, SwapState::Failed);
        assert!(stored.source_lock.is_none());
        assert_eq!(escrow.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_operation_code_is_a_rejection() {
        let clock = Arc::new(MockTimeSource::new(T0));
        let escrow = Arc::new(InMemoryEscrowChain::new(clock.clone()));
        let ledger = Arc::new(LyingLedger {
            results: vec![OperationResult::Failed {
                code: "op_underfunded".into(),
            }],
        });
        let orch = orchestrator(escrow, ledger, clock);

        let swap = orch.initiate_swap(b_to_a()).await.unwrap();
        let err = orch.lock_source(&swap.id).await.unwrap_err();
        assert!(matches!(
            err,
            SwapError::Chain {
                chain: ChainKind::ClaimableBalance,
                reason: ChainRejection::Underfunded,
            }
        ));
        assert_eq!(orch.registry().get(&swap.id).unwrap().state, SwapState::Failed);
    }

    #[test]
    fn test_lock_id_extraction() {
        let hashlock = Hashlock::new([0x33; 32]);
        let request = lock_request(hashlock);
        let receipt = EscrowReceipt {
            tx_hash: "0xabc".into(),
            events: vec![
                EscrowEvent::Refunded {
                    lock_id: "0xold".into(),
                },
                EscrowEvent::Created {
                    lock_id: "0xnew".into(),
                    sender: ETH_USER.into(),
                    receiver: ETH_RELAYER.into(),
                    amount: 1,
                    hashlock,
                    timelock: request.timelock,
                },
            ],
        };
        assert_eq!(created_lock_id(&receipt, &request).unwrap(), "0xnew");

        let empty = EscrowReceipt {
            tx_hash: "0xabc".into(),
            events: Vec::new(),
        };
        let err = created_lock_id(&empty, &request).unwrap_err();
        assert!(is_malformed(&err, ChainKind::Escrow));
    }

    #[test]
    fn test_balance_id_extraction() {
        let ok = LedgerTxResult {
            tx_hash: "t1".into(),
            operation_results: vec![OperationResult::CreateClaimableBalance {
                balance_id: "00000000ff".into(),
            }],
        };
        assert_eq!(created_balance_id(&ok).unwrap(), "00000000ff");

        let empty = LedgerTxResult {
            tx_hash: "t2".into(),
            operation_results: Vec::new(),
        };
        assert!(is_malformed(&created_balance_id(&empty).unwrap_err(), ChainKind::ClaimableBalance));
    }
}
