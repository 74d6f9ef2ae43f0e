//! Shared test harness.
//!
//! Both ledgers run in memory on one [`MockTimeSource`], so advancing the
//! clock moves the coordinator, the ledgers' predicate checks and the expiry
//! monitor together.

use htlc_coordinator::{
    ClaimableBalanceAdapter, Direction, EscrowAdapter, ExpiryMonitor, InMemoryClaimableLedger,
    InMemoryEscrowChain, MockTimeSource, Preimage, PreimageAccess, RetryPolicy, Swap, SwapApi,
    SwapConfig, SwapOrchestrator, SwapRequest,
};
use std::sync::Arc;
use std::time::Duration;

/// Harness start time.
pub const T0: u64 = 1_700_000_000;

/// Swap sender on the escrow chain.
pub const ETH_USER: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
/// Relayer on the escrow chain.
pub const ETH_RELAYER: &str = "0x8617E340B3D01FA5F11F306F4090FD50E238070D";
/// Swap receiver on the claimable-balance ledger.
pub const XLM_USER: &str = "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H";
/// Relayer on the claimable-balance ledger.
pub const XLM_RELAYER: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

/// One retry, no backoff.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_millis(500),
        max_retries: 1,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        jitter_ms: 0,
    }
}

/// Coordinator wired to in-memory ledgers.
pub struct Harness {
    /// Shared clock.
    pub clock: Arc<MockTimeSource>,
    /// Escrow-contract chain.
    pub escrow: Arc<InMemoryEscrowChain>,
    /// Claimable-balance ledger.
    pub ledger: Arc<InMemoryClaimableLedger>,
    /// Coordinator under test.
    pub orchestrator: Arc<SwapOrchestrator>,
    /// Monitor over `orchestrator`; drive it with [`ExpiryMonitor::tick`].
    pub monitor: ExpiryMonitor,
}

impl Harness {
    /// Harness with [`fast_retry`].
    pub fn new() -> Self {
        Self::with_retry(fast_retry())
    }

    /// Harness with a custom ledger call policy.
    pub fn with_retry(retry: RetryPolicy) -> Self {
        let clock = Arc::new(MockTimeSource::new(T0));
        let escrow = Arc::new(InMemoryEscrowChain::new(clock.clone()));
        let ledger = Arc::new(InMemoryClaimableLedger::new(clock.clone()));
        let config = SwapConfig {
            retry: retry.clone(),
            ..SwapConfig::default()
        };
        let orchestrator = Arc::new(
            SwapOrchestrator::new(
                Arc::new(EscrowAdapter::new(escrow.clone(), ETH_RELAYER, retry.clone())),
                Arc::new(ClaimableBalanceAdapter::new(ledger.clone(), XLM_RELAYER, retry)),
                clock.clone(),
                config,
            )
            .expect("adapters match their chains"),
        );
        let monitor = ExpiryMonitor::new(orchestrator.clone());
        Self {
            clock,
            escrow,
            ledger,
            orchestrator,
            monitor,
        }
    }

    /// Jump the shared clock to `time`.
    pub fn set_time(&self, time: u64) {
        self.clock.set(time);
    }

    /// Initiate `request` and place both locks.
    pub async fn locked(&self, request: SwapRequest) -> (Swap, Preimage) {
        let swap = self.orchestrator.initiate_swap(request).await.expect("initiate");
        self.orchestrator.lock_source(&swap.id).await.expect("lock source");
        let swap = self
            .orchestrator
            .lock_destination(&swap.id)
            .await
            .expect("lock destination");
        let preimage = self
            .orchestrator
            .get_preimage(&swap.id, PreimageAccess::Relayer)
            .await
            .expect("relayer preimage");
        (swap, preimage)
    }

    /// Current registry record for `swap`.
    pub fn stored(&self, swap: &Swap) -> Swap {
        self.orchestrator
            .registry()
            .get(&swap.id)
            .expect("swap is registered")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// ETH -> XLM, 1.0 units, one hour.
pub fn a_to_b() -> SwapRequest {
    SwapRequest {
        id: None,
        direction: Direction::AToB,
        from_asset: "ETH".into(),
        to_asset: "XLM".into(),
        amount: "1.0".into(),
        sender: ETH_USER.into(),
        receiver: XLM_USER.into(),
        timelock_seconds: 3_600,
    }
}

/// XLM -> ETH, 250.5 units, two hours.
pub fn b_to_a() -> SwapRequest {
    SwapRequest {
        id: None,
        direction: Direction::BToA,
        from_asset: "XLM".into(),
        to_asset: "ETH".into(),
        amount: "250.5".into(),
        sender: XLM_USER.into(),
        receiver: ETH_USER.into(),
        timelock_seconds: 7_200,
    }
}
