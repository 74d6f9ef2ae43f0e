//! Wiring: ledger clients, chain adapters, the orchestrator, the expiry
//! monitor and the admin server.

use anyhow::{Context, Result};
use htlc_coordinator::ports::{ClaimableBalanceLedger, EscrowRpc};
use htlc_coordinator::{
    ChainAdapter, ClaimableBalanceAdapter, EscrowAdapter, ExpiryMonitor, HorizonLedgerClient,
    JsonRpcEscrowClient, SwapMetrics, SwapOrchestrator, SystemTimeSource, TimeSource,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::admin::{build_admin_router, AdminState};
use crate::config::NodeConfig;
use crate::metrics::PrometheusSwapMetrics;

/// How long shutdown waits for background tasks.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Build the orchestrator over the escrow JSON-RPC gateway and the
/// claimable-balance REST API named in `config`.
pub fn build_orchestrator(config: &NodeConfig) -> Result<Arc<SwapOrchestrator>> {
    let timeout = config.swap.retry.timeout;
    let escrow_rpc: Arc<dyn EscrowRpc> = Arc::new(
        JsonRpcEscrowClient::new(&config.escrow.rpc_url, &config.escrow.contract, timeout)
            .context("Failed to build escrow RPC client")?,
    );
    let ledger_api: Arc<dyn ClaimableBalanceLedger> = Arc::new(
        HorizonLedgerClient::new(&config.ledger.horizon_url, &config.ledger.submit_url, timeout)
            .context("Failed to build ledger client")?,
    );
    wire_orchestrator(config, escrow_rpc, ledger_api, Arc::new(SystemTimeSource))
}

/// Wrap raw ledger clients in chain adapters and hand them to a new orchestrator.
pub fn wire_orchestrator(
    config: &NodeConfig,
    escrow_rpc: Arc<dyn EscrowRpc>,
    ledger_api: Arc<dyn ClaimableBalanceLedger>,
    clock: Arc<dyn TimeSource>,
) -> Result<Arc<SwapOrchestrator>> {
    let metrics: Arc<dyn SwapMetrics> = Arc::new(PrometheusSwapMetrics);
    let retry = config.swap.retry.clone();

    let escrow: Arc<dyn ChainAdapter> = Arc::new(
        EscrowAdapter::new(escrow_rpc, &config.escrow.relayer_address, retry.clone())
            .with_metrics(metrics.clone()),
    );
    let ledger: Arc<dyn ChainAdapter> = Arc::new(
        ClaimableBalanceAdapter::new(ledger_api, &config.ledger.relayer_account, retry)
            .with_metrics(metrics.clone()),
    );

    let orchestrator = SwapOrchestrator::new(escrow, ledger, clock, config.swap.clone())
        .context("Failed to build swap orchestrator")?
        .with_metrics(metrics);
    Ok(Arc::new(orchestrator))
}

/// The running relayer.
pub struct RelayerRuntime {
    config: NodeConfig,
    network: String,
    orchestrator: Arc<SwapOrchestrator>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayerRuntime {
    /// Validate `config` and build the coordinator.
    pub fn new(config: NodeConfig, network: impl Into<String>) -> Result<Self> {
        config.validate().context("Invalid node configuration")?;
        let orchestrator = build_orchestrator(&config)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            network: network.into(),
            orchestrator,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        })
    }

    /// Coordinator handle.
    pub fn orchestrator(&self) -> Arc<SwapOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Start the expiry monitor and, when enabled, the admin server.
    pub async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  HTLC Relayer Node v{}", env!("CARGO_PKG_VERSION"));
        info!("  Escrow RPC: {}", self.config.escrow.rpc_url);
        info!("  Ledger API: {}", self.config.ledger.horizon_url);
        info!("===========================================");

        let monitor = ExpiryMonitor::new(Arc::clone(&self.orchestrator));
        self.tasks.push(monitor.spawn(self.shutdown_rx.clone()));

        if self.config.admin.enabled {
            let addr = self.config.admin.addr();
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind admin server on {addr}"))?;
            let router = build_admin_router(AdminState {
                orchestrator: Arc::clone(&self.orchestrator),
                network: self.network.clone(),
            });
            let mut shutdown = self.shutdown_rx.clone();
            info!(%addr, "[htlc] Starting admin server");
            self.tasks.push(tokio::spawn(async move {
                let served = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.changed().await;
                    })
                    .await;
                if let Err(e) = served {
                    error!(error = %e, "[htlc] Admin server error");
                }
            }));
        }

        info!(
            escrow_relayer = %self.config.escrow.relayer_address,
            ledger_relayer = %self.config.ledger.relayer_account,
            "[htlc] Relayer running"
        );
        Ok(())
    }

    /// Signal shutdown and wait for background tasks.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        for task in self.tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "[htlc] Background task panicked"),
                Err(_) => warn!("[htlc] Background task did not stop in time"),
            }
        }

        let stats = self.orchestrator.registry().stats();
        info!(total = stats.total, active = stats.active, "Shutdown complete");
    }
}
