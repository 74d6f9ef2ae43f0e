//! # HTLC Relayer Node
//!
//! Runs the swap coordinator between the escrow-contract chain and the
//! claimable-balance ledger.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics
//! 2. Load configuration from the environment
//! 3. Validate endpoints and accounts; enforce the production safety margin
//!    unless `HTLC_DEV_MODE` is set
//! 4. Build the escrow RPC and ledger REST clients, adapters and the orchestrator
//! 5. Start the expiry monitor and the admin server
//! 6. Wait for Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use htlc_telemetry::{init_telemetry, TelemetryConfig};
use relayer_node::{NodeConfig, RelayerRuntime};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry_config = TelemetryConfig::from_env();
    let network = telemetry_config.network.clone();
    let _telemetry = init_telemetry(telemetry_config).context("Failed to initialize telemetry")?;

    let config = NodeConfig::from_env().context("Failed to load configuration")?;

    if std::env::var("HTLC_DEV_MODE").is_ok() {
        config.validate().context("Invalid node configuration")?;
        warn!("HTLC_DEV_MODE set; safety margin not enforced");
    } else {
        config
            .validate_for_production()
            .context("Configuration is not production ready")?;
    }

    let mut runtime = RelayerRuntime::new(config, network)?;
    runtime.start().await?;

    info!("Relayer is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
