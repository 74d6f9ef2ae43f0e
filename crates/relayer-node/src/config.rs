//! # Node Configuration
//!
//! Ledger endpoints, relayer accounts and admin settings for the relayer node.
//!
//! ## Security Requirements
//!
//! - The node always talks to real ledgers: the escrow JSON-RPC gateway and
//!   the claimable-balance REST API
//! - The destination/source safety margin MUST NOT be below the default

use htlc_coordinator::{ChainKind, SwapConfig, DEFAULT_SAFETY_MARGIN_SECS};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Escrow-contract chain.
    pub escrow: EscrowEndpoint,
    /// Claimable-balance ledger.
    pub ledger: LedgerEndpoint,
    /// Admin HTTP server.
    pub admin: AdminConfig,
    /// Coordinator policy.
    pub swap: SwapConfig,
}

/// Escrow chain settings.
#[derive(Debug, Clone, Default)]
pub struct EscrowEndpoint {
    /// JSON-RPC gateway URL.
    pub rpc_url: String,
    /// Escrow contract address.
    pub contract: String,
    /// Relayer's account on the escrow chain.
    pub relayer_address: String,
}

/// Claimable-balance ledger settings.
#[derive(Debug, Clone, Default)]
pub struct LedgerEndpoint {
    /// Read API base URL.
    pub horizon_url: String,
    /// Signing/submission service base URL.
    pub submit_url: String,
    /// Relayer's account on the ledger.
    pub relayer_account: String,
}

/// Admin server settings.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Whether to serve the admin router.
    pub enabled: bool,
    /// Bind address.
    pub host: IpAddr,
    /// Bind port.
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9100,
        }
    }
}

impl AdminConfig {
    /// Socket address to bind.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is empty.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// An endpoint is not an http(s) URL.
    #[error("{name} is not an http(s) URL: {value}")]
    InvalidUrl {
        /// Setting name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// A relayer account is malformed.
    #[error("invalid {chain} relayer account: {address}")]
    InvalidAccount {
        /// Ledger the account belongs to.
        chain: ChainKind,
        /// Offending value.
        address: String,
    },

    /// Safety margin below the default.
    #[error("SECURITY VIOLATION: safety margin {actual}s is below the minimum {minimum}s")]
    UnsafeMargin {
        /// Configured margin.
        actual: u64,
        /// Required minimum.
        minimum: u64,
    },
}

impl NodeConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ESCROW_RPC_URL`, `ESCROW_CONTRACT_ADDRESS`, `ESCROW_RELAYER_ADDRESS`
    /// - `LEDGER_HORIZON_URL`, `LEDGER_SUBMIT_URL`, `LEDGER_RELAYER_ACCOUNT`
    /// - `HTLC_ADMIN_ENABLED` (default: true), `HTLC_ADMIN_HOST` (default: 127.0.0.1)
    /// - `HTLC_METRICS_PORT` (default: 9100)
    /// - every `HTLC_*` coordinator setting read by [`SwapConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();

        let admin = AdminConfig {
            enabled: env::var("HTLC_ADMIN_ENABLED")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.admin.enabled),
            host: env::var("HTLC_ADMIN_HOST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.admin.host),
            port: env::var("HTLC_METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.admin.port),
        };

        Ok(Self {
            escrow: EscrowEndpoint {
                rpc_url: env_string("ESCROW_RPC_URL"),
                contract: env_string("ESCROW_CONTRACT_ADDRESS"),
                relayer_address: env_string("ESCROW_RELAYER_ADDRESS"),
            },
            ledger: LedgerEndpoint {
                horizon_url: env_string("LEDGER_HORIZON_URL"),
                submit_url: env_string("LEDGER_SUBMIT_URL"),
                relayer_account: env_string("LEDGER_RELAYER_ACCOUNT"),
            },
            admin,
            swap: SwapConfig::from_env(),
        })
    }

    /// Check that both ledger endpoints and both relayer accounts are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("ESCROW_RPC_URL", &self.escrow.rpc_url),
            ("ESCROW_CONTRACT_ADDRESS", &self.escrow.contract),
            ("ESCROW_RELAYER_ADDRESS", &self.escrow.relayer_address),
            ("LEDGER_HORIZON_URL", &self.ledger.horizon_url),
            ("LEDGER_SUBMIT_URL", &self.ledger.submit_url),
            ("LEDGER_RELAYER_ACCOUNT", &self.ledger.relayer_account),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(ConfigError::Missing(*name));
        }

        for (name, url) in [
            ("ESCROW_RPC_URL", &self.escrow.rpc_url),
            ("LEDGER_HORIZON_URL", &self.ledger.horizon_url),
            ("LEDGER_SUBMIT_URL", &self.ledger.submit_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    name,
                    value: url.clone(),
                });
            }
        }

        for (chain, address) in [
            (ChainKind::Escrow, &self.escrow.relayer_address),
            (ChainKind::ClaimableBalance, &self.ledger.relayer_account),
        ] {
            chain
                .validate_address(address)
                .map_err(|_| ConfigError::InvalidAccount {
                    chain,
                    address: address.clone(),
                })?;
        }
        Ok(())
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - any required setting is missing or malformed
    /// - the safety margin is below [`DEFAULT_SAFETY_MARGIN_SECS`]
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.swap.safety_margin_secs < DEFAULT_SAFETY_MARGIN_SECS {
            return Err(ConfigError::UnsafeMargin {
                actual: self.swap.safety_margin_secs,
                minimum: DEFAULT_SAFETY_MARGIN_SECS,
            });
        }
        Ok(())
    }
}

fn env_string(name: &str) -> String {
    env::var(name).map(|v| v.trim().to_string()).unwrap_or_default()
}
