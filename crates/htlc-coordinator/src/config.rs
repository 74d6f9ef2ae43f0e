//! # Coordinator Configuration
//!
//! All knobs have safe defaults and an environment override.
//!
//! | Variable | Default | Field |
//! |----------|---------|-------|
//! | `HTLC_SAFETY_MARGIN_SECS` | `900` | [`SwapConfig::safety_margin_secs`] |
//! | `HTLC_MIN_TIMELOCK_SECS` | `3600` | [`SwapConfig::min_timelock_secs`] |
//! | `HTLC_MAX_TIMELOCK_SECS` | `604800` | [`SwapConfig::max_timelock_secs`] |
//! | `HTLC_RPC_TIMEOUT_MS` | `10000` | [`RetryPolicy::timeout`] |
//! | `HTLC_RPC_MAX_RETRIES` | `3` | [`RetryPolicy::max_retries`] |
//! | `HTLC_RPC_BASE_DELAY_MS` | `250` | [`RetryPolicy::base_delay`] |
//! | `HTLC_RPC_MAX_DELAY_MS` | `5000` | [`RetryPolicy::max_delay`] |
//! | `HTLC_RPC_JITTER_MS` | `250` | [`RetryPolicy::jitter_ms`] |
//! | `HTLC_MONITOR_INTERVAL_SECS` | `5` | [`MonitorConfig::interval`] |

use crate::domain::DEFAULT_SAFETY_MARGIN_SECS;
use std::time::Duration;

/// Swap-level policy.
#[derive(Debug, Clone)]
pub struct SwapConfig {
    /// Required gap between destination and source deadlines.
    pub safety_margin_secs: u64,
    /// Smallest accepted `timelock_seconds`.
    pub min_timelock_secs: u64,
    /// Largest accepted `timelock_seconds`.
    pub max_timelock_secs: u64,
    /// Ledger call policy.
    pub retry: RetryPolicy,
    /// Expiry monitor policy.
    pub monitor: MonitorConfig,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
            min_timelock_secs: 3_600,
            max_timelock_secs: 7 * 24 * 3_600,
            retry: RetryPolicy::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl SwapConfig {
    /// Load from `HTLC_*` environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            safety_margin_secs: read_env_u64("HTLC_SAFETY_MARGIN_SECS", default.safety_margin_secs),
            min_timelock_secs: read_env_u64("HTLC_MIN_TIMELOCK_SECS", default.min_timelock_secs),
            max_timelock_secs: read_env_u64("HTLC_MAX_TIMELOCK_SECS", default.max_timelock_secs),
            retry: RetryPolicy::from_env(),
            monitor: MonitorConfig::from_env(),
        }
    }
}

/// Timeout and backoff for every ledger call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Per-attempt deadline.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// First backoff step; doubles per attempt.
    pub base_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
    /// Uniform random jitter added to each backoff.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            jitter_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Load from `HTLC_RPC_*` environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        let timeout_ms = read_env_u64("HTLC_RPC_TIMEOUT_MS", default.timeout.as_millis() as u64);
        let max_retries = read_env_u64("HTLC_RPC_MAX_RETRIES", default.max_retries as u64);
        let base_delay_ms =
            read_env_u64("HTLC_RPC_BASE_DELAY_MS", default.base_delay.as_millis() as u64);
        let max_delay_ms =
            read_env_u64("HTLC_RPC_MAX_DELAY_MS", default.max_delay.as_millis() as u64);
        let jitter_ms = read_env_u64("HTLC_RPC_JITTER_MS", default.jitter_ms);
        Self {
            timeout: Duration::from_millis(timeout_ms),
            max_retries: max_retries as usize,
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
            jitter_ms,
        }
    }

    /// No retries, no jitter. Handy for tests.
    pub fn immediate(timeout: Duration) -> Self {
        Self {
            timeout,
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_ms: 0,
        }
    }
}

/// Expiry monitor scheduling.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between registry scans.
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

impl MonitorConfig {
    /// Load from `HTLC_MONITOR_INTERVAL_SECS`.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            interval: Duration::from_secs(read_env_u64(
                "HTLC_MONITOR_INTERVAL_SECS",
                default.interval.as_secs(),
            )),
        }
    }
}

fn read_env_u64(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}
