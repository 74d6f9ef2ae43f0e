//! Bounded retry with per-attempt timeout for ledger calls.
//!
//! Only transient errors ([`SwapError::is_transient`]) are retried. Backoff is
//! exponential from `base_delay`, capped at `max_delay`, plus uniform jitter.

use crate::config::RetryPolicy;
use crate::domain::{ChainKind, SwapError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Run `action` under `policy`, converting timeouts into [`SwapError::ChainRpc`].
pub async fn retry_with_timeout<T, F, Fut>(
    label: &'static str,
    chain: ChainKind,
    policy: &RetryPolicy,
    mut action: F,
) -> Result<T, SwapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SwapError>>,
{
    let attempts = policy.max_retries.saturating_add(1);
    let mut last_err = None;

    for attempt in 0..attempts {
        match timeout(policy.timeout, action()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) if !err.is_transient() => return Err(err),
            Ok(Err(err)) => {
                warn!(attempt = attempt + 1, %chain, error = %err, "[htlc] RPC error on {label}; retrying");
                last_err = Some(err);
            }
            Err(_) => {
                warn!(attempt = attempt + 1, %chain, "[htlc] RPC timeout on {label}; retrying");
                last_err = Some(SwapError::rpc(
                    chain,
                    format!("{label} timed out after {:?}", policy.timeout),
                ));
            }
        }

        if attempt + 1 < attempts {
            sleep(backoff(policy, attempt)).await;
        }
    }

    Err(last_err.unwrap_or_else(|| SwapError::rpc(chain, format!("{label} retry exhausted"))))
}

fn backoff(policy: &RetryPolicy, attempt: usize) -> Duration {
    let exp = 2u32.saturating_pow(attempt.min(31) as u32);
    let capped = std::cmp::min(policy.base_delay.saturating_mul(exp), policy.max_delay);
    let jitter = if policy.jitter_ms == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(rand::thread_rng().gen_range(0..=policy.jitter_ms))
    };
    capped + jitter
}
