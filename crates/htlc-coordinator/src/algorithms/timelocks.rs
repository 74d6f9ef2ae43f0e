//! # Timelock Calculation
//!
//! Source deadline at `now + timelock_seconds`, destination at half that.

use crate::config::SwapConfig;
use crate::domain::{invariant_timelock_in_future, invariant_timelock_ordering, SwapError};

/// Compute `(timelock_source, timelock_dest)` and enforce ordering.
pub fn calculate_timelocks(
    now: u64,
    timelock_seconds: u64,
    config: &SwapConfig,
) -> Result<(u64, u64), SwapError> {
    if timelock_seconds < config.min_timelock_secs || timelock_seconds > config.max_timelock_secs {
        return Err(SwapError::Validation(format!(
            "timelock_seconds {} outside [{}, {}]",
            timelock_seconds, config.min_timelock_secs, config.max_timelock_secs
        )));
    }

    let timelock_source = now
        .checked_add(timelock_seconds)
        .ok_or_else(|| SwapError::Validation("timelock overflows".into()))?;
    let timelock_dest = now + timelock_seconds / 2;

    invariant_timelock_in_future(timelock_dest, now)?;
    invariant_timelock_ordering(timelock_source, timelock_dest, config.safety_margin_secs)?;

    Ok((timelock_source, timelock_dest))
}
