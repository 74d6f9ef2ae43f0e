//! # Domain Invariants
//!
//! Timelock rules that make the swap safe for both parties.

use super::errors::SwapError;

/// Default gap between the destination and source deadlines (15 minutes).
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 15 * 60;

/// Invariant: Timelock ordering.
///
/// The destination lock MUST expire strictly more than `margin_secs` before
/// the source lock, so whoever learns the preimage from the destination claim
/// still has time to claim the source.
pub fn invariant_timelock_ordering(
    timelock_source: u64,
    timelock_dest: u64,
    margin_secs: u64,
) -> Result<(), SwapError> {
    if timelock_source <= timelock_dest.saturating_add(margin_secs) {
        return Err(SwapError::Validation(format!(
            "timelock ordering violated: dest={timelock_dest} must be < source={timelock_source} - margin={margin_secs}"
        )));
    }
    Ok(())
}

/// Invariant: Destination deadline in the future.
pub fn invariant_timelock_in_future(timelock: u64, now: u64) -> Result<(), SwapError> {
    if timelock <= now {
        return Err(SwapError::Validation(format!(
            "timelock {timelock} is not after now={now}"
        )));
    }
    Ok(())
}
