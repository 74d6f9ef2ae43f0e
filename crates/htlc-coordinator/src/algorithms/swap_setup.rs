//! # Swap Setup
//!
//! Turns a [`SwapRequest`] into a fresh `INIT` swap plus its secret.

use super::secret::generate_secret;
use super::timelocks::calculate_timelocks;
use crate::config::SwapConfig;
use crate::domain::{Amount, Preimage, Swap, SwapError, SwapId, SwapParams, SwapRequest};

/// Maximum length of an asset identifier.
pub const MAX_ASSET_LEN: usize = 64;

/// Validate `request` and build the swap.
///
/// Returns `(swap, preimage)`; the preimage must go to the secret vault and
/// never onto the swap record until it is revealed on chain.
pub fn create_swap(
    request: &SwapRequest,
    now: u64,
    config: &SwapConfig,
) -> Result<(Swap, Preimage), SwapError> {
    let id = match &request.id {
        Some(raw) => SwapId::parse(raw)?,
        None => SwapId::generate(),
    };

    validate_asset(&request.from_asset)?;
    validate_asset(&request.to_asset)?;
    let amount = Amount::parse(&request.amount)?;

    request
        .direction
        .source_chain()
        .validate_address(&request.sender)?;
    request
        .direction
        .dest_chain()
        .validate_address(&request.receiver)?;

    // Both ledgers must represent the amount exactly.
    for chain in [request.direction.source_chain(), request.direction.dest_chain()] {
        amount.to_base_units(chain.decimals())?;
    }

    let (timelock_source, timelock_dest) =
        calculate_timelocks(now, request.timelock_seconds, config)?;

    let (preimage, hashlock) = generate_secret();

    let swap = Swap::new(SwapParams {
        id,
        direction: request.direction,
        from_asset: request.from_asset.clone(),
        to_asset: request.to_asset.clone(),
        amount,
        sender: request.sender.clone(),
        receiver: request.receiver.clone(),
        hashlock,
        timelock_source,
        timelock_dest,
        created_at: now,
    });

    Ok((swap, preimage))
}

fn validate_asset(asset: &str) -> Result<(), SwapError> {
    if asset.is_empty() || asset.len() > MAX_ASSET_LEN || asset.chars().any(char::is_whitespace) {
        return Err(SwapError::Validation(format!("invalid asset: {asset:?}")));
    }
    Ok(())
}
