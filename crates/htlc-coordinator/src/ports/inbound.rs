//! # Inbound Ports
//!
//! API trait defining what the swap coordinator can do.

use crate::domain::{Preimage, RefundReceipt, Swap, SwapError, SwapId, SwapRequest, TxRef};
use async_trait::async_trait;

/// Who is asking for a preimage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreimageAccess {
    /// The relayer that generated the secret; always allowed.
    Relayer,
    /// Anyone else; allowed only once the preimage is public on chain.
    Public,
}

/// Swap coordinator API - inbound port.
#[async_trait]
pub trait SwapApi: Send + Sync {
    /// Validate a request, generate the secret and store the swap in `INIT`.
    async fn initiate_swap(&self, request: SwapRequest) -> Result<Swap, SwapError>;

    /// Lock the sender's funds on the source chain.
    async fn lock_source(&self, id: &SwapId) -> Result<Swap, SwapError>;

    /// Lock the counter-funds on the destination chain.
    async fn lock_destination(&self, id: &SwapId) -> Result<Swap, SwapError>;

    /// Claim the destination lock with a hex preimage.
    async fn claim_destination(&self, id: &SwapId, preimage_hex: &str) -> Result<TxRef, SwapError>;

    /// Claim the source lock with the revealed preimage.
    async fn claim_source(&self, id: &SwapId) -> Result<TxRef, SwapError>;

    /// Refund every expired outstanding lock.
    async fn request_refund(&self, id: &SwapId) -> Result<RefundReceipt, SwapError>;

    /// Swap snapshot reconciled against both ledgers.
    async fn get_status(&self, id: &SwapId) -> Result<Swap, SwapError>;

    /// Preimage for `id`, subject to `access`.
    async fn get_preimage(&self, id: &SwapId, access: PreimageAccess) -> Result<Preimage, SwapError>;

    /// Swaps that have not reached a terminal state.
    fn active_swaps(&self) -> Vec<Swap>;
}
