//! # Preimage
//!
//! 32-byte HTLC secret that zeroizes on drop and never prints itself.

use super::errors::SwapError;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Preimage length in bytes.
pub const PREIMAGE_LEN: usize = 32;

/// HTLC preimage.
///
/// `Debug` is redacted so the value cannot leak through `tracing` fields or
/// error messages. Serialization (hex) exists only for the relayer-facing
/// snapshot once the secret is already public.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Preimage {
    inner: [u8; PREIMAGE_LEN],
}

impl Preimage {
    /// Wrap raw bytes.
    pub fn new(bytes: [u8; PREIMAGE_LEN]) -> Self {
        Self { inner: bytes }
    }

    /// Copy from a slice; `None` unless exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let inner: [u8; PREIMAGE_LEN] = slice.try_into().ok()?;
        Some(Self { inner })
    }

    /// Parse 64 hex characters (optional `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, SwapError> {
        let mut bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| SwapError::Validation(format!("preimage is not hex: {e}")))?;
        let parsed = Self::from_slice(&bytes);
        bytes.zeroize();
        parsed.ok_or_else(|| SwapError::Validation("preimage must be 32 bytes".into()))
    }

    /// Borrow the secret bytes. Use immediately; do not keep copies.
    pub fn as_bytes(&self) -> &[u8; PREIMAGE_LEN] {
        &self.inner
    }

    /// Hex encoding, for submission to a ledger.
    pub fn to_hex(&self) -> String {
        hex::encode(self.inner)
    }
}

impl std::fmt::Debug for Preimage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Preimage(***)")
    }
}

impl Serialize for Preimage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Preimage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
