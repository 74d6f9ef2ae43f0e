//! # Domain Value Objects
//!
//! Immutable value types for swap coordination.

use super::errors::{Hash, SwapError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledgers the coordinator can lock funds on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// Account/contract chain with an HTLC escrow contract.
    Escrow,
    /// Ledger with native claimable balances.
    ClaimableBalance,
}

impl ChainKind {
    /// Decimal places of the chain's native base unit.
    pub fn decimals(&self) -> u32 {
        match self {
            ChainKind::Escrow => 18,
            ChainKind::ClaimableBalance => 7,
        }
    }

    /// Stable label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ChainKind::Escrow => "escrow",
            ChainKind::ClaimableBalance => "claimable_balance",
        }
    }

    /// Check that `address` is well-formed for this chain.
    ///
    /// Escrow chain: `0x` followed by 40 hex digits.
    /// Claimable-balance ledger: 56-character base32 account id starting with `G`.
    pub fn validate_address(&self, address: &str) -> Result<(), SwapError> {
        let ok = match self {
            ChainKind::Escrow => {
                address.len() == 42
                    && address.starts_with("0x")
                    && address[2..].chars().all(|c| c.is_ascii_hexdigit())
            }
            ChainKind::ClaimableBalance => {
                address.len() == 56
                    && address.starts_with('G')
                    && address
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c))
            }
        };
        if ok {
            Ok(())
        } else {
            Err(SwapError::Validation(format!(
                "invalid {} address: {}",
                self.label(),
                address
            )))
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which ledger hosts the source lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Source on the escrow chain, destination on the claimable-balance ledger.
    #[serde(rename = "A_TO_B")]
    AToB,
    /// Source on the claimable-balance ledger, destination on the escrow chain.
    #[serde(rename = "B_TO_A")]
    BToA,
}

impl Direction {
    /// Chain holding the sender's lock.
    pub fn source_chain(&self) -> ChainKind {
        match self {
            Direction::AToB => ChainKind::Escrow,
            Direction::BToA => ChainKind::ClaimableBalance,
        }
    }

    /// Chain holding the receiver's lock.
    pub fn dest_chain(&self) -> ChainKind {
        match self {
            Direction::AToB => ChainKind::ClaimableBalance,
            Direction::BToA => ChainKind::Escrow,
        }
    }

    /// Label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::AToB => "a_to_b",
            Direction::BToA => "b_to_a",
        }
    }
}

/// Status snapshot of a single lock as last observed on its ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    /// Submitted, not yet confirmed.
    #[default]
    Pending,
    /// Funds held, awaiting claim or refund.
    Locked,
    /// Receiver claimed with the preimage.
    Claimed,
    /// Sender recovered funds after the timelock.
    Refunded,
    /// Lock disappeared without an attributable resolution.
    Unknown,
}

impl LockStatus {
    /// Claimed or refunded; the ledger will not change it again.
    pub fn is_resolved(&self) -> bool {
        matches!(self, LockStatus::Claimed | LockStatus::Refunded)
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockStatus::Pending => "pending",
            LockStatus::Locked => "locked",
            LockStatus::Claimed => "claimed",
            LockStatus::Refunded => "refunded",
            LockStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Swap state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapState {
    /// Created, nothing locked.
    #[default]
    Init,
    /// Sender's funds locked on the source chain.
    SourceLocked,
    /// Counter-lock placed on the destination chain.
    DestLocked,
    /// Receiver claimed; preimage is public.
    DestClaimed,
    /// Source lock claimed with the revealed preimage.
    Completed,
    /// A timelock passed with funds still locked.
    Expired,
    /// Refunds in flight.
    Refunding,
    /// Every outstanding lock refunded.
    Refunded,
    /// Unrecoverable error; outstanding locks are still refunded after expiry,
    /// and an observed destination claim or full refund reconciles it out.
    Failed,
}

impl SwapState {
    /// Check if a forward transition is valid.
    pub fn can_transition_to(&self, next: SwapState) -> bool {
        use SwapState::*;
        match (self, next) {
            (Init, SourceLocked) => true,
            (SourceLocked, DestLocked) => true,
            (DestLocked, DestClaimed) => true,
            (DestClaimed, Completed) => true,
            (SourceLocked | DestLocked | DestClaimed, Expired) => true,
            (Expired, Refunding) => true,
            (Refunding, Refunded) => true,
            (s, Failed) => !s.is_terminal(),
            _ => false,
        }
    }

    /// Transitions allowed when folding in resolutions observed on chain.
    ///
    /// A counterparty may claim or refund behind the coordinator's back, so
    /// these jump over states the coordinator itself never skips. `FAILED`
    /// is left only when the ledgers show the funds went somewhere the swap
    /// can still account for: a destination claim with the source lock
    /// still live, or every lock refunded.
    pub fn can_reconcile_to(&self, next: SwapState) -> bool {
        use SwapState::*;
        if self.can_transition_to(next) {
            return true;
        }
        matches!(
            (self, next),
            (Expired | Refunding | Failed, DestClaimed)
                | (SourceLocked | DestLocked | Expired | Failed, Refunded)
        )
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded | Self::Failed)
    }

    /// At or past the point where the preimage is public.
    pub fn preimage_revealed(&self) -> bool {
        matches!(self, Self::DestClaimed | Self::Completed)
    }

    /// Wire name, e.g. `SOURCE_LOCKED`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::SourceLocked => "SOURCE_LOCKED",
            Self::DestLocked => "DEST_LOCKED",
            Self::DestClaimed => "DEST_CLAIMED",
            Self::Completed => "COMPLETED",
            Self::Expired => "EXPIRED",
            Self::Refunding => "REFUNDING",
            Self::Refunded => "REFUNDED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SwapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque swap identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapId(String);

impl SwapId {
    /// Fresh random (UUID v4) id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Accept a caller-supplied id: 1-64 chars of `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, SwapError> {
        let ok = !raw.is_empty()
            && raw.len() <= 64
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !ok {
            return Err(SwapError::Validation(format!("invalid swap id: {raw:?}")));
        }
        Ok(Self(raw.to_string()))
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 hashlock, serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hashlock(Hash);

impl Hashlock {
    /// Wrap raw digest bytes.
    pub fn new(bytes: Hash) -> Self {
        Self(bytes)
    }

    /// Parse 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, SwapError> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| SwapError::Validation(format!("hashlock is not hex: {e}")))?;
        let arr: Hash = bytes
            .try_into()
            .map_err(|_| SwapError::Validation("hashlock must be 32 bytes".into()))?;
        Ok(Self(arr))
    }

    /// Raw digest.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hashlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hashlock({})", self.to_hex())
    }
}

impl fmt::Display for Hashlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hashlock {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hashlock {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Ledger transaction reference (tx hash), opaque to the coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(pub String);

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maximum fractional digits accepted in an [`Amount`].
///
/// Bounded by the coarser of the two ledgers so the same amount is exact on
/// both legs.
pub const AMOUNT_MAX_DECIMALS: usize = 7;

/// Positive decimal amount kept as its canonical string.
///
/// Never converted through floating point.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(String);

impl Amount {
    /// Parse `"1"`, `"1.5"`, `"0.0000001"`.
    pub fn parse(raw: &str) -> Result<Self, SwapError> {
        let invalid = |why: &str| SwapError::Validation(format!("invalid amount {raw:?}: {why}"));
        let (int_part, frac_part) = match raw.split_once('.') {
            Some((i, f)) => (i, f),
            None => (raw, ""),
        };
        if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("integer part must be digits"));
        }
        if raw.contains('.') && frac_part.is_empty() {
            return Err(invalid("empty fraction"));
        }
        if !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("fraction must be digits"));
        }
        if frac_part.len() > AMOUNT_MAX_DECIMALS {
            return Err(invalid("too many decimal places"));
        }
        if int_part.len() > 1 && int_part.starts_with('0') {
            return Err(invalid("leading zeros"));
        }
        if int_part.chars().chain(frac_part.chars()).all(|c| c == '0') {
            return Err(invalid("must be positive"));
        }
        Ok(Self(raw.to_string()))
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact integer amount in units of `10^-decimals`.
    pub fn to_base_units(&self, decimals: u32) -> Result<u128, SwapError> {
        let (int_part, frac_part) = self.0.split_once('.').unwrap_or((self.0.as_str(), ""));
        if frac_part.len() > decimals as usize {
            return Err(SwapError::Validation(format!(
                "amount {} exceeds {} decimals",
                self.0, decimals
            )));
        }
        let overflow = || SwapError::Validation(format!("amount {} overflows", self.0));
        let scale = 10u128.checked_pow(decimals).ok_or_else(overflow)?;
        let int: u128 = int_part.parse().map_err(|_| overflow())?;
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            let pad = 10u128
                .checked_pow(decimals - frac_part.len() as u32)
                .ok_or_else(overflow)?;
            frac_part.parse::<u128>().map_err(|_| overflow())? * pad
        };
        int.checked_mul(scale)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(overflow)
    }
}

impl TryFrom<String> for Amount {
    type Error = SwapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
