//! # Secret Generation and Verification
//!
//! Preimage/hashlock pairs for HTLCs. SHA-256 only.

use crate::domain::{Hashlock, Preimage, PREIMAGE_LEN};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate a fresh preimage from the OS CSPRNG together with its hashlock.
pub fn generate_secret() -> (Preimage, Hashlock) {
    let mut bytes = [0u8; PREIMAGE_LEN];
    OsRng.fill_bytes(&mut bytes);
    let preimage = Preimage::new(bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    let hashlock = create_hash_lock(preimage.as_bytes());
    (preimage, hashlock)
}

/// SHA-256 of `preimage`.
pub fn create_hash_lock(preimage: &[u8]) -> Hashlock {
    let digest: [u8; 32] = Sha256::digest(preimage).into();
    Hashlock::new(digest)
}

/// Check `SHA-256(preimage) == hashlock` in constant time.
///
/// Anything other than exactly 32 bytes never verifies.
pub fn verify_secret(preimage: &[u8], hashlock: &Hashlock) -> bool {
    if preimage.len() != PREIMAGE_LEN {
        return false;
    }
    let computed = create_hash_lock(preimage);
    computed.as_bytes().ct_eq(hashlock.as_bytes()).into()
}
