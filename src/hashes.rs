//! Hash primitives: SHA-256, RIPEMD-160, HMAC-SHA-256 and the derived
//! `hash256`/`hash160` helpers used throughout the core.
//!
//! All hash equality decisions in this crate go through [`ct_eq`] so that
//! comparisons do not leak a mismatch position through timing.

use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::types::Hash;

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// Double SHA-256, the ledger's block/transaction hash.
pub fn hash256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// RIPEMD-160 over SHA-256, the public-key hash.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    out
}

/// HMAC-SHA-256, the RFC 6979 expansion primitive.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Hash {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Constant-time byte equality. Slices of unequal length compare unequal.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
