//! Hex and Base58Check encoding with strict failure modes

use std::borrow::Cow;

use crate::error::{Result, SpvError};
use crate::types::Hash;

/// Decode a hex string, rejecting odd lengths and non-hex characters.
/// `field` names the offending input in the error.
pub fn decode_hex(s: &str, field: &'static str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|_| SpvError::BadHex(Cow::Borrowed(field)))
}

/// Decode a hex string into a fixed-size array, additionally enforcing the
/// exact byte length.
pub fn decode_hex_array<const N: usize>(s: &str, field: &'static str) -> Result<[u8; N]> {
    let bytes = decode_hex(s, field)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| SpvError::WrongLength {
        field,
        expected: N,
        actual,
    })
}

/// Decode a 32-byte hash given in display (byte-reversed) hex, returning it
/// in internal byte order.
pub fn decode_display_hash(s: &str, field: &'static str) -> Result<Hash> {
    let mut hash: Hash = decode_hex_array(s, field)?;
    hash.reverse();
    Ok(hash)
}

/// Lower-case hex of arbitrary bytes.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Display hex of an internal-order hash.
pub fn encode_display_hash(hash: &Hash) -> String {
    let mut reversed = *hash;
    reversed.reverse();
    hex::encode(reversed)
}

/// Base58Check-encode a version byte plus payload.
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut full = Vec::with_capacity(1 + payload.len());
    full.push(version);
    full.extend_from_slice(payload);
    bs58::encode(full).with_check().into_string()
}

/// Base58Check-decode, returning the version byte and payload separately.
/// Rejects bad alphabet, inputs too short to carry a checksum, and checksum
/// mismatches.
pub fn base58check_decode(s: &str) -> Result<(u8, Vec<u8>)> {
    let decoded = bs58::decode(s)
        .with_check(None)
        .into_vec()
        .map_err(|e| SpvError::Base58(Cow::Owned(e.to_string())))?;
    if decoded.is_empty() {
        return Err(SpvError::Base58(Cow::Borrowed("empty payload")));
    }
    let version = decoded[0];
    Ok((version, decoded[1..].to_vec()))
}
