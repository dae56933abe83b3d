//! Core data types shared across the verification and signing modules

use serde::{Deserialize, Serialize};

/// 256-bit hash in internal byte order. Display order is byte-reversed.
pub type Hash = [u8; 32];

/// Byte string type.
pub type ByteString = Vec<u8>;

/// Reverse a hash between internal and display byte order.
#[inline]
pub fn reversed(hash: Hash) -> Hash {
    let mut out = hash;
    out.reverse();
    out
}

/// Reference to a specific transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Funding transaction id, internal byte order.
    pub txid: Hash,
    /// Output index within that transaction.
    pub vout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: ByteString,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    pub script_pubkey: ByteString,
}

/// Transaction in the ledger's pre-SegWit wire model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

/// 80-byte block header. `prev_block` and `merkle_root` are stored in
/// internal (natural) byte order, matching the wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: Hash,
    pub merkle_root: Hash,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

/// Compiled-in trust anchor for header-chain verification. Also the source
/// of the static difficulty floor when no chain is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub height: u32,
    /// Anchor block hash, internal byte order.
    pub hash: Hash,
    /// Compact target at the anchor, used for the static difficulty floor.
    pub bits: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_is_involutive() {
        let mut h: Hash = [0u8; 32];
        for (i, b) in h.iter_mut().enumerate() {
            *b = i as u8;
        }
        assert_eq!(reversed(reversed(h)), h);
        assert_eq!(reversed(h)[0], 31);
    }
}
