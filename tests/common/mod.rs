//! Shared fixtures: mined headers and fully-formed envelopes over outputs
//! controlled by a fixed test key.
#![allow(dead_code)]

use serde_json::{json, Value};

use spv_core::constants::GENESIS_TIMESTAMP;
use spv_core::encoding::encode_display_hash;
use spv_core::hashes::hash256;
use spv_core::pow::{check_proof_of_work, header_hash};
use spv_core::script::p2pkh_locking_script;
use spv_core::serialization::header::serialize_header;
use spv_core::serialization::transaction::serialize_transaction;
use spv_core::types::{
    BlockHeader, Checkpoint, Hash, OutPoint, Transaction, TransactionInput, TransactionOutput,
};

/// Easiest practical compact target; mining is a handful of nonce tries.
pub const EASY_BITS: u32 = 0x207fffff;

/// Compressed WIF for the scalar 1, the suite's signing key.
pub const SIGNER_WIF: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";

/// An unrelated mainnet P2PKH destination.
pub const DESTINATION: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

/// Anchor hash the fixture headers build on.
pub const ANCHOR: Hash = [0x05; 32];

pub fn test_checkpoint() -> Checkpoint {
    Checkpoint {
        height: 0,
        hash: ANCHOR,
        bits: EASY_BITS,
    }
}

pub fn test_now() -> u64 {
    GENESIS_TIMESTAMP + 86_400
}

/// hash160 of the signer's compressed public key.
pub fn signer_pubkey_hash() -> [u8; 20] {
    let mut pkh = [0u8; 20];
    pkh.copy_from_slice(&hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap());
    pkh
}

pub fn mine(prev_block: Hash, merkle_root: Hash, timestamp: u32) -> BlockHeader {
    let mut header = BlockHeader {
        version: 1,
        prev_block,
        merkle_root,
        timestamp,
        bits: EASY_BITS,
        nonce: 0,
    };
    while check_proof_of_work(&header).is_err() {
        header.nonce += 1;
    }
    header
}

fn parent(left: &Hash, right: &Hash) -> Hash {
    let mut concat = [0u8; 64];
    concat[..32].copy_from_slice(left);
    concat[32..].copy_from_slice(right);
    hash256(&concat)
}

/// A one-input transaction paying `satoshis` to the signer's key at vout 0.
/// `salt` varies the funding outpoint so txids stay distinct.
pub fn funding_tx(satoshis: u64, salt: u8) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TransactionInput {
            prevout: OutPoint {
                txid: [salt; 32],
                vout: 0,
            },
            script_sig: vec![0x00],
            sequence: 0xffff_ffff,
        }],
        outputs: vec![TransactionOutput {
            value: satoshis,
            script_pubkey: p2pkh_locking_script(&signer_pubkey_hash()),
        }],
        lock_time: 0,
    }
}

/// A complete valid envelope JSON over a block mined on `prev_block`,
/// returning the record and its header.
pub fn build_envelope(
    satoshis: u64,
    salt: u8,
    prev_block: Hash,
    timestamp: u32,
) -> (Value, BlockHeader) {
    let tx = funding_tx(satoshis, salt);
    let raw_tx = serialize_transaction(&tx);
    let txid = hash256(&raw_tx);
    let sibling = hash256(&[salt, 0xee]);
    let root = parent(&txid, &sibling);
    let header = mine(prev_block, root, timestamp);

    let value = json!({
        "format": "merkle-envelope",
        "version": 1,
        "txid": encode_display_hash(&txid),
        "vout": 0,
        "satoshis": satoshis,
        "rawTx": hex::encode(&raw_tx),
        "blockHash": encode_display_hash(&header_hash(&header)),
        "blockHeader": hex::encode(serialize_header(&header)),
        "proof": [ { "hash": hex::encode(sibling), "pos": "R" } ],
        "confirmations": 3,
    });
    (value, header)
}

/// Binary header chain file over the given headers.
pub fn chain_file(anchor_height: u32, anchor_hash: Hash, headers: &[BlockHeader]) -> Vec<u8> {
    let mut file = Vec::new();
    file.extend_from_slice(&anchor_height.to_le_bytes());
    file.extend_from_slice(&anchor_hash);
    file.extend_from_slice(&(headers.len() as u32).to_le_bytes());
    for header in headers {
        file.extend_from_slice(&serialize_header(header));
    }
    file
}
