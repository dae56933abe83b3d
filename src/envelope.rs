//! Envelope parsing and validation
//!
//! An envelope packages an unspent output with everything needed to verify
//! it offline: the raw funding transaction, a Merkle inclusion proof and
//! the block header that timestamps it. Parsing is two-stage: serde maps
//! the JSON onto an untyped raw record, then the validator walks every
//! binding in a fixed order, short-circuiting with a distinct reason per
//! rejectable condition. The result is immutable.

use std::borrow::Cow;

use serde::Deserialize;

use crate::chain::ChainView;
use crate::constants::{ENVELOPE_FORMAT, ENVELOPE_VERSION, MAX_SATOSHIS};
use crate::encoding::{decode_display_hash, decode_hex, decode_hex_array, encode_display_hash};
use crate::error::{Result, SpvError};
use crate::hashes::{ct_eq, hash256};
use crate::merkle::{self, ProofStep, Side, Sibling};
use crate::pow::{header_hash, VerifierContext};
use crate::script::extract_p2pkh;
use crate::serialization::header::parse_header;
use crate::serialization::transaction::parse_transaction;
use crate::transaction_hash::PreimageInput;
use crate::types::{BlockHeader, Hash, OutPoint, Transaction};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    format: String,
    version: u64,
    txid: String,
    vout: u32,
    satoshis: u64,
    raw_tx: String,
    #[serde(default)]
    block_hash: Option<String>,
    block_header: String,
    proof: Vec<RawProofStep>,
    #[serde(default)]
    confirmations: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawProofStep {
    hash: String,
    pos: String,
}

/// A fully validated envelope. Construction only through
/// [`parse_and_validate`]; downstream code reads but never mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    txid: Hash,
    vout: u32,
    satoshis: u64,
    tx: Transaction,
    header: BlockHeader,
    block_hash: Hash,
    proof: Vec<ProofStep>,
    pubkey_hash: [u8; 20],
    confirmations: Option<u64>,
}

impl Envelope {
    /// Funding txid, internal byte order.
    pub fn txid(&self) -> &Hash {
        &self.txid
    }

    pub fn txid_display(&self) -> String {
        encode_display_hash(&self.txid)
    }

    pub fn vout(&self) -> u32 {
        self.vout
    }

    pub fn satoshis(&self) -> u64 {
        self.satoshis
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Hash of the carried header, internal byte order.
    pub fn block_hash(&self) -> &Hash {
        &self.block_hash
    }

    pub fn proof(&self) -> &[ProofStep] {
        &self.proof
    }

    /// Public-key hash locked by the referenced output.
    pub fn pubkey_hash(&self) -> &[u8; 20] {
        &self.pubkey_hash
    }

    /// Advisory confirmation count from the fetcher; never used in
    /// validation decisions.
    pub fn confirmations(&self) -> Option<u64> {
        self.confirmations
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid,
            vout: self.vout,
        }
    }

    /// Bypass validation for unit tests elsewhere in the crate.
    #[cfg(test)]
    pub(crate) fn synthetic(
        txid: Hash,
        vout: u32,
        satoshis: u64,
        pubkey_hash: [u8; 20],
    ) -> Envelope {
        Envelope {
            txid,
            vout,
            satoshis,
            tx: Transaction {
                version: 1,
                inputs: Vec::new(),
                outputs: Vec::new(),
                lock_time: 0,
            },
            header: BlockHeader {
                version: 1,
                prev_block: [0u8; 32],
                merkle_root: [0u8; 32],
                timestamp: 0,
                bits: 0,
                nonce: 0,
            },
            block_hash: [0u8; 32],
            proof: Vec::new(),
            pubkey_hash,
            confirmations: None,
        }
    }

    /// The outpoint data the sighash preimage needs, with the final
    /// sequence the signing profile pins.
    pub fn preimage_input(&self) -> PreimageInput {
        PreimageInput {
            txid: self.txid,
            vout: self.vout,
            satoshis: self.satoshis,
            sequence: 0xffff_ffff,
        }
    }
}

/// Parse envelope bytes and run the full validation sequence. A loaded
/// header chain, when supplied, must contain the envelope's block.
pub fn parse_and_validate(
    bytes: &[u8],
    ctx: &VerifierContext,
    chain: Option<&ChainView>,
) -> Result<Envelope> {
    // Stage 1: schema.
    let raw: RawEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| SpvError::Json(Cow::Owned(e.to_string())))?;
    if raw.format != ENVELOPE_FORMAT {
        return Err(SpvError::BadFormatTag(raw.format));
    }
    if raw.version != ENVELOPE_VERSION {
        return Err(SpvError::BadVersion(raw.version));
    }

    // Stage 2: hex well-formedness and exact sizes.
    let declared_txid = decode_display_hash(&raw.txid, "txid")?;
    let raw_tx = decode_hex(&raw.raw_tx, "rawTx")?;
    let header_bytes: [u8; 80] = decode_hex_array(&raw.block_header, "blockHeader")?;
    let declared_block_hash = raw
        .block_hash
        .as_deref()
        .map(|s| decode_display_hash(s, "blockHash"))
        .transpose()?;
    let proof = decode_proof(&raw.proof)?;

    // Stage 3: the raw transaction must parse and hash to the declared id.
    let tx = parse_transaction(&raw_tx)?;
    let txid = hash256(&raw_tx);
    if !ct_eq(&txid, &declared_txid) {
        return Err(SpvError::TxidMismatch);
    }

    // Stage 4: the referenced output must exist and be P2PKH.
    let output = tx
        .outputs
        .get(raw.vout as usize)
        .ok_or(SpvError::VoutOutOfRange {
            vout: raw.vout,
            outputs: tx.outputs.len(),
        })?;
    let pubkey_hash = extract_p2pkh(&output.script_pubkey).ok_or(SpvError::NotP2pkh)?;

    // Stage 5: value binding and money-cap policy.
    if output.value != raw.satoshis {
        return Err(SpvError::ValueMismatch {
            declared: raw.satoshis,
            actual: output.value,
        });
    }
    if raw.satoshis == 0 {
        return Err(SpvError::ZeroValue);
    }
    if raw.satoshis > MAX_SATOSHIS {
        return Err(SpvError::OverMoneyCap(raw.satoshis));
    }

    // Stage 6: the header must satisfy Proof-of-Work under the floor.
    let header = parse_header(&header_bytes)?;
    ctx.check_header(&header)?;
    let block_hash = header_hash(&header);
    if let Some(declared) = declared_block_hash {
        if !ct_eq(&block_hash, &declared) {
            return Err(SpvError::BlockHashMismatch);
        }
    }

    // Stage 7: Merkle replay with the duplicate-sibling guard.
    merkle::verify_inclusion(&txid, &proof, &header.merkle_root)?;

    // Stage 8: chain membership, when a header chain is loaded.
    if let Some(chain) = chain {
        if !chain.contains(&block_hash) {
            return Err(SpvError::HeaderNotInChain);
        }
    }

    Ok(Envelope {
        txid,
        vout: raw.vout,
        satoshis: raw.satoshis,
        tx,
        header,
        block_hash,
        proof,
        pubkey_hash,
        confirmations: raw.confirmations,
    })
}

fn decode_proof(raw: &[RawProofStep]) -> Result<Vec<ProofStep>> {
    raw.iter()
        .map(|step| {
            let sibling = if step.hash == "*" {
                Sibling::Duplicate
            } else {
                Sibling::Hash(decode_hex_array(&step.hash, "proof sibling")?)
            };
            let side = match step.pos.as_str() {
                "L" => Side::Left,
                "R" => Side::Right,
                other => {
                    return Err(SpvError::Json(Cow::Owned(format!(
                        "proof step pos must be \"L\" or \"R\", got {other:?}"
                    ))))
                }
            };
            Ok(ProofStep { sibling, side })
        })
        .collect()
}
