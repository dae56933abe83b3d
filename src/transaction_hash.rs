//! Fork-id signature hash
//!
//! Per-input preimage in the BIP-143-style layout with the fork identifier
//! carried in the sighash type (`SIGHASH_ALL | SIGHASH_FORKID = 0x41`):
//!
//! ```text
//! version ∥ hashPrevouts ∥ hashSequence ∥ outpoint ∥ scriptCode
//!         ∥ value ∥ sequence ∥ hashOutputs ∥ locktime ∥ sighashType
//! ```
//!
//! The message hash is `hash256` of the preimage.

use crate::constants::SIGHASH_FORKID_ALL;
use crate::hashes::hash256;
use crate::serialization::varint::write_varint;
use crate::types::Hash;

/// The outpoint data a preimage needs for one spend input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreimageInput {
    /// Funding txid, internal byte order.
    pub txid: Hash,
    pub vout: u32,
    pub satoshis: u64,
    pub sequence: u32,
}

/// Transaction id of raw bytes, internal byte order. Display reverses it.
pub fn compute_txid(raw_tx: &[u8]) -> Hash {
    hash256(raw_tx)
}

fn hash_prevouts(inputs: &[PreimageInput]) -> Hash {
    let mut buf = Vec::with_capacity(inputs.len() * 36);
    for input in inputs {
        buf.extend_from_slice(&input.txid);
        buf.extend_from_slice(&input.vout.to_le_bytes());
    }
    hash256(&buf)
}

fn hash_sequence(inputs: &[PreimageInput]) -> Hash {
    let mut buf = Vec::with_capacity(inputs.len() * 4);
    for input in inputs {
        buf.extend_from_slice(&input.sequence.to_le_bytes());
    }
    hash256(&buf)
}

/// Message hash for the input at `index`. `outputs_serialized` is the
/// transaction's outputs section; `script_code` is the 25-byte locking
/// script of the output being spent.
pub fn sighash(
    version: u32,
    inputs: &[PreimageInput],
    outputs_serialized: &[u8],
    index: usize,
    script_code: &[u8],
    lock_time: u32,
) -> Hash {
    let signed = &inputs[index];

    let mut preimage = Vec::with_capacity(156 + script_code.len() + 2);
    preimage.extend_from_slice(&version.to_le_bytes());
    preimage.extend_from_slice(&hash_prevouts(inputs));
    preimage.extend_from_slice(&hash_sequence(inputs));

    preimage.extend_from_slice(&signed.txid);
    preimage.extend_from_slice(&signed.vout.to_le_bytes());

    write_varint(&mut preimage, script_code.len() as u64);
    preimage.extend_from_slice(script_code);

    preimage.extend_from_slice(&signed.satoshis.to_le_bytes());
    preimage.extend_from_slice(&signed.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash256(outputs_serialized));
    preimage.extend_from_slice(&lock_time.to_le_bytes());
    preimage.extend_from_slice(&(SIGHASH_FORKID_ALL as u32).to_le_bytes());

    hash256(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode_display_hash;

    fn sample_inputs() -> Vec<PreimageInput> {
        vec![
            PreimageInput {
                txid: [0xaa; 32],
                vout: 0,
                satoshis: 60_000,
                sequence: 0xffff_ffff,
            },
            PreimageInput {
                txid: [0xbb; 32],
                vout: 3,
                satoshis: 80_000,
                sequence: 0xffff_ffff,
            },
        ]
    }

    fn sample_script_code() -> Vec<u8> {
        let mut script = vec![0x76, 0xa9, 0x14];
        script.extend_from_slice(&[0x44; 20]);
        script.extend_from_slice(&[0x88, 0xac]);
        script
    }

    #[test]
    fn txid_of_known_bytes() {
        // hash256 of the genesis coinbase text bytes is stable.
        let txid = compute_txid(b"offline-spv");
        assert_eq!(txid, crate::hashes::hash256(b"offline-spv"));
        assert_eq!(encode_display_hash(&txid).len(), 64);
    }

    #[test]
    fn preimage_matches_manual_assembly() {
        let inputs = sample_inputs();
        let script_code = sample_script_code();
        let outputs = vec![0x01u8, 0x02, 0x03];

        let z = sighash(1, &inputs, &outputs, 1, &script_code, 0);

        let mut manual = Vec::new();
        manual.extend_from_slice(&1u32.to_le_bytes());
        let mut prevouts = Vec::new();
        for input in &inputs {
            prevouts.extend_from_slice(&input.txid);
            prevouts.extend_from_slice(&input.vout.to_le_bytes());
        }
        manual.extend_from_slice(&hash256(&prevouts));
        let mut sequences = Vec::new();
        for input in &inputs {
            sequences.extend_from_slice(&input.sequence.to_le_bytes());
        }
        manual.extend_from_slice(&hash256(&sequences));
        manual.extend_from_slice(&inputs[1].txid);
        manual.extend_from_slice(&inputs[1].vout.to_le_bytes());
        manual.push(25);
        manual.extend_from_slice(&script_code);
        manual.extend_from_slice(&inputs[1].satoshis.to_le_bytes());
        manual.extend_from_slice(&inputs[1].sequence.to_le_bytes());
        manual.extend_from_slice(&hash256(&outputs));
        manual.extend_from_slice(&0u32.to_le_bytes());
        manual.extend_from_slice(&0x41u32.to_le_bytes());

        assert_eq!(z, hash256(&manual));
    }

    #[test]
    fn sighash_distinguishes_inputs() {
        let inputs = sample_inputs();
        let script_code = sample_script_code();
        let outputs = [0u8; 34];
        let z0 = sighash(1, &inputs, &outputs, 0, &script_code, 0);
        let z1 = sighash(1, &inputs, &outputs, 1, &script_code, 0);
        assert_ne!(z0, z1);
    }

    #[test]
    fn sighash_commits_to_outputs_and_values() {
        let inputs = sample_inputs();
        let script_code = sample_script_code();
        let base = sighash(1, &inputs, &[0x01], 0, &script_code, 0);
        assert_ne!(base, sighash(1, &inputs, &[0x02], 0, &script_code, 0));

        let mut bumped = inputs.clone();
        bumped[0].satoshis += 1;
        assert_ne!(base, sighash(1, &bumped, &[0x01], 0, &script_code, 0));
    }
}
