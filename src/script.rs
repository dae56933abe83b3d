//! Pay-to-public-key-hash script construction and recognition
//!
//! The only script form this core handles:
//! `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`.

/// Length of a P2PKH locking script.
pub const P2PKH_SCRIPT_LEN: usize = 25;

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_PUSH_20: u8 = 0x14;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

/// Build the locking script for a public-key hash.
pub fn p2pkh_locking_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_SCRIPT_LEN);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(OP_PUSH_20);
    script.extend_from_slice(pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// Recognize a P2PKH locking script and extract its public-key hash.
/// Anything but the exact 25-byte form is rejected.
pub fn extract_p2pkh(script: &[u8]) -> Option<[u8; 20]> {
    if script.len() != P2PKH_SCRIPT_LEN
        || script[0] != OP_DUP
        || script[1] != OP_HASH160
        || script[2] != OP_PUSH_20
        || script[23] != OP_EQUALVERIFY
        || script[24] != OP_CHECKSIG
    {
        return None;
    }
    let mut pubkey_hash = [0u8; 20];
    pubkey_hash.copy_from_slice(&script[3..23]);
    Some(pubkey_hash)
}

/// Build the unlocking script `<sig ∥ hashtype> <compressed pubkey>` with
/// single-byte push lengths.
pub fn p2pkh_unlocking_script(sig_with_hashtype: &[u8], compressed_pubkey: &[u8; 33]) -> Vec<u8> {
    let mut script = Vec::with_capacity(1 + sig_with_hashtype.len() + 1 + 33);
    script.push(sig_with_hashtype.len() as u8);
    script.extend_from_slice(sig_with_hashtype);
    script.push(33);
    script.extend_from_slice(compressed_pubkey);
    script
}
