//! Consensus and policy constants for the offline verification core

use crate::types::{Checkpoint, Hash};

/// Money cap: 21,000,000 coins in satoshis.
pub const MAX_SATOSHIS: u64 = 2_100_000_000_000_000;

/// Dust threshold in satoshis. Change at or below this folds into the fee;
/// payments at or below it are rejected.
pub const DUST_THRESHOLD: u64 = 546;

/// `SIGHASH_ALL | SIGHASH_FORKID`, the only signature hash type this core
/// emits or accepts.
pub const SIGHASH_FORKID_ALL: u8 = 0x41;

/// Maximum number of steps in a Merkle inclusion proof.
pub const MAX_PROOF_DEPTH: usize = 64;

/// Difficulty-floor tolerance: the floor target is the reference target
/// multiplied by this factor (roughly three maximum downward retargets).
pub const DIFFICULTY_TOLERANCE: u32 = 8;

/// Timestamp of the genesis block; no valid header predates it.
pub const GENESIS_TIMESTAMP: u64 = 1_231_006_505;

/// Maximum allowed clock drift into the future, in seconds.
pub const MAX_FUTURE_DRIFT: u64 = 7_200;

/// Age past which a signed header snapshot is flagged stale (30 days).
pub const SNAPSHOT_STALE_AFTER: u64 = 30 * 86_400;

/// Fee sanity bound: the fee may not exceed input value divided by this.
pub const FEE_CAP_DIVISOR: u64 = 10;

/// Size model for fee estimation, in bytes. A signed P2PKH input is a
/// 36-byte outpoint, ~107-byte scriptSig with its length prefix, and a
/// 4-byte sequence.
pub const P2PKH_INPUT_SIZE: u64 = 148;

/// A P2PKH output: 8-byte value, length prefix, 25-byte script.
pub const P2PKH_OUTPUT_SIZE: u64 = 34;

/// Version, input/output counts and locktime.
pub const TX_OVERHEAD_SIZE: u64 = 10;

/// WIF version byte for mainnet secret keys.
pub const WIF_VERSION: u8 = 0x80;

/// Address version byte for mainnet P2PKH.
pub const ADDRESS_VERSION: u8 = 0x00;

/// Required envelope format tag.
pub const ENVELOPE_FORMAT: &str = "merkle-envelope";

/// Required envelope schema version.
pub const ENVELOPE_VERSION: u64 = 1;

/// Hash of the genesis block in internal byte order (display form is the
/// byte-reversed `000000000019d668…`).
pub const GENESIS_HASH: Hash = [
    0x6f, 0xe2, 0x8c, 0x0a, 0xb6, 0xf1, 0xb3, 0x72, 0xc1, 0xa6, 0xa2, 0x46, 0xae, 0x63, 0xf7,
    0x4f, 0x93, 0x1e, 0x83, 0x65, 0xe1, 0x5a, 0x08, 0x9c, 0x68, 0xd6, 0x19, 0x00, 0x00, 0x00,
    0x00, 0x00,
];

/// Compact target of the genesis block (minimum difficulty).
pub const GENESIS_BITS: u32 = 0x1d00ffff;

/// Default trust anchor. Product builds substitute their own triple; the
/// shipped default anchors at genesis because it is the only block a fully
/// offline build can vouch for.
pub const DEFAULT_CHECKPOINT: Checkpoint = Checkpoint {
    height: 0,
    hash: GENESIS_HASH,
    bits: GENESIS_BITS,
};
