//! Proof-of-Work: compact targets, work accounting and the difficulty floor
//!
//! The compact target is `EE·2^24 + M` expanding to `M` shifted by
//! `8·(EE−3)` bytes, bounded to 256 bits. Work per block is
//! `⌊2^256 / (target + 1)⌋`. The difficulty floor rejects headers whose
//! target is more than [`DIFFICULTY_TOLERANCE`]× easier than the effective
//! reference: the compiled-in checkpoint, or the tip of a verified header
//! chain once one is loaded.

use crate::constants::{
    DIFFICULTY_TOLERANCE, GENESIS_TIMESTAMP, MAX_FUTURE_DRIFT,
};
use crate::error::{Result, SpvError};
use crate::hashes::hash256;
use crate::serialization::header::serialize_header;
use crate::types::{BlockHeader, Checkpoint, Hash};
use crate::u256::U256;

/// Expand a compact target to its 256-bit value. Rejects encodings whose
/// value would exceed 256 bits.
pub fn expand_target(bits: u32) -> Result<U256> {
    let exponent = bits >> 24;
    let mantissa = (bits & 0x00ff_ffff) as u64;
    if mantissa == 0 {
        return Ok(U256::ZERO);
    }
    if exponent <= 3 {
        let shift = 8 * (3 - exponent);
        return Ok(U256::from_u64(mantissa >> shift));
    }
    let shift = 8 * (exponent - 3);
    let value = U256::from_u64(mantissa);
    if value.bits() + shift > 256 {
        return Err(SpvError::BadCompactTarget(bits));
    }
    Ok(value.shl(shift))
}

/// Expected number of hash attempts the target encodes:
/// `⌊2^256 / (target + 1)⌋`, computed as `⌊!target / (target + 1)⌋ + 1`.
pub fn work_for_target(target: &U256) -> U256 {
    if target.is_zero() {
        // An unsatisfiable target; callers never accumulate this because
        // proof of work can only pass for hash <= target.
        return U256::MAX;
    }
    if *target == U256::MAX {
        return U256::ONE;
    }
    let (quotient, _) = target
        .not()
        .div_rem(&target.wrapping_add(&U256::ONE));
    quotient.wrapping_add(&U256::ONE)
}

/// `hash256` of the serialized header, internal byte order.
pub fn header_hash(header: &BlockHeader) -> Hash {
    hash256(&serialize_header(header))
}

/// The bare Proof-of-Work predicate: header hash, read as a little-endian
/// 256-bit integer, must not exceed the expanded target.
pub fn check_proof_of_work(header: &BlockHeader) -> Result<()> {
    let target = expand_target(header.bits)?;
    let hash_value = U256::from_le_bytes(&header_hash(header));
    if hash_value > target {
        return Err(SpvError::PowFailed);
    }
    Ok(())
}

/// Verification context: the checkpoint, the caller's clock, and the one
/// mutable cell in the system — the dynamic difficulty floor installed by
/// header-chain verification. Passing it explicitly keeps the core free of
/// ambient state; a multi-threaded embedder wraps it in a mutex.
#[derive(Debug, Clone)]
pub struct VerifierContext {
    checkpoint: Checkpoint,
    now: u64,
    dynamic_floor_bits: Option<u32>,
}

impl VerifierContext {
    pub fn new(checkpoint: Checkpoint, now: u64) -> Self {
        VerifierContext {
            checkpoint,
            now,
            dynamic_floor_bits: None,
        }
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Compact bits of the effective reference: the verified chain tip when
    /// a chain is loaded, the checkpoint otherwise.
    pub fn reference_bits(&self) -> u32 {
        self.dynamic_floor_bits.unwrap_or(self.checkpoint.bits)
    }

    pub(crate) fn set_dynamic_floor(&mut self, bits: u32) {
        self.dynamic_floor_bits = Some(bits);
    }

    /// The floor as a target value: reference target times the tolerance.
    pub fn floor_target(&self) -> Result<U256> {
        let reference = expand_target(self.reference_bits())?;
        let shift = DIFFICULTY_TOLERANCE.trailing_zeros();
        if reference.bits() + shift > 256 {
            return Ok(U256::MAX);
        }
        Ok(reference.shl(shift))
    }

    /// Full header admission check: difficulty floor, timestamp window,
    /// then the Proof-of-Work predicate.
    pub fn check_header(&self, header: &BlockHeader) -> Result<()> {
        let target = expand_target(header.bits)?;
        if target > self.floor_target()? {
            return Err(SpvError::BelowDifficultyFloor);
        }
        let timestamp = header.timestamp as u64;
        if timestamp < GENESIS_TIMESTAMP || timestamp > self.now + MAX_FUTURE_DRIFT {
            return Err(SpvError::TimestampOutOfBounds(timestamp));
        }
        check_proof_of_work(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_CHECKPOINT;
    use crate::encoding::encode_display_hash;
    use crate::serialization::header::parse_header;

    const GENESIS_HEADER_HEX: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c";

    fn genesis_header() -> BlockHeader {
        parse_header(&hex::decode(GENESIS_HEADER_HEX).unwrap()).unwrap()
    }

    #[test]
    fn expand_target_reference_values() {
        // Genesis bits: 0xffff shifted 26 bytes up.
        let genesis = expand_target(0x1d00ffff).unwrap();
        assert_eq!(genesis, U256::from_u64(0xffff).shl(8 * 26));

        // Exponent 3 leaves the mantissa in place.
        assert_eq!(expand_target(0x03123456).unwrap(), U256::from_u64(0x123456));

        // Exponent below 3 shifts down.
        assert_eq!(expand_target(0x02123456).unwrap(), U256::from_u64(0x1234));
        assert_eq!(expand_target(0x01123456).unwrap(), U256::from_u64(0x12));

        // Zero mantissa is the unsatisfiable zero target.
        assert!(expand_target(0x1d000000).unwrap().is_zero());
    }

    #[test]
    fn expand_target_bounds_to_256_bits() {
        assert!(expand_target(0x21ffffff).is_err());
        // 24 significant mantissa bits shifted by 232: exactly 256 bits.
        assert!(expand_target(0x20ffffff).is_ok());
        assert_eq!(
            expand_target(0x21ffffff).unwrap_err(),
            SpvError::BadCompactTarget(0x21ffffff)
        );
    }

    #[test]
    fn work_for_genesis_target() {
        let target = expand_target(0x1d00ffff).unwrap();
        assert_eq!(work_for_target(&target), U256([0x0000000100010001, 0, 0, 0]));
    }

    #[test]
    fn work_edges() {
        assert_eq!(work_for_target(&U256::MAX), U256::ONE);
        assert_eq!(work_for_target(&U256::ZERO), U256::MAX);
    }

    #[test]
    fn genesis_satisfies_proof_of_work() {
        let header = genesis_header();
        assert_eq!(
            encode_display_hash(&header_hash(&header)),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
        assert!(check_proof_of_work(&header).is_ok());
    }

    #[test]
    fn nonce_mutation_breaks_proof_of_work() {
        let mut header = genesis_header();
        header.nonce ^= 1;
        assert_eq!(check_proof_of_work(&header), Err(SpvError::PowFailed));
    }

    #[test]
    fn context_accepts_genesis_under_default_checkpoint() {
        let ctx = VerifierContext::new(DEFAULT_CHECKPOINT, GENESIS_TIMESTAMP + 600);
        assert!(ctx.check_header(&genesis_header()).is_ok());
    }

    #[test]
    fn floor_rejects_targets_easier_than_tolerance() {
        // Reference at genesis difficulty; a header whose own target is
        // 2^16 times easier exceeds the 8x tolerance.
        let ctx = VerifierContext::new(DEFAULT_CHECKPOINT, GENESIS_TIMESTAMP + 600);
        let mut header = genesis_header();
        header.bits = 0x1f00ffff;
        assert_eq!(
            ctx.check_header(&header),
            Err(SpvError::BelowDifficultyFloor)
        );
    }

    #[test]
    fn dynamic_floor_replaces_static_reference() {
        let mut ctx = VerifierContext::new(DEFAULT_CHECKPOINT, GENESIS_TIMESTAMP + 600);
        assert_eq!(ctx.reference_bits(), DEFAULT_CHECKPOINT.bits);
        ctx.set_dynamic_floor(0x1b00ffff);
        assert_eq!(ctx.reference_bits(), 0x1b00ffff);
        // Genesis difficulty is now far easier than 8x the reference.
        assert_eq!(
            ctx.check_header(&genesis_header()),
            Err(SpvError::BelowDifficultyFloor)
        );
    }

    #[test]
    fn timestamp_window_is_enforced() {
        let ctx = VerifierContext::new(DEFAULT_CHECKPOINT, GENESIS_TIMESTAMP);
        let mut early = genesis_header();
        early.timestamp = (GENESIS_TIMESTAMP - 1) as u32;
        assert!(matches!(
            ctx.check_header(&early),
            Err(SpvError::TimestampOutOfBounds(_))
        ));

        let mut future = genesis_header();
        future.timestamp = (GENESIS_TIMESTAMP + MAX_FUTURE_DRIFT + 1) as u32;
        assert!(matches!(
            ctx.check_header(&future),
            Err(SpvError::TimestampOutOfBounds(_))
        ));
    }
}
