//! Checkpoint-anchored header-chain verification
//!
//! A header chain file is `anchorHeight(4 LE) ∥ anchorHash(32) ∥
//! headerCount(4 LE) ∥ header[0] … header[N-1]`, densely linked: each
//! header's `prevBlock` is the hash of its predecessor, or the anchor hash
//! for index 0. Verification is all-or-nothing; a single linkage, PoW or
//! policy failure rejects the whole file.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{Result, SpvError};
use crate::hashes::ct_eq;
use crate::pow::{check_proof_of_work, expand_target, header_hash, work_for_target, VerifierContext};
use crate::serialization::header::{parse_header, HEADER_SIZE};
use crate::serialization::ByteReader;
use crate::types::{BlockHeader, Hash};
use crate::u256::U256;

/// A verified contiguous run of headers above an anchor, with a
/// hash-to-height index for membership queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainView {
    anchor_height: u32,
    anchor_hash: Hash,
    headers: Vec<BlockHeader>,
    hashes: Vec<Hash>,
    index: HashMap<Hash, u32>,
    cumulative_work: U256,
}

impl ChainView {
    pub fn anchor_height(&self) -> u32 {
        self.anchor_height
    }

    pub fn anchor_hash(&self) -> &Hash {
        &self.anchor_hash
    }

    pub fn header_count(&self) -> u32 {
        self.headers.len() as u32
    }

    /// Height of the last verified header; the anchor height when empty.
    pub fn tip_height(&self) -> u32 {
        self.anchor_height + self.headers.len() as u32
    }

    /// Hash of the last verified header; the anchor hash when empty.
    pub fn tip_hash(&self) -> &Hash {
        self.hashes.last().unwrap_or(&self.anchor_hash)
    }

    pub fn tip_bits(&self) -> Option<u32> {
        self.headers.last().map(|h| h.bits)
    }

    /// Whether a block hash (internal byte order) appears in the chain.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.index.contains_key(hash)
    }

    pub fn height_of(&self, hash: &Hash) -> Option<u32> {
        self.index.get(hash).copied()
    }

    pub(crate) fn cumulative_work(&self) -> U256 {
        self.cumulative_work
    }

    /// Total work over the verified headers, big-endian.
    pub fn cumulative_work_bytes(&self) -> [u8; 32] {
        self.cumulative_work.to_be_bytes()
    }
}

/// Parse and verify a header chain file against the context's checkpoint.
/// On success the tip's compact bits become the context's dynamic
/// difficulty floor.
pub fn verify_header_chain(data: &[u8], ctx: &mut VerifierContext) -> Result<ChainView> {
    let mut reader = ByteReader::new(data);
    let anchor_height = reader.read_u32_le()?;
    let anchor_hash = reader.read_hash()?;
    let count = reader.read_u32_le()? as usize;

    if reader.remaining() != count * HEADER_SIZE {
        return Err(SpvError::Serialization(Cow::Borrowed(
            "header chain length does not match declared count",
        )));
    }

    // Anchor identity: when the file claims to start at the checkpoint
    // height, its anchor must be the checkpoint block.
    let checkpoint = *ctx.checkpoint();
    if anchor_height == checkpoint.height && !ct_eq(&anchor_hash, &checkpoint.hash) {
        return Err(SpvError::CheckpointMismatch);
    }

    let mut headers = Vec::with_capacity(count);
    let mut hashes = Vec::with_capacity(count);
    let mut index = HashMap::with_capacity(count);
    let mut cumulative_work = U256::ZERO;
    let mut prev = anchor_hash;

    for i in 0..count {
        let header = parse_header(reader.take(HEADER_SIZE)?)?;
        if !ct_eq(&header.prev_block, &prev) {
            return Err(SpvError::ChainBreak(i as u32));
        }
        ctx.check_header(&header)?;

        let target = expand_target(header.bits)?;
        cumulative_work = cumulative_work.saturating_add(&work_for_target(&target));

        prev = header_hash(&header);
        index.insert(prev, anchor_height + 1 + i as u32);
        hashes.push(prev);
        headers.push(header);
    }

    if let Some(tip) = headers.last() {
        ctx.set_dynamic_floor(tip.bits);
    }

    Ok(ChainView {
        anchor_height,
        anchor_hash,
        headers,
        hashes,
        index,
        cumulative_work,
    })
}

/// Linkage plus bare Proof-of-Work over an in-memory header run, returning
/// the cumulative work. Used by the snapshot verifier, which checks
/// internal consistency but applies no floor of its own.
pub fn linked_work(anchor_hash: &Hash, headers: &[BlockHeader]) -> Result<U256> {
    let mut prev = *anchor_hash;
    let mut cumulative_work = U256::ZERO;
    for (i, header) in headers.iter().enumerate() {
        if !ct_eq(&header.prev_block, &prev) {
            return Err(SpvError::ChainBreak(i as u32));
        }
        check_proof_of_work(header)?;
        let target = expand_target(header.bits)?;
        cumulative_work = cumulative_work.saturating_add(&work_for_target(&target));
        prev = header_hash(header);
    }
    Ok(cumulative_work)
}
