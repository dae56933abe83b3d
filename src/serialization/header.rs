//! Block header wire format
//!
//! Fixed 80 bytes: version, prevBlock, merkleRoot, timestamp, nBits, nonce.
//! Hash fields are carried in natural byte order; display reverses them.

use crate::error::{Result, SpvError};
use crate::serialization::ByteReader;
use crate::types::BlockHeader;

/// Serialized header length.
pub const HEADER_SIZE: usize = 80;

pub fn serialize_header(header: &BlockHeader) -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[0..4].copy_from_slice(&header.version.to_le_bytes());
    bytes[4..36].copy_from_slice(&header.prev_block);
    bytes[36..68].copy_from_slice(&header.merkle_root);
    bytes[68..72].copy_from_slice(&header.timestamp.to_le_bytes());
    bytes[72..76].copy_from_slice(&header.bits.to_le_bytes());
    bytes[76..80].copy_from_slice(&header.nonce.to_le_bytes());
    bytes
}

/// Parse exactly 80 bytes into a header.
pub fn parse_header(data: &[u8]) -> Result<BlockHeader> {
    if data.len() != HEADER_SIZE {
        return Err(SpvError::WrongLength {
            field: "blockHeader",
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }
    let mut reader = ByteReader::new(data);
    let version = reader.read_u32_le()? as i32;
    let prev_block = reader.read_hash()?;
    let merkle_root = reader.read_hash()?;
    let timestamp = reader.read_u32_le()?;
    let bits = reader.read_u32_le()?;
    let nonce = reader.read_u32_le()?;
    Ok(BlockHeader {
        version,
        prev_block,
        merkle_root,
        timestamp,
        bits,
        nonce,
    })
}
