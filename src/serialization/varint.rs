//! Variable-length integer encoding
//!
//! The ledger's compact integer: 1 byte below `0xfd`, otherwise a prefix
//! byte followed by 2, 4 or 8 little-endian bytes. Decoding enforces the
//! canonical minimal encoding.

use std::borrow::Cow;

use crate::error::{Result, SpvError};
use crate::serialization::ByteReader;

/// Append the varint encoding of `value` to a buffer.
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Encode a value as a fresh varint byte string.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    write_varint(&mut buf, value);
    buf
}

/// Decode a varint from the reader, rejecting non-canonical encodings
/// (a value small enough for a shorter form encoded with a longer one).
pub fn read_varint(reader: &mut ByteReader<'_>) -> Result<u64> {
    let non_canonical =
        || SpvError::Serialization(Cow::Borrowed("non-canonical varint encoding"));
    match reader.read_u8()? {
        prefix @ 0..=0xfc => Ok(prefix as u64),
        0xfd => {
            let value = reader.read_u16_le()? as u64;
            if value < 0xfd {
                return Err(non_canonical());
            }
            Ok(value)
        }
        0xfe => {
            let value = reader.read_u32_le()? as u64;
            if value <= 0xffff {
                return Err(non_canonical());
            }
            Ok(value)
        }
        0xff => {
            let value = reader.read_u64_le()?;
            if value <= 0xffff_ffff {
                return Err(non_canonical());
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode(bytes: &[u8]) -> Result<u64> {
        let mut reader = ByteReader::new(bytes);
        read_varint(&mut reader)
    }

    #[test]
    fn encode_boundaries() {
        assert_eq!(encode_varint(0), vec![0]);
        assert_eq!(encode_varint(252), vec![252]);
        assert_eq!(encode_varint(253), vec![0xfd, 253, 0]);
        assert_eq!(encode_varint(65535), vec![0xfd, 255, 255]);
        assert_eq!(encode_varint(65536), vec![0xfe, 0, 0, 1, 0]);
        assert_eq!(
            encode_varint(0x1_0000_0000),
            vec![0xff, 0, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn decode_boundaries() {
        assert_eq!(decode(&[0]).unwrap(), 0);
        assert_eq!(decode(&[0xfd, 253, 0]).unwrap(), 253);
        assert_eq!(decode(&[0xfe, 0, 0, 1, 0]).unwrap(), 65536);
        assert_eq!(
            decode(&[0xff, 255, 255, 255, 255, 255, 255, 255, 255]).unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn decode_rejects_truncation() {
        assert!(decode(&[]).is_err());
        assert!(decode(&[0xfd, 0]).is_err());
        assert!(decode(&[0xfe, 0, 0, 0]).is_err());
        assert!(decode(&[0xff, 0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn decode_rejects_non_canonical() {
        assert!(decode(&[0xfd, 252, 0]).is_err());
        assert!(decode(&[0xfe, 255, 255, 0, 0]).is_err());
        assert!(decode(&[0xff, 255, 255, 255, 255, 0, 0, 0, 0]).is_err());
    }

    proptest! {
        #[test]
        fn round_trip(value in any::<u64>()) {
            let encoded = encode_varint(value);
            let mut reader = ByteReader::new(&encoded);
            prop_assert_eq!(read_varint(&mut reader).unwrap(), value);
            prop_assert!(reader.is_empty());
        }
    }
}
