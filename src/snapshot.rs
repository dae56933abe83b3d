//! Signed header-snapshot verification
//!
//! A snapshot is a flat record distributing a run of headers out-of-band:
//! heights, anchor, raw headers, declared cumulative work, timestamp and a
//! detached ECDSA signature over the canonical serialization. The
//! signature authenticates *distribution only* — chain validity is always
//! recomputed, never taken from the signer.

use std::borrow::Cow;

use serde::Deserialize;

use crate::chain::linked_work;
use crate::constants::{MAX_FUTURE_DRIFT, SNAPSHOT_STALE_AFTER};
use crate::curve::Point;
use crate::ecdsa;
use crate::encoding::{decode_display_hash, decode_hex};
use crate::error::{Result, SpvError};
use crate::hashes::{ct_eq, hash256};
use crate::pow::header_hash;
use crate::serialization::header::{parse_header, HEADER_SIZE};
use crate::types::{BlockHeader, Hash};
use crate::u256::U256;

/// Snapshot schema version this verifier understands.
const SNAPSHOT_VERSION: u64 = 1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    version: u64,
    start_height: u64,
    end_height: u64,
    anchor_hash: String,
    headers: String,
    cumulative_work: String,
    timestamp: u64,
    signer_pub_key: String,
    signature: String,
}

/// Outcome of a successful snapshot verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotVerdict {
    pub start_height: u64,
    pub end_height: u64,
    pub header_count: u32,
    /// Hash of the last header, internal byte order.
    pub tip_hash: Hash,
    /// Recomputed cumulative work, big-endian.
    pub cumulative_work: [u8; 32],
    /// Set when the snapshot is older than the staleness window; the
    /// caller decides how loudly to surface it.
    pub stale: bool,
}

/// Canonical byte serialization the signature covers: heights as 8-byte
/// big-endian, anchor as raw bytes, headers raw, work as 32-byte
/// big-endian, timestamp as 8-byte big-endian.
fn canonical_message(
    start_height: u64,
    end_height: u64,
    anchor_hash: &Hash,
    headers_raw: &[u8],
    cumulative_work: &[u8; 32],
    timestamp: u64,
) -> Hash {
    let mut message =
        Vec::with_capacity(8 + 8 + 32 + headers_raw.len() + 32 + 8);
    message.extend_from_slice(&start_height.to_be_bytes());
    message.extend_from_slice(&end_height.to_be_bytes());
    message.extend_from_slice(anchor_hash);
    message.extend_from_slice(headers_raw);
    message.extend_from_slice(cumulative_work);
    message.extend_from_slice(&timestamp.to_be_bytes());
    hash256(&message)
}

fn decode_work(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = decode_hex(hex_str, "cumulativeWork")?;
    if bytes.len() > 32 {
        return Err(SpvError::WrongLength {
            field: "cumulativeWork",
            expected: 32,
            actual: bytes.len(),
        });
    }
    let mut work = [0u8; 32];
    work[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(work)
}

/// Verify a snapshot record against a caller-supplied signer whitelist.
pub fn verify_snapshot(
    bytes: &[u8],
    whitelist: &[[u8; 33]],
    now: u64,
) -> Result<SnapshotVerdict> {
    // Schema.
    let raw: RawSnapshot = serde_json::from_slice(bytes)
        .map_err(|e| SpvError::Json(Cow::Owned(e.to_string())))?;
    if raw.version != SNAPSHOT_VERSION {
        return Err(SpvError::BadVersion(raw.version));
    }
    if raw.end_height < raw.start_height {
        return Err(SpvError::Json(Cow::Borrowed(
            "endHeight below startHeight",
        )));
    }
    let anchor_hash = decode_display_hash(&raw.anchor_hash, "anchorHash")?;
    let headers_raw = decode_hex(&raw.headers, "headers")?;
    let declared_work = decode_work(&raw.cumulative_work)?;
    let signer_bytes = decode_hex(&raw.signer_pub_key, "signerPubKey")?;
    let signature_bytes = decode_hex(&raw.signature, "signature")?;

    let expected_count = (raw.end_height - raw.start_height).checked_add(1).ok_or(
        SpvError::Json(Cow::Borrowed("height range too wide")),
    )?;
    if headers_raw.len() % HEADER_SIZE != 0
        || (headers_raw.len() / HEADER_SIZE) as u64 != expected_count
    {
        return Err(SpvError::WrongLength {
            field: "headers",
            expected: (expected_count as usize).saturating_mul(HEADER_SIZE),
            actual: headers_raw.len(),
        });
    }

    // Timestamp bounds.
    if raw.timestamp > now + MAX_FUTURE_DRIFT {
        return Err(SpvError::TimestampOutOfBounds(raw.timestamp));
    }
    let stale = now.saturating_sub(raw.timestamp) > SNAPSHOT_STALE_AFTER;

    // Signer membership.
    if !whitelist.iter().any(|key| ct_eq(key, &signer_bytes)) {
        return Err(SpvError::UnknownSigner);
    }

    // Internal chain consistency.
    let headers: Vec<BlockHeader> = headers_raw
        .chunks(HEADER_SIZE)
        .map(parse_header)
        .collect::<Result<_>>()?;
    let recomputed = linked_work(&anchor_hash, &headers)?;

    // Declared work must match the recomputation exactly.
    if recomputed != U256::from_be_bytes(&declared_work) {
        return Err(SpvError::WorkMismatch);
    }

    // Signature over the canonical serialization.
    let signer = Point::parse(&signer_bytes)?;
    let signature = ecdsa::der_parse(&signature_bytes)?;
    let message = canonical_message(
        raw.start_height,
        raw.end_height,
        &anchor_hash,
        &headers_raw,
        &declared_work,
        raw.timestamp,
    );
    if !ecdsa::verify(&signer, &message, &signature) {
        return Err(SpvError::SignatureInvalid);
    }

    let tip_hash = headers
        .last()
        .map(header_hash)
        .unwrap_or(anchor_hash);
    Ok(SnapshotVerdict {
        start_height: raw.start_height,
        end_height: raw.end_height,
        header_count: headers.len() as u32,
        tip_hash,
        cumulative_work: declared_work,
        stale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GENESIS_TIMESTAMP;
    use crate::curve::{self, GENERATOR};
    use crate::encoding::encode_display_hash;
    use crate::pow::check_proof_of_work;
    use crate::serialization::header::serialize_header;
    use crate::u256::U256;
    use serde_json::{json, Value};

    const EASY_BITS: u32 = 0x207fffff;

    fn mine(prev_block: Hash, timestamp: u32) -> BlockHeader {
        let mut header = BlockHeader {
            version: 1,
            prev_block,
            merkle_root: [0x77; 32],
            timestamp,
            bits: EASY_BITS,
            nonce: 0,
        };
        while check_proof_of_work(&header).is_err() {
            header.nonce += 1;
        }
        header
    }

    fn signer_scalar() -> U256 {
        U256::from_u64(0x5eed)
    }

    fn signer_pubkey() -> [u8; 33] {
        curve::scalar_mul(&signer_scalar(), &GENERATOR)
            .serialize_compressed()
            .unwrap()
    }

    fn signed_snapshot(now: u64) -> Value {
        let anchor: Hash = [0x44; 32];
        let mut headers_raw = Vec::new();
        let mut prev = anchor;
        let mut headers = Vec::new();
        for i in 0..3u64 {
            let header = mine(prev, (GENESIS_TIMESTAMP + 600 * i) as u32);
            prev = header_hash(&header);
            headers_raw.extend_from_slice(&serialize_header(&header));
            headers.push(header);
        }
        let work = linked_work(&anchor, &headers).unwrap().to_be_bytes();
        let timestamp = now - 600;

        let message = canonical_message(500, 502, &anchor, &headers_raw, &work, timestamp);
        let signature = ecdsa::sign(&signer_scalar(), &message).unwrap();

        json!({
            "version": 1,
            "startHeight": 500,
            "endHeight": 502,
            "anchorHash": encode_display_hash(&anchor),
            "headers": hex::encode(&headers_raw),
            "cumulativeWork": hex::encode(work),
            "timestamp": timestamp,
            "signerPubKey": hex::encode(signer_pubkey()),
            "signature": hex::encode(ecdsa::der_encode(&signature)),
        })
    }

    fn verify(value: &Value, now: u64) -> Result<SnapshotVerdict> {
        verify_snapshot(value.to_string().as_bytes(), &[signer_pubkey()], now)
    }

    #[test]
    fn accepts_valid_snapshot() {
        let now = GENESIS_TIMESTAMP + 86_400;
        let verdict = verify(&signed_snapshot(now), now).unwrap();
        assert_eq!(verdict.start_height, 500);
        assert_eq!(verdict.end_height, 502);
        assert_eq!(verdict.header_count, 3);
        assert!(!verdict.stale);
    }

    #[test]
    fn flags_stale_snapshot() {
        let now = GENESIS_TIMESTAMP + 86_400;
        let value = signed_snapshot(now);
        let later = now + SNAPSHOT_STALE_AFTER + 1_000;
        let verdict = verify(&value, later).unwrap();
        assert!(verdict.stale);
    }

    #[test]
    fn rejects_future_timestamp() {
        let now = GENESIS_TIMESTAMP + 86_400;
        let value = signed_snapshot(now + MAX_FUTURE_DRIFT + 10_000);
        assert!(matches!(
            verify(&value, now),
            Err(SpvError::TimestampOutOfBounds(_))
        ));
    }

    #[test]
    fn rejects_unknown_signer() {
        let now = GENESIS_TIMESTAMP + 86_400;
        let value = signed_snapshot(now);
        let other = curve::scalar_mul(&U256::from_u64(7), &GENERATOR)
            .serialize_compressed()
            .unwrap();
        assert_eq!(
            verify_snapshot(value.to_string().as_bytes(), &[other], now),
            Err(SpvError::UnknownSigner)
        );
    }

    #[test]
    fn rejects_work_mismatch() {
        let now = GENESIS_TIMESTAMP + 86_400;
        let mut value = signed_snapshot(now);
        let mut work = [0u8; 32];
        work[31] = 1;
        value["cumulativeWork"] = json!(hex::encode(work));
        assert_eq!(verify(&value, now), Err(SpvError::WorkMismatch));
    }

    #[test]
    fn rejects_tampered_headers() {
        let now = GENESIS_TIMESTAMP + 86_400;
        let mut value = signed_snapshot(now);
        let mut raw = hex::decode(value["headers"].as_str().unwrap()).unwrap();
        // Break the second header's linkage.
        raw[80 + 4] ^= 0xff;
        value["headers"] = json!(hex::encode(&raw));
        assert_eq!(verify(&value, now), Err(SpvError::ChainBreak(1)));
    }

    #[test]
    fn rejects_forged_signature() {
        let now = GENESIS_TIMESTAMP + 86_400;
        let mut value = signed_snapshot(now);
        // Re-sign nothing: shift the declared start height so the canonical
        // message changes while counts still line up.
        value["startHeight"] = json!(499);
        value["endHeight"] = json!(501);
        assert_eq!(verify(&value, now), Err(SpvError::SignatureInvalid));
    }

    #[test]
    fn rejects_count_mismatch() {
        let now = GENESIS_TIMESTAMP + 86_400;
        let mut value = signed_snapshot(now);
        value["endHeight"] = json!(503);
        assert!(matches!(
            verify(&value, now),
            Err(SpvError::WrongLength { .. })
        ));
    }

    #[test]
    fn rejects_wrong_version() {
        let now = GENESIS_TIMESTAMP + 86_400;
        let mut value = signed_snapshot(now);
        value["version"] = json!(2);
        assert_eq!(verify(&value, now), Err(SpvError::BadVersion(2)));
    }
}
