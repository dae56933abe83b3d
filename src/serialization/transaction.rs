//! Transaction wire format
//!
//! Pre-SegWit layout: version, varint-counted inputs and outputs, locktime.
//! Parsing is strict — counts are sanity-bounded against the remaining
//! buffer and the envelope path requires every byte to be consumed.

use std::borrow::Cow;

use crate::error::{Result, SpvError};
use crate::serialization::varint::{read_varint, write_varint};
use crate::serialization::ByteReader;
use crate::types::{OutPoint, Transaction, TransactionInput, TransactionOutput};

/// Minimum serialized size of an input: outpoint, empty script, sequence.
const MIN_INPUT_SIZE: usize = 41;
/// Minimum serialized size of an output: value plus empty script.
const MIN_OUTPUT_SIZE: usize = 9;

/// Serialize a transaction to its wire bytes.
pub fn serialize_transaction(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(estimated_size(tx));

    buf.extend_from_slice(&tx.version.to_le_bytes());

    write_varint(&mut buf, tx.inputs.len() as u64);
    for input in &tx.inputs {
        buf.extend_from_slice(&input.prevout.txid);
        buf.extend_from_slice(&input.prevout.vout.to_le_bytes());
        write_varint(&mut buf, input.script_sig.len() as u64);
        buf.extend_from_slice(&input.script_sig);
        buf.extend_from_slice(&input.sequence.to_le_bytes());
    }

    write_varint(&mut buf, tx.outputs.len() as u64);
    for output in &tx.outputs {
        buf.extend_from_slice(&output.value.to_le_bytes());
        write_varint(&mut buf, output.script_pubkey.len() as u64);
        buf.extend_from_slice(&output.script_pubkey);
    }

    buf.extend_from_slice(&tx.lock_time.to_le_bytes());
    buf
}

/// Serialize only the outputs section, as hashed by the sighash preimage.
pub fn serialize_outputs(outputs: &[TransactionOutput]) -> Vec<u8> {
    let mut buf = Vec::new();
    for output in outputs {
        buf.extend_from_slice(&output.value.to_le_bytes());
        write_varint(&mut buf, output.script_pubkey.len() as u64);
        buf.extend_from_slice(&output.script_pubkey);
    }
    buf
}

fn estimated_size(tx: &Transaction) -> usize {
    8 + tx
        .inputs
        .iter()
        .map(|i| MIN_INPUT_SIZE + i.script_sig.len())
        .sum::<usize>()
        + tx.outputs
            .iter()
            .map(|o| MIN_OUTPUT_SIZE + o.script_pubkey.len())
            .sum::<usize>()
}

/// Parse a transaction, requiring the buffer to contain exactly one
/// transaction with no trailing bytes.
pub fn parse_transaction(data: &[u8]) -> Result<Transaction> {
    let mut reader = ByteReader::new(data);
    let tx = read_transaction(&mut reader)?;
    if !reader.is_empty() {
        return Err(SpvError::Serialization(Cow::Borrowed(
            "trailing bytes after transaction",
        )));
    }
    Ok(tx)
}

fn read_transaction(reader: &mut ByteReader<'_>) -> Result<Transaction> {
    let version = reader.read_u32_le()?;

    let input_count = read_varint(reader)?;
    check_count(input_count, MIN_INPUT_SIZE, reader.remaining(), "input")?;
    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        let txid = reader.read_hash()?;
        let vout = reader.read_u32_le()?;
        let script_len = read_varint(reader)?;
        check_count(script_len, 1, reader.remaining(), "scriptSig byte")?;
        let script_sig = reader.take(script_len as usize)?.to_vec();
        let sequence = reader.read_u32_le()?;
        inputs.push(TransactionInput {
            prevout: OutPoint { txid, vout },
            script_sig,
            sequence,
        });
    }

    let output_count = read_varint(reader)?;
    check_count(output_count, MIN_OUTPUT_SIZE, reader.remaining(), "output")?;
    let mut outputs = Vec::with_capacity(output_count as usize);
    for _ in 0..output_count {
        let value = reader.read_u64_le()?;
        let script_len = read_varint(reader)?;
        check_count(script_len, 1, reader.remaining(), "scriptPubKey byte")?;
        let script_pubkey = reader.take(script_len as usize)?.to_vec();
        outputs.push(TransactionOutput {
            value,
            script_pubkey,
        });
    }

    let lock_time = reader.read_u32_le()?;
    Ok(Transaction {
        version,
        inputs,
        outputs,
        lock_time,
    })
}

/// Reject counts that cannot possibly fit the remaining buffer, before any
/// allocation is sized from them.
fn check_count(count: u64, unit_size: usize, remaining: usize, what: &'static str) -> Result<()> {
    if count.saturating_mul(unit_size as u64) > remaining as u64 {
        return Err(SpvError::Serialization(Cow::Owned(format!(
            "{what} count {count} exceeds buffer"
        ))));
    }
    Ok(())
}
