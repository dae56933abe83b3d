//! Spending-transaction construction and signing
//!
//! Consumes validated envelopes all controlled by one key, a destination
//! address and an amount, and produces the finalized transaction hex. The
//! signing session walks `Loaded → Validated → Composed → Signed →
//! Emitted`; transitions are one-shot and any failure parks the session in
//! a terminal `Rejected` state.

use std::collections::HashSet;

use zeroize::Zeroize;

use crate::constants::{
    DUST_THRESHOLD, FEE_CAP_DIVISOR, MAX_SATOSHIS, P2PKH_INPUT_SIZE, P2PKH_OUTPUT_SIZE,
    SIGHASH_FORKID_ALL, TX_OVERHEAD_SIZE,
};
use crate::ecdsa;
use crate::encoding::encode_display_hash;
use crate::envelope::Envelope;
use crate::error::{Result, SpvError};
use crate::keys::{decode_address, PrivateKey};
use crate::script::{p2pkh_locking_script, p2pkh_unlocking_script};
use crate::serialization::transaction::{serialize_outputs, serialize_transaction};
use crate::transaction_hash::{compute_txid, sighash, PreimageInput};
use crate::types::{Hash, OutPoint, Transaction, TransactionInput, TransactionOutput};

/// How the fee is determined: a flat per-byte rate over the estimated
/// serialized size, or an explicit total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicy {
    PerByte(u64),
    Flat(u64),
}

/// The finished product of a signing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Finalized transaction, hex encoded.
    pub hex: String,
    /// Display-order txid of the finalized transaction.
    pub txid: String,
    pub fee: u64,
    pub change: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Loaded,
    Validated,
    Composed,
    Signed,
    Emitted,
    Rejected,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Loaded => "Loaded",
            State::Validated => "Validated",
            State::Composed => "Composed",
            State::Signed => "Signed",
            State::Emitted => "Emitted",
            State::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SpendData {
    txid: Hash,
    vout: u32,
    satoshis: u64,
    pubkey_hash: [u8; 20],
}

/// One-shot signing session over a fixed input set.
pub struct SigningSession {
    state: State,
    inputs: Vec<SpendData>,
    dest_pubkey_hash: [u8; 20],
    amount: u64,
    policy: FeePolicy,
    fee: u64,
    change: u64,
    outputs: Vec<TransactionOutput>,
    tx: Option<Transaction>,
}

impl SigningSession {
    /// Load a session from validated envelopes and spend parameters.
    pub fn new(
        envelopes: &[Envelope],
        destination: &str,
        amount: u64,
        policy: FeePolicy,
    ) -> Result<SigningSession> {
        let dest_pubkey_hash = decode_address(destination)?;
        let inputs = envelopes
            .iter()
            .map(|e| SpendData {
                txid: *e.txid(),
                vout: e.vout(),
                satoshis: e.satoshis(),
                pubkey_hash: *e.pubkey_hash(),
            })
            .collect();
        Ok(SigningSession {
            state: State::Loaded,
            inputs,
            dest_pubkey_hash,
            amount,
            policy,
            fee: 0,
            change: 0,
            outputs: Vec::new(),
            tx: None,
        })
    }

    /// Current state, for session observability.
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    fn expect(&mut self, expected: State) -> Result<()> {
        if self.state != expected {
            let found = self.state.name();
            self.state = State::Rejected;
            return Err(SpvError::SessionState {
                expected: expected.name(),
                found,
            });
        }
        Ok(())
    }

    fn advance<T>(&mut self, next: State, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.state = next;
                Ok(value)
            }
            Err(error) => {
                self.state = State::Rejected;
                Err(error)
            }
        }
    }

    /// Check spendability: unique outpoints, dust bound on the amount, fee
    /// policy within the sanity cap, sufficient funds.
    pub fn validate(&mut self) -> Result<()> {
        self.expect(State::Loaded)?;
        let result = self.validate_inner();
        self.advance(State::Validated, result)
    }

    fn validate_inner(&mut self) -> Result<()> {
        let mut seen: HashSet<OutPoint> = HashSet::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let outpoint = OutPoint {
                txid: input.txid,
                vout: input.vout,
            };
            if !seen.insert(outpoint) {
                return Err(SpvError::DuplicateOutpoint);
            }
        }

        if self.amount <= DUST_THRESHOLD {
            return Err(SpvError::DustAmount(self.amount));
        }

        let total: u128 = self.inputs.iter().map(|i| i.satoshis as u128).sum();
        if total > MAX_SATOSHIS as u128 {
            return Err(SpvError::OverMoneyCap(total.min(u64::MAX as u128) as u64));
        }
        let total = total as u64;

        // Fee under the assumption of a change output; dust folding below
        // only ever shrinks the transaction.
        let size = TX_OVERHEAD_SIZE
            + self.inputs.len() as u64 * P2PKH_INPUT_SIZE
            + 2 * P2PKH_OUTPUT_SIZE;
        let fee = match self.policy {
            FeePolicy::PerByte(rate) => rate.saturating_mul(size),
            FeePolicy::Flat(fee) => fee,
        };
        let cap = total / FEE_CAP_DIVISOR;
        if fee > cap {
            return Err(SpvError::ExcessiveFee { fee, cap });
        }

        let need = self.amount.saturating_add(fee);
        if total < need {
            return Err(SpvError::InsufficientFunds { need, have: total });
        }

        let change = total - self.amount - fee;
        if change <= DUST_THRESHOLD {
            // Dust change is not worth an output; fold it into the fee.
            self.fee = total - self.amount;
            self.change = 0;
        } else {
            self.fee = fee;
            self.change = change;
        }
        Ok(())
    }

    /// Build the unsigned skeleton: payment output, change output back to
    /// the signer when above dust, placeholder scriptSigs.
    pub fn compose(&mut self, signer_pubkey_hash: &[u8; 20]) -> Result<()> {
        self.expect(State::Validated)?;
        let result = self.compose_inner(signer_pubkey_hash);
        self.advance(State::Composed, result)
    }

    fn compose_inner(&mut self, signer_pubkey_hash: &[u8; 20]) -> Result<()> {
        // The supported profile spends inputs controlled by a single key.
        for input in &self.inputs {
            if &input.pubkey_hash != signer_pubkey_hash {
                return Err(SpvError::ForeignInput);
            }
        }

        let mut outputs = vec![TransactionOutput {
            value: self.amount,
            script_pubkey: p2pkh_locking_script(&self.dest_pubkey_hash),
        }];
        if self.change > 0 {
            outputs.push(TransactionOutput {
                value: self.change,
                script_pubkey: p2pkh_locking_script(signer_pubkey_hash),
            });
        }
        self.outputs = outputs;

        self.tx = Some(Transaction {
            version: 1,
            inputs: self
                .inputs
                .iter()
                .map(|input| TransactionInput {
                    prevout: OutPoint {
                        txid: input.txid,
                        vout: input.vout,
                    },
                    script_sig: Vec::new(),
                    sequence: 0xffff_ffff,
                })
                .collect(),
            outputs: self.outputs.clone(),
            lock_time: 0,
        });
        Ok(())
    }

    /// Sign every input with the session key. Each signature is DER
    /// encoded, tagged with the fork-id sighash byte and self-verified
    /// before it is placed into a scriptSig.
    pub fn sign(&mut self, key: &PrivateKey) -> Result<()> {
        self.expect(State::Composed)?;
        let result = self.sign_inner(key);
        self.advance(State::Signed, result)
    }

    fn sign_inner(&mut self, key: &PrivateKey) -> Result<()> {
        let public_key = key.public_key()?;
        let preimage_inputs: Vec<PreimageInput> = self
            .inputs
            .iter()
            .map(|input| PreimageInput {
                txid: input.txid,
                vout: input.vout,
                satoshis: input.satoshis,
                sequence: 0xffff_ffff,
            })
            .collect();
        let outputs_serialized = serialize_outputs(&self.outputs);

        let tx = self.tx.as_mut().expect("composed transaction present");
        let mut scalar = key.scalar();
        for (index, input) in self.inputs.iter().enumerate() {
            let script_code = p2pkh_locking_script(&input.pubkey_hash);
            let z = sighash(
                tx.version,
                &preimage_inputs,
                &outputs_serialized,
                index,
                &script_code,
                tx.lock_time,
            );
            let signature = match ecdsa::sign(&scalar, &z) {
                Ok(signature) => signature,
                Err(error) => {
                    scalar.zeroize();
                    return Err(error);
                }
            };
            let mut sig_bytes = ecdsa::der_encode(&signature);
            sig_bytes.push(SIGHASH_FORKID_ALL);
            tx.inputs[index].script_sig = p2pkh_unlocking_script(&sig_bytes, &public_key);
        }
        scalar.zeroize();
        Ok(())
    }

    /// Serialize the finalized transaction.
    pub fn emit(&mut self) -> Result<SignedTransaction> {
        self.expect(State::Signed)?;
        let tx = self.tx.take().expect("signed transaction present");
        let bytes = serialize_transaction(&tx);
        let result = Ok(SignedTransaction {
            hex: hex::encode(&bytes),
            txid: encode_display_hash(&compute_txid(&bytes)),
            fee: self.fee,
            change: self.change,
        });
        self.advance(State::Emitted, result)
    }
}

/// Drive a full session: validate, compose, sign, emit.
pub fn build_and_sign(
    envelopes: &[Envelope],
    key: &PrivateKey,
    destination: &str,
    amount: u64,
    policy: FeePolicy,
) -> Result<SignedTransaction> {
    let mut session = SigningSession::new(envelopes, destination, amount, policy)?;
    session.validate()?;
    session.compose(&key.pubkey_hash()?)?;
    session.sign(key)?;
    session.emit()
}
