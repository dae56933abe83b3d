//! # spv-core
//!
//! Offline verification and signing core for a Simplified Payment
//! Verification toolkit over a UTXO ledger. Given a self-contained
//! envelope — an unspent output packaged with its raw transaction, Merkle
//! inclusion proof and block header — the core verifies that the output
//! exists in a block satisfying Proof-of-Work, optionally anchored to a
//! compiled-in checkpoint, and constructs a signed spending transaction
//! from a caller-supplied secret key.
//!
//! ## Design
//!
//! Every public operation is a pure, synchronous function of its inputs
//! and an explicit [`pow::VerifierContext`]: no I/O, no globals, no clock
//! reads. Inputs arrive as bytes, results leave as bytes or typed
//! records, and every failure carries a stable machine-readable reason
//! code (see [`error::SpvError::reason_code`]). The crate is built to run
//! air-gapped; nothing in it retries or waits.
//!
//! ## Layering
//!
//! Leaves first: hash primitives and encodings, then the hand-rolled
//! 256-bit arithmetic the secp256k1 field/group operations are built on,
//! then deterministic ECDSA, then header/proof verification, and finally
//! the envelope validator and transaction builder on top.
//!
//! ## Usage
//!
//! ```no_run
//! use spv_core::builder::FeePolicy;
//! use spv_core::constants::DEFAULT_CHECKPOINT;
//! use spv_core::pow::VerifierContext;
//! use spv_core::SpvCore;
//!
//! let core = SpvCore::new();
//! let ctx = VerifierContext::new(DEFAULT_CHECKPOINT, 1_700_000_000);
//! let envelope_bytes: Vec<u8> = std::fs::read("utxo.envelope.json").unwrap();
//! let envelope = core
//!     .parse_and_validate_envelope(&envelope_bytes, &ctx, None)
//!     .unwrap();
//! let signed = core
//!     .build_and_sign_transaction(
//!         &[envelope],
//!         "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn",
//!         "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
//!         100_000,
//!         FeePolicy::PerByte(1),
//!     )
//!     .unwrap();
//! println!("{}", signed.hex);
//! ```

pub mod builder;
pub mod chain;
pub mod constants;
pub mod curve;
pub mod ecdsa;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod hashes;
pub mod keys;
pub mod merkle;
pub mod pow;
pub mod script;
pub mod serialization;
pub mod snapshot;
pub mod transaction_hash;
pub mod types;
pub mod u256;

use builder::{FeePolicy, SignedTransaction};
use chain::ChainView;
use envelope::Envelope;
use error::Result;
use keys::PrivateKey;
use pow::VerifierContext;

/// Facade over the core's three operations. All methods delegate to the
/// corresponding module functions; state lives in the caller's
/// [`VerifierContext`], never here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpvCore;

impl SpvCore {
    pub fn new() -> Self {
        Self
    }

    /// Parse envelope bytes and run the full validation sequence. When a
    /// verified header chain is supplied, the envelope's block must be a
    /// member.
    pub fn parse_and_validate_envelope(
        &self,
        bytes: &[u8],
        ctx: &VerifierContext,
        chain: Option<&ChainView>,
    ) -> Result<Envelope> {
        envelope::parse_and_validate(bytes, ctx, chain)
    }

    /// Verify a binary header chain file against the context's checkpoint.
    /// On success the chain's tip sets the dynamic difficulty floor for
    /// subsequent envelope validation.
    pub fn verify_header_chain(
        &self,
        bytes: &[u8],
        ctx: &mut VerifierContext,
    ) -> Result<ChainView> {
        chain::verify_header_chain(bytes, ctx)
    }

    /// Build, sign and serialize a spend of the given envelopes. The WIF
    /// key must control every input; the destination must be a mainnet
    /// P2PKH address.
    pub fn build_and_sign_transaction(
        &self,
        envelopes: &[Envelope],
        wif: &str,
        destination: &str,
        amount: u64,
        fee: FeePolicy,
    ) -> Result<SignedTransaction> {
        let key = PrivateKey::from_wif(wif)?;
        builder::build_and_sign(envelopes, &key, destination, amount, fee)
    }
}
