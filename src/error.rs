//! Error types for envelope validation, header verification and signing

use std::borrow::Cow;
use thiserror::Error;

/// Error category, one per failure family.
///
/// Kinds are stable: the enclosing command-line tool maps each kind to a
/// process exit code, and callers branch on kinds rather than variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed byte-level input: hex, lengths, Base58, DER, wire formats.
    Decode,
    /// Structurally invalid record: missing field, wrong type, bad tag.
    Schema,
    /// Cryptographic binding failure: txid, Merkle root, PoW, chain linkage.
    Integrity,
    /// Input violates a policy bound: depth caps, fee cap, difficulty floor.
    Policy,
    /// Key or signature failure inside the signing machinery.
    Crypto,
    /// Caller-supplied spend parameters are unusable.
    Input,
}

impl ErrorKind {
    /// Exit code category for the enclosing CLI. `0` is reserved for success.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Decode => 2,
            ErrorKind::Schema => 3,
            ErrorKind::Integrity => 4,
            ErrorKind::Policy => 5,
            ErrorKind::Crypto => 6,
            ErrorKind::Input => 7,
        }
    }
}

#[derive(Error, Debug, PartialEq, Clone)]
pub enum SpvError {
    #[error("invalid hex in {0}")]
    BadHex(Cow<'static, str>),

    #[error("wrong length for {field}: expected {expected} bytes, got {actual}")]
    WrongLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid Base58Check string: {0}")]
    Base58(Cow<'static, str>),

    #[error("invalid DER signature: {0}")]
    Der(Cow<'static, str>),

    #[error("serialization error: {0}")]
    Serialization(Cow<'static, str>),

    #[error("invalid compact difficulty target 0x{0:08x}")]
    BadCompactTarget(u32),

    #[error("malformed record: {0}")]
    Json(Cow<'static, str>),

    #[error("unknown envelope format tag {0:?}")]
    BadFormatTag(String),

    #[error("unsupported envelope version {0}")]
    BadVersion(u64),

    #[error("vout {vout} out of range for a transaction with {outputs} outputs")]
    VoutOutOfRange { vout: u32, outputs: usize },

    #[error("declared txid does not match hash of rawTx")]
    TxidMismatch,

    #[error("declared satoshis {declared} do not match output value {actual}")]
    ValueMismatch { declared: u64, actual: u64 },

    #[error("declared blockHash does not match hash of blockHeader")]
    BlockHashMismatch,

    #[error("Merkle proof does not replay to the header root")]
    MerkleMismatch,

    #[error("block header does not satisfy proof of work")]
    PowFailed,

    #[error("header chain broken at index {0}")]
    ChainBreak(u32),

    #[error("anchor does not match the configured checkpoint")]
    CheckpointMismatch,

    #[error("declared cumulative work does not match recomputed value")]
    WorkMismatch,

    #[error("block header is not part of the loaded header chain")]
    HeaderNotInChain,

    #[error("output script is not pay-to-public-key-hash")]
    NotP2pkh,

    #[error("output value {0} exceeds the money cap")]
    OverMoneyCap(u64),

    #[error("envelope output value must be positive")]
    ZeroValue,

    #[error("Merkle proof depth {0} exceeds the cap")]
    ProofTooDeep(usize),

    #[error("adjacent duplicate sibling at proof step {0}")]
    DuplicateSibling(usize),

    #[error("duplicate outpoint across envelopes")]
    DuplicateOutpoint,

    #[error("fee {fee} exceeds cap {cap} (10% of input value)")]
    ExcessiveFee { fee: u64, cap: u64 },

    #[error("header target is above the difficulty floor")]
    BelowDifficultyFloor,

    #[error("header timestamp {0} out of bounds")]
    TimestampOutOfBounds(u64),

    #[error("snapshot signer is not in the caller whitelist")]
    UnknownSigner,

    #[error("invalid private key scalar")]
    InvalidPrivateKey,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(Cow<'static, str>),

    #[error("signature failed verification")]
    SignatureInvalid,

    #[error("signature failed self-verification against the derived key")]
    SelfVerifyFailed,

    #[error("nonce derivation exhausted its retry budget")]
    NonceExhausted,

    #[error("invalid destination address: {0}")]
    BadAddress(Cow<'static, str>),

    #[error("destination address version 0x{0:02x} is not pay-to-public-key-hash")]
    WrongAddressVersion(u8),

    #[error("amount {0} does not exceed the dust threshold")]
    DustAmount(u64),

    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: u64, have: u64 },

    #[error("envelope is not controlled by the signing key")]
    ForeignInput,

    #[error("signing session is in state {found}, expected {expected}")]
    SessionState {
        expected: &'static str,
        found: &'static str,
    },
}

impl SpvError {
    /// Failure family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        use SpvError::*;
        match self {
            BadHex(_) | WrongLength { .. } | Base58(_) | Der(_) | Serialization(_)
            | BadCompactTarget(_) => ErrorKind::Decode,
            Json(_) | BadFormatTag(_) | BadVersion(_) | VoutOutOfRange { .. } => ErrorKind::Schema,
            TxidMismatch | ValueMismatch { .. } | BlockHashMismatch | MerkleMismatch
            | PowFailed | ChainBreak(_) | CheckpointMismatch | WorkMismatch
            | HeaderNotInChain => ErrorKind::Integrity,
            NotP2pkh | OverMoneyCap(_) | ZeroValue | ProofTooDeep(_) | DuplicateSibling(_)
            | DuplicateOutpoint | ExcessiveFee { .. } | BelowDifficultyFloor
            | TimestampOutOfBounds(_) | UnknownSigner => ErrorKind::Policy,
            InvalidPrivateKey | InvalidPublicKey(_) | SignatureInvalid | SelfVerifyFailed
            | NonceExhausted => ErrorKind::Crypto,
            BadAddress(_) | WrongAddressVersion(_) | DustAmount(_)
            | InsufficientFunds { .. } | ForeignInput | SessionState { .. } => ErrorKind::Input,
        }
    }

    /// Stable machine-readable reason code, one per rejectable condition.
    pub fn reason_code(&self) -> &'static str {
        use SpvError::*;
        match self {
            BadHex(_) => "decode/hex",
            WrongLength { .. } => "decode/length",
            Base58(_) => "decode/base58",
            Der(_) => "decode/der",
            Serialization(_) => "decode/serialization",
            BadCompactTarget(_) => "decode/compact-target",
            Json(_) => "schema/json",
            BadFormatTag(_) => "schema/format",
            BadVersion(_) => "schema/version",
            VoutOutOfRange { .. } => "schema/vout-out-of-range",
            TxidMismatch => "integrity/txid-mismatch",
            ValueMismatch { .. } => "integrity/value-mismatch",
            BlockHashMismatch => "integrity/block-hash-mismatch",
            MerkleMismatch => "integrity/merkle-mismatch",
            PowFailed => "integrity/pow-failed",
            ChainBreak(_) => "integrity/chain-break",
            CheckpointMismatch => "integrity/checkpoint-mismatch",
            WorkMismatch => "integrity/work-mismatch",
            HeaderNotInChain => "integrity/header-not-in-chain",
            NotP2pkh => "policy/not-p2pkh",
            OverMoneyCap(_) => "policy/over-money-cap",
            ZeroValue => "policy/zero-value",
            ProofTooDeep(_) => "policy/proof-too-deep",
            DuplicateSibling(_) => "policy/duplicate-sibling",
            DuplicateOutpoint => "policy/duplicate-outpoint",
            ExcessiveFee { .. } => "policy/excessive-fee",
            BelowDifficultyFloor => "policy/below-difficulty-floor",
            TimestampOutOfBounds(_) => "policy/timestamp-out-of-bounds",
            UnknownSigner => "policy/unknown-signer",
            InvalidPrivateKey => "crypto/invalid-private-key",
            InvalidPublicKey(_) => "crypto/invalid-public-key",
            SignatureInvalid => "crypto/signature-invalid",
            SelfVerifyFailed => "crypto/self-verify-failed",
            NonceExhausted => "crypto/nonce-exhausted",
            BadAddress(_) => "input/bad-address",
            WrongAddressVersion(_) => "input/address-version",
            DustAmount(_) => "input/dust-amount",
            InsufficientFunds { .. } => "input/insufficient-funds",
            ForeignInput => "input/key-mismatch",
            SessionState { .. } => "input/session-state",
        }
    }
}

pub type Result<T> = std::result::Result<T, SpvError>;
