//! Secret keys, WIF decoding and P2PKH address derivation
//!
//! The private scalar lives in a zeroizing container; every intermediate
//! buffer that held key material is overwritten before it is dropped,
//! including on error paths.

use std::borrow::Cow;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{ADDRESS_VERSION, WIF_VERSION};
use crate::curve::{self, Point, GENERATOR};
use crate::ecdsa::N;
use crate::encoding::{base58check_decode, base58check_encode};
use crate::error::{Result, SpvError};
use crate::hashes::hash160;
use crate::u256::U256;

/// A validated secp256k1 secret key. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    secret: [u8; 32],
    #[zeroize(skip)]
    compressed: bool,
}

impl PrivateKey {
    /// Decode a Wallet-Import-Format string: version `0x80`, 32-byte
    /// scalar, optional `0x01` compression marker, Base58Check framing.
    /// The scalar must lie in `[1, n-1]`.
    pub fn from_wif(wif: &str) -> Result<Self> {
        let (version, mut payload) = base58check_decode(wif.trim())?;
        if version != WIF_VERSION {
            payload.zeroize();
            return Err(SpvError::Base58(Cow::Borrowed("wrong WIF version byte")));
        }
        let compressed = match payload.len() {
            32 => false,
            33 if payload[32] == 0x01 => true,
            actual => {
                payload.zeroize();
                return Err(SpvError::WrongLength {
                    field: "wif payload",
                    expected: 32,
                    actual,
                });
            }
        };
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&payload[..32]);
        payload.zeroize();

        let mut scalar = U256::from_be_bytes(&secret);
        let valid = !scalar.is_zero() && scalar < N;
        scalar.zeroize();
        if !valid {
            secret.zeroize();
            return Err(SpvError::InvalidPrivateKey);
        }
        Ok(PrivateKey { secret, compressed })
    }

    /// The scalar as a [`U256`]. Callers must zeroize their copy when done.
    pub(crate) fn scalar(&self) -> U256 {
        U256::from_be_bytes(&self.secret)
    }

    /// Whether the WIF carried the compression marker. The signing profile
    /// always emits compressed public keys; this records the input form.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn public_point(&self) -> Point {
        let mut d = self.scalar();
        let point = curve::scalar_mul(&d, &GENERATOR);
        d.zeroize();
        point
    }

    /// 33-byte compressed public key.
    pub fn public_key(&self) -> Result<[u8; 33]> {
        self.public_point().serialize_compressed()
    }

    /// `hash160` of the compressed public key.
    pub fn pubkey_hash(&self) -> Result<[u8; 20]> {
        Ok(hash160(&self.public_key()?))
    }

    /// Mainnet P2PKH address of the compressed public key, used for the
    /// change output.
    pub fn address(&self) -> Result<String> {
        Ok(base58check_encode(ADDRESS_VERSION, &self.pubkey_hash()?))
    }
}

/// Decode a destination P2PKH address into its 20-byte public-key hash.
/// Only version `0x00` is accepted.
pub fn decode_address(address: &str) -> Result<[u8; 20]> {
    let (version, payload) = base58check_decode(address.trim())
        .map_err(|_| SpvError::BadAddress(Cow::Borrowed("not Base58Check")))?;
    if version != ADDRESS_VERSION {
        return Err(SpvError::WrongAddressVersion(version));
    }
    let actual = payload.len();
    payload.try_into().map_err(|_| SpvError::WrongLength {
        field: "address payload",
        expected: 20,
        actual,
    })
}
