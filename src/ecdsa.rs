//! Deterministic ECDSA over secp256k1
//!
//! RFC 6979 nonce derivation (HMAC-SHA-256 expansion with rejection
//! sampling), signing with low-S normalization, verification, and strict
//! DER encoding/parsing. Signing refuses to release any signature that
//! does not verify against the public key derived from the same scalar.

use std::borrow::Cow;

use zeroize::Zeroize;

use crate::curve::{self, Point, GENERATOR};
use crate::error::{Result, SpvError};
use crate::hashes::hmac_sha256;
use crate::u256::{self, U256};

/// Group order `n`.
pub const N: U256 = U256([
    0xbfd25e8cd0364141,
    0xbaaedce6af48a03b,
    0xfffffffffffffffe,
    0xffffffffffffffff,
]);

/// `n / 2`, the low-S boundary.
const N_HALF: U256 = U256([
    0xdfe92f46681b20a0,
    0x5d576e7357a4501d,
    0xffffffffffffffff,
    0x7fffffffffffffff,
]);

/// `2^256 mod n`, the folding constant for scalar reduction.
const N_C: U256 = U256([0x402da1732fc9bebf, 0x4551231950b75fc4, 0x0000000000000001, 0]);

/// Retry budget for the nonce loop. RFC 6979 rejection essentially never
/// fires on a 256-bit curve; exhausting this indicates corrupted state.
const MAX_NONCE_ATTEMPTS: usize = 64;

/// ECDSA signature as a reduced scalar pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: U256,
    pub s: U256,
}

/// Reduce a 256-bit big-endian value modulo `n`.
fn scalar_from_bytes(bytes: &[u8; 32]) -> U256 {
    let value = U256::from_be_bytes(bytes);
    if value >= N {
        value.wrapping_sub(&N)
    } else {
        value
    }
}

fn scalar_mul_mod(a: &U256, b: &U256) -> U256 {
    u256::mul_mod(a, b, &N, &N_C)
}

fn scalar_inv(a: &U256) -> U256 {
    u256::inv_mod(a, &N, &N_C)
}

/// RFC 6979 HMAC-DRBG state, seeded from the key and message hash.
/// Successive calls to [`NonceGenerator::next`] walk the retry chain, so
/// `r = 0` / `s = 0` rejections resume exactly where the RFC dictates.
struct NonceGenerator {
    k: [u8; 32],
    v: [u8; 32],
}

impl NonceGenerator {
    fn new(d: &U256, z: &[u8; 32]) -> Self {
        let mut x = d.to_be_bytes();
        let h1 = scalar_from_bytes(z).to_be_bytes();

        let mut gen = NonceGenerator {
            k: [0u8; 32],
            v: [1u8; 32],
        };
        let mut seed = Vec::with_capacity(32 + 1 + 32 + 32);
        seed.extend_from_slice(&gen.v);
        seed.push(0x00);
        seed.extend_from_slice(&x);
        seed.extend_from_slice(&h1);
        gen.k = hmac_sha256(&gen.k, &seed);
        gen.v = hmac_sha256(&gen.k, &gen.v);
        seed.clear();
        seed.extend_from_slice(&gen.v);
        seed.push(0x01);
        seed.extend_from_slice(&x);
        seed.extend_from_slice(&h1);
        gen.k = hmac_sha256(&gen.k, &seed);
        gen.v = hmac_sha256(&gen.k, &gen.v);

        seed.zeroize();
        x.zeroize();
        gen
    }

    /// Next candidate in `[1, n-1]`, rejection-sampling out-of-range draws.
    fn next(&mut self) -> U256 {
        loop {
            self.v = hmac_sha256(&self.k, &self.v);
            let candidate = U256::from_be_bytes(&self.v);

            // Advance the retry chain regardless, so a later call continues
            // from the correct state.
            let mut update = [0u8; 33];
            update[..32].copy_from_slice(&self.v);
            self.k = hmac_sha256(&self.k, &update);
            self.v = hmac_sha256(&self.k, &self.v);

            if !candidate.is_zero() && candidate < N {
                return candidate;
            }
        }
    }
}

impl Drop for NonceGenerator {
    fn drop(&mut self) {
        self.k.zeroize();
        self.v.zeroize();
    }
}

/// Sign a 32-byte message hash with scalar `d`.
///
/// Deterministic: the same `(z, d)` pair always produces the same
/// signature. The result is low-S normalized and self-verified against
/// `dG` before being returned.
pub fn sign(d: &U256, z: &[u8; 32]) -> Result<Signature> {
    if d.is_zero() || *d >= N {
        return Err(SpvError::InvalidPrivateKey);
    }
    let z_scalar = scalar_from_bytes(z);
    let mut generator = NonceGenerator::new(d, z);

    for _ in 0..MAX_NONCE_ATTEMPTS {
        let mut k = generator.next();
        let kg = curve::scalar_mul(&k, &GENERATOR);
        let Some(kg_x) = kg.x() else {
            k.zeroize();
            continue;
        };
        let r = if kg_x >= N { kg_x.wrapping_sub(&N) } else { kg_x };
        if r.is_zero() {
            k.zeroize();
            continue;
        }

        let mut k_inv = scalar_inv(&k);
        let rd = scalar_mul_mod(&r, d);
        let mut s = scalar_mul_mod(&k_inv, &u256::add_mod(&z_scalar, &rd, &N));
        k.zeroize();
        k_inv.zeroize();
        if s.is_zero() {
            continue;
        }
        if s > N_HALF {
            s = N.wrapping_sub(&s);
        }

        let signature = Signature { r, s };
        let public = curve::scalar_mul(d, &GENERATOR);
        if !verify(&public, z, &signature) {
            return Err(SpvError::SelfVerifyFailed);
        }
        return Ok(signature);
    }
    Err(SpvError::NonceExhausted)
}

/// Standard ECDSA verification against a public point.
pub fn verify(public: &Point, z: &[u8; 32], signature: &Signature) -> bool {
    let Signature { r, s } = signature;
    if r.is_zero() || *r >= N || s.is_zero() || *s >= N {
        return false;
    }
    if public.is_infinity() || !public.is_on_curve() {
        return false;
    }
    let z_scalar = scalar_from_bytes(z);
    let s_inv = scalar_inv(s);
    let u1 = scalar_mul_mod(&z_scalar, &s_inv);
    let u2 = scalar_mul_mod(r, &s_inv);
    let x_point = curve::add(
        &curve::scalar_mul(&u1, &GENERATOR),
        &curve::scalar_mul(&u2, public),
    );
    match x_point.x() {
        None => false,
        Some(x) => {
            let x_mod_n = if x >= N { x.wrapping_sub(&N) } else { x };
            x_mod_n == *r
        }
    }
}

/// Whether a signature already satisfies the low-S rule.
pub fn is_low_s(signature: &Signature) -> bool {
    signature.s <= N_HALF
}

fn der_push_integer(out: &mut Vec<u8>, value: &U256) {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(31);
    let mut body: Vec<u8> = Vec::with_capacity(33);
    if bytes[start] & 0x80 != 0 {
        body.push(0x00);
    }
    body.extend_from_slice(&bytes[start..]);
    out.push(0x02);
    out.push(body.len() as u8);
    out.extend_from_slice(&body);
}

/// DER-encode a signature in minimal integer form.
pub fn der_encode(signature: &Signature) -> Vec<u8> {
    let mut body = Vec::with_capacity(72);
    der_push_integer(&mut body, &signature.r);
    der_push_integer(&mut body, &signature.s);
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(0x30);
    out.push(body.len() as u8);
    out.extend_from_slice(&body);
    out
}

fn der_read_integer(data: &[u8], offset: &mut usize) -> Result<U256> {
    let err = |msg: &'static str| SpvError::Der(Cow::Borrowed(msg));
    if data.len() < *offset + 2 {
        return Err(err("truncated integer"));
    }
    if data[*offset] != 0x02 {
        return Err(err("expected INTEGER tag"));
    }
    let len = data[*offset + 1] as usize;
    *offset += 2;
    if len == 0 || data.len() < *offset + len {
        return Err(err("bad integer length"));
    }
    let body = &data[*offset..*offset + len];
    *offset += len;
    if body[0] & 0x80 != 0 {
        return Err(err("negative integer"));
    }
    if body.len() > 1 && body[0] == 0x00 && body[1] & 0x80 == 0 {
        return Err(err("non-minimal integer"));
    }
    let digits = if body[0] == 0x00 { &body[1..] } else { body };
    if digits.len() > 32 {
        return Err(err("integer too wide"));
    }
    let mut bytes = [0u8; 32];
    bytes[32 - digits.len()..].copy_from_slice(digits);
    Ok(U256::from_be_bytes(&bytes))
}

/// Parse a strict minimal-form DER signature.
pub fn der_parse(data: &[u8]) -> Result<Signature> {
    let err = |msg: &'static str| SpvError::Der(Cow::Borrowed(msg));
    if data.len() < 2 || data[0] != 0x30 {
        return Err(err("expected SEQUENCE tag"));
    }
    if data[1] as usize != data.len() - 2 {
        return Err(err("bad sequence length"));
    }
    let mut offset = 2;
    let r = der_read_integer(data, &mut offset)?;
    let s = der_read_integer(data, &mut offset)?;
    if offset != data.len() {
        return Err(err("trailing bytes"));
    }
    Ok(Signature { r, s })
}
