//! secp256k1 field and group arithmetic
//!
//! Affine-coordinate group law on `y^2 = x^3 + 7` over the prime field,
//! with a fixed-iteration double-and-add scalar multiplication that walks
//! all 256 scalar bits. Field inversion goes through Fermat's little
//! theorem and square roots through the `(p+1)/4` exponent, so the only
//! data-dependent branches are on public values.

use std::borrow::Cow;

use crate::error::{Result, SpvError};
use crate::u256::{self, U256};

/// Field prime `p = 2^256 - 2^32 - 977`.
pub const P: U256 = U256([
    0xfffffffefffffc2f,
    0xffffffffffffffff,
    0xffffffffffffffff,
    0xffffffffffffffff,
]);

/// `2^256 mod p`, the folding constant for reduction.
const P_C: U256 = U256([0x00000001000003d1, 0, 0, 0]);

/// `(p + 1) / 4`; exponentiation by this yields a square root since
/// `p ≡ 3 (mod 4)`.
const SQRT_EXP: U256 = U256([
    0xffffffffbfffff0c,
    0xffffffffffffffff,
    0xffffffffffffffff,
    0x3fffffffffffffff,
]);

/// Generator point coordinates.
const GX: U256 = U256([
    0x59f2815b16f81798,
    0x029bfcdb2dce28d9,
    0x55a06295ce870b07,
    0x79be667ef9dcbbac,
]);
const GY: U256 = U256([
    0x9c47d08ffb10d4b8,
    0xfd17b448a6855419,
    0x5da4fbfc0e1108a8,
    0x483ada7726a3c465,
]);

/// The group generator `G`.
pub const GENERATOR: Point = Point::Affine { x: GX, y: GY };

/// Curve point in affine coordinates, with the identity as its own case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Point {
    Infinity,
    Affine { x: U256, y: U256 },
}

fn fe_add(a: &U256, b: &U256) -> U256 {
    u256::add_mod(a, b, &P)
}

fn fe_sub(a: &U256, b: &U256) -> U256 {
    u256::sub_mod(a, b, &P)
}

fn fe_mul(a: &U256, b: &U256) -> U256 {
    u256::mul_mod(a, b, &P, &P_C)
}

fn fe_sqr(a: &U256) -> U256 {
    fe_mul(a, a)
}

fn fe_inv(a: &U256) -> U256 {
    u256::inv_mod(a, &P, &P_C)
}

fn fe_sqrt(a: &U256) -> U256 {
    u256::pow_mod(a, &SQRT_EXP, &P, &P_C)
}

/// `x^3 + 7 mod p`, the curve's right-hand side.
fn curve_rhs(x: &U256) -> U256 {
    let x2 = fe_sqr(x);
    let x3 = fe_mul(&x2, x);
    fe_add(&x3, &U256::from_u64(7))
}

impl Point {
    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    /// x-coordinate of a finite point.
    pub fn x(&self) -> Option<U256> {
        match self {
            Point::Infinity => None,
            Point::Affine { x, .. } => Some(*x),
        }
    }

    pub fn is_on_curve(&self) -> bool {
        match self {
            Point::Infinity => true,
            Point::Affine { x, y } => fe_sqr(y) == curve_rhs(x),
        }
    }

    /// SEC1 compressed form `02/03 || x`. The identity has no encoding.
    pub fn serialize_compressed(&self) -> Result<[u8; 33]> {
        match self {
            Point::Infinity => Err(SpvError::InvalidPublicKey(Cow::Borrowed(
                "identity has no serialization",
            ))),
            Point::Affine { x, y } => {
                let mut out = [0u8; 33];
                out[0] = if y.bit(0) { 0x03 } else { 0x02 };
                out[1..].copy_from_slice(&x.to_be_bytes());
                Ok(out)
            }
        }
    }

    /// SEC1 uncompressed form `04 || x || y`.
    pub fn serialize_uncompressed(&self) -> Result<[u8; 65]> {
        match self {
            Point::Infinity => Err(SpvError::InvalidPublicKey(Cow::Borrowed(
                "identity has no serialization",
            ))),
            Point::Affine { x, y } => {
                let mut out = [0u8; 65];
                out[0] = 0x04;
                out[1..33].copy_from_slice(&x.to_be_bytes());
                out[33..].copy_from_slice(&y.to_be_bytes());
                Ok(out)
            }
        }
    }

    /// Parse a SEC1-encoded point, compressed or uncompressed, and verify
    /// curve membership.
    pub fn parse(bytes: &[u8]) -> Result<Point> {
        match bytes.first() {
            Some(0x02) | Some(0x03) if bytes.len() == 33 => {
                let mut x_bytes = [0u8; 32];
                x_bytes.copy_from_slice(&bytes[1..]);
                let x = U256::from_be_bytes(&x_bytes);
                if x >= P {
                    return Err(SpvError::InvalidPublicKey(Cow::Borrowed(
                        "x out of field range",
                    )));
                }
                decompress(&x, bytes[0] == 0x03)
            }
            Some(0x04) if bytes.len() == 65 => {
                let mut x_bytes = [0u8; 32];
                let mut y_bytes = [0u8; 32];
                x_bytes.copy_from_slice(&bytes[1..33]);
                y_bytes.copy_from_slice(&bytes[33..]);
                let x = U256::from_be_bytes(&x_bytes);
                let y = U256::from_be_bytes(&y_bytes);
                if x >= P || y >= P {
                    return Err(SpvError::InvalidPublicKey(Cow::Borrowed(
                        "coordinate out of field range",
                    )));
                }
                let point = Point::Affine { x, y };
                if !point.is_on_curve() {
                    return Err(SpvError::InvalidPublicKey(Cow::Borrowed("not on curve")));
                }
                Ok(point)
            }
            _ => Err(SpvError::InvalidPublicKey(Cow::Borrowed(
                "unknown SEC1 prefix or length",
            ))),
        }
    }
}

/// Solve `y^2 = x^3 + 7` and pick the root matching the requested parity.
fn decompress(x: &U256, odd: bool) -> Result<Point> {
    let rhs = curve_rhs(x);
    let y = fe_sqrt(&rhs);
    if fe_sqr(&y) != rhs {
        return Err(SpvError::InvalidPublicKey(Cow::Borrowed(
            "x has no square root on the curve",
        )));
    }
    let y = if y.bit(0) == odd { y } else { fe_sub(&U256::ZERO, &y) };
    Ok(Point::Affine { x: *x, y })
}

/// Group addition with the identity and doubling special cases.
pub fn add(p: &Point, q: &Point) -> Point {
    match (p, q) {
        (Point::Infinity, _) => *q,
        (_, Point::Infinity) => *p,
        (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => {
            if x1 == x2 {
                if y1 == y2 {
                    return double(p);
                }
                // y2 == -y1: the points cancel.
                return Point::Infinity;
            }
            let lambda = fe_mul(&fe_sub(y2, y1), &fe_inv(&fe_sub(x2, x1)));
            let x3 = fe_sub(&fe_sub(&fe_sqr(&lambda), x1), x2);
            let y3 = fe_sub(&fe_mul(&lambda, &fe_sub(x1, &x3)), y1);
            Point::Affine { x: x3, y: y3 }
        }
    }
}

/// Point doubling; the tangent is vertical when `y = 0`.
pub fn double(p: &Point) -> Point {
    match p {
        Point::Infinity => Point::Infinity,
        Point::Affine { x, y } => {
            if y.is_zero() {
                return Point::Infinity;
            }
            let numerator = fe_mul(&U256::from_u64(3), &fe_sqr(x));
            let lambda = fe_mul(&numerator, &fe_inv(&fe_add(y, y)));
            let x3 = fe_sub(&fe_sub(&fe_sqr(&lambda), x), x);
            let y3 = fe_sub(&fe_mul(&lambda, &fe_sub(x, &x3)), y);
            Point::Affine { x: x3, y: y3 }
        }
    }
}

/// Scalar multiplication, left-to-right over all 256 bits regardless of the
/// scalar's magnitude.
pub fn scalar_mul(k: &U256, p: &Point) -> Point {
    let mut acc = Point::Infinity;
    for i in (0..256).rev() {
        acc = double(&acc);
        if k.bit(i) {
            acc = add(&acc, p);
        }
    }
    acc
}
