//! 256-bit unsigned integer arithmetic
//!
//! Four little-endian u64 limbs. Carries the comparisons and shifts needed
//! for target math, plus the widening multiply, long division and modular
//! helpers the curve and scalar arithmetic are built on.

use zeroize::Zeroize;

/// 256-bit integer, least-significant limb first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U256(pub [u64; 4]);

impl Zeroize for U256 {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// 512-bit product of two [`U256`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U512(pub [u64; 8]);

impl U256 {
    pub const ZERO: U256 = U256([0; 4]);
    pub const ONE: U256 = U256([1, 0, 0, 0]);
    pub const MAX: U256 = U256([u64::MAX; 4]);

    pub const fn from_u64(value: u64) -> Self {
        U256([value, 0, 0, 0])
    }

    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let start = 32 - (i + 1) * 8;
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[start..start + 8]);
            *limb = u64::from_be_bytes(word);
        }
        U256(limbs)
    }

    /// Interpret 32 bytes as a little-endian integer. Block hashes compare
    /// against targets in this orientation.
    pub fn from_le_bytes(bytes: &[u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            *limb = u64::from_le_bytes(word);
        }
        U256(limbs)
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, &limb) in self.0.iter().enumerate() {
            let start = 32 - (i + 1) * 8;
            bytes[start..start + 8].copy_from_slice(&limb.to_be_bytes());
        }
        bytes
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&x| x == 0)
    }

    pub fn bit(&self, index: u32) -> bool {
        let limb = (index / 64) as usize;
        (self.0[limb] >> (index % 64)) & 1 == 1
    }

    fn set_bit(&mut self, index: u32) {
        let limb = (index / 64) as usize;
        self.0[limb] |= 1u64 << (index % 64);
    }

    /// Number of significant bits; zero for zero.
    pub fn bits(&self) -> u32 {
        for (i, &limb) in self.0.iter().enumerate().rev() {
            if limb != 0 {
                return (i as u32) * 64 + (64 - limb.leading_zeros());
            }
        }
        0
    }

    pub fn overflowing_add(&self, rhs: &Self) -> (Self, bool) {
        let mut out = [0u64; 4];
        let mut carry = false;
        for i in 0..4 {
            let (a, c1) = self.0[i].overflowing_add(rhs.0[i]);
            let (b, c2) = a.overflowing_add(carry as u64);
            out[i] = b;
            carry = c1 || c2;
        }
        (U256(out), carry)
    }

    pub fn overflowing_sub(&self, rhs: &Self) -> (Self, bool) {
        let mut out = [0u64; 4];
        let mut borrow = false;
        for i in 0..4 {
            let (a, b1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (b, b2) = a.overflowing_sub(borrow as u64);
            out[i] = b;
            borrow = b1 || b2;
        }
        (U256(out), borrow)
    }

    pub fn wrapping_add(&self, rhs: &Self) -> Self {
        self.overflowing_add(rhs).0
    }

    pub fn wrapping_sub(&self, rhs: &Self) -> Self {
        self.overflowing_sub(rhs).0
    }

    pub fn saturating_add(&self, rhs: &Self) -> Self {
        match self.overflowing_add(rhs) {
            (_, true) => U256::MAX,
            (sum, false) => sum,
        }
    }

    pub fn shl(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::ZERO;
        }
        let mut result = U256::ZERO;
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in 0..4 {
            if i + word_shift < 4 {
                result.0[i + word_shift] |= self.0[i] << bit_shift;
                if bit_shift > 0 && i + word_shift + 1 < 4 {
                    result.0[i + word_shift + 1] |= self.0[i] >> (64 - bit_shift);
                }
            }
        }
        result
    }

    pub fn shr(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::ZERO;
        }
        let mut result = U256::ZERO;
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in word_shift..4 {
            result.0[i - word_shift] |= self.0[i] >> bit_shift;
            if bit_shift > 0 && i + 1 < 4 {
                result.0[i - word_shift] |= self.0[i + 1] << (64 - bit_shift);
            }
        }
        result
    }

    pub fn not(&self) -> Self {
        U256([!self.0[0], !self.0[1], !self.0[2], !self.0[3]])
    }

    /// Schoolbook 256x256 -> 512 multiply with u128 accumulation.
    pub fn mul_wide(&self, rhs: &Self) -> U512 {
        let mut w = [0u64; 8];
        for i in 0..4 {
            let mut carry = 0u128;
            for j in 0..4 {
                let t = w[i + j] as u128
                    + (self.0[i] as u128) * (rhs.0[j] as u128)
                    + carry;
                w[i + j] = t as u64;
                carry = t >> 64;
            }
            w[i + 4] = carry as u64;
        }
        U512(w)
    }

    /// Bit-by-bit long division. The remainder invariant `rem < divisor`
    /// keeps the shifted remainder representable even for divisors above
    /// 2^255 (the overflow bit implies `rem >= divisor`).
    pub fn div_rem(&self, divisor: &Self) -> (Self, Self) {
        debug_assert!(!divisor.is_zero(), "division by zero");
        if self < divisor {
            return (U256::ZERO, *self);
        }
        let mut quotient = U256::ZERO;
        let mut rem = U256::ZERO;
        for i in (0..256).rev() {
            let overflow = rem.bit(255);
            rem = rem.shl(1);
            if self.bit(i) {
                rem.0[0] |= 1;
            }
            if overflow || rem >= *divisor {
                rem = rem.wrapping_sub(divisor);
                quotient.set_bit(i);
            }
        }
        (quotient, rem)
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        for (a, b) in self.0.iter().rev().zip(other.0.iter().rev()) {
            match a.cmp(b) {
                std::cmp::Ordering::Equal => continue,
                other => return other,
            }
        }
        std::cmp::Ordering::Equal
    }
}

impl U512 {
    fn split(&self) -> (U256, U256) {
        let lo = U256([self.0[0], self.0[1], self.0[2], self.0[3]]);
        let hi = U256([self.0[4], self.0[5], self.0[6], self.0[7]]);
        (lo, hi)
    }

    fn add_u256(&self, rhs: &U256) -> U512 {
        let mut out = self.0;
        let mut carry = false;
        for i in 0..8 {
            let add = if i < 4 { rhs.0[i] } else { 0 };
            let (a, c1) = out[i].overflowing_add(add);
            let (b, c2) = a.overflowing_add(carry as u64);
            out[i] = b;
            carry = c1 || c2;
        }
        U512(out)
    }
}

/// Reduce a 512-bit value modulo `m`, where `c = 2^256 mod m`. Folds the
/// high half down via `hi*2^256 + lo == hi*c + lo (mod m)` until the high
/// half clears, then strips remaining multiples of `m` by aligned binary
/// subtraction (one or two rounds for the 255/256-bit curve moduli).
pub fn reduce_wide(wide: U512, m: &U256, c: &U256) -> U256 {
    let (mut lo, mut hi) = wide.split();
    while !hi.is_zero() {
        let folded = hi.mul_wide(c).add_u256(&lo);
        let (l, h) = folded.split();
        lo = l;
        hi = h;
    }
    while lo >= *m {
        let shift = lo.bits() - m.bits();
        let mut aligned = m.shl(shift);
        if aligned > lo {
            aligned = m.shl(shift - 1);
        }
        lo = lo.wrapping_sub(&aligned);
    }
    lo
}

/// `a + b mod m`; requires `a, b < m`.
pub fn add_mod(a: &U256, b: &U256, m: &U256) -> U256 {
    let (sum, carry) = a.overflowing_add(b);
    if carry || sum >= *m {
        sum.wrapping_sub(m)
    } else {
        sum
    }
}

/// `a - b mod m`; requires `a, b < m`.
pub fn sub_mod(a: &U256, b: &U256, m: &U256) -> U256 {
    let (diff, borrow) = a.overflowing_sub(b);
    if borrow {
        diff.wrapping_add(m)
    } else {
        diff
    }
}

/// `a * b mod m`, with `c = 2^256 mod m`.
pub fn mul_mod(a: &U256, b: &U256, m: &U256, c: &U256) -> U256 {
    reduce_wide(a.mul_wide(b), m, c)
}

/// `base^exp mod m`, left-to-right square-and-multiply over all 256 bits.
pub fn pow_mod(base: &U256, exp: &U256, m: &U256, c: &U256) -> U256 {
    let mut result = U256::ONE;
    for i in (0..256).rev() {
        result = mul_mod(&result, &result, m, c);
        if exp.bit(i) {
            result = mul_mod(&result, base, m, c);
        }
    }
    result
}

/// Modular inverse by Fermat: `a^(m-2) mod m` for prime `m`.
pub fn inv_mod(a: &U256, m: &U256, c: &U256) -> U256 {
    let exp = m.wrapping_sub(&U256::from_u64(2));
    pow_mod(a, &exp, m, c)
}
