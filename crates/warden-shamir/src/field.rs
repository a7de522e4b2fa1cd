//! Arithmetic in GF(256)
//!
//! Elements are bytes; addition is XOR and multiplication is carry-less
//! multiplication reduced modulo the AES polynomial x^8 + x^4 + x^3 + x + 1.
//! Multiplication and inversion run in constant time (no secret-dependent
//! branches or table lookups), since split multiplies secret coefficients.

use std::ops::{Add, Div, Mul, Sub};
use zeroize::Zeroize;

/// Low byte of the reduction polynomial 0x11B
const REDUCTION: u8 = 0x1B;

/// An element of GF(256)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Zeroize)]
pub struct Gf256(pub u8);

impl Gf256 {
    /// Additive identity
    pub const ZERO: Self = Self(0);
    /// Multiplicative identity
    pub const ONE: Self = Self(1);

    /// Multiplicative inverse; zero maps to zero
    ///
    /// Computed as a^254 by square-and-multiply over a fixed schedule.
    pub fn inverse(self) -> Self {
        // 254 = 0b1111_1110
        let a2 = self * self;
        let a4 = a2 * a2;
        let a8 = a4 * a4;
        let a16 = a8 * a8;
        let a32 = a16 * a16;
        let a64 = a32 * a32;
        let a128 = a64 * a64;
        a128 * a64 * a32 * a16 * a8 * a4 * a2
    }

    /// Evaluate a polynomial (coefficients in increasing degree) at `x`
    pub fn eval_polynomial(coefficients: &[Self], x: Self) -> Self {
        coefficients
            .iter()
            .rev()
            .fold(Self::ZERO, |acc, &c| acc * x + c)
    }
}

impl Add for Gf256 {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Sub for Gf256 {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Mul for Gf256 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let (mut a, mut b, mut product) = (self.0, rhs.0, 0u8);
        for _ in 0..8 {
            product ^= a & 0u8.wrapping_sub(b & 1);
            let carry = a >> 7;
            a = (a << 1) ^ (REDUCTION & 0u8.wrapping_sub(carry));
            b >>= 1;
        }
        Self(product)
    }
}

impl Div for Gf256 {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, rhs: Self) -> Self {
        self * rhs.inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_products() {
        // FIPS-197 section 4.2 worked example
        assert_eq!(Gf256(0x57) * Gf256(0x83), Gf256(0xC1));
        assert_eq!(Gf256(0x57) * Gf256(0x13), Gf256(0xFE));
        assert_eq!(Gf256(0x53).inverse(), Gf256(0xCA));
        assert_eq!(Gf256::ZERO.inverse(), Gf256::ZERO);
    }

    #[test]
    fn every_nonzero_element_has_an_inverse() {
        for a in 1..=255u8 {
            assert_eq!(Gf256(a) * Gf256(a).inverse(), Gf256::ONE, "a = {a:#04x}");
        }
    }

    #[test]
    fn horner_evaluation() {
        // f(x) = 7 + 3x + x^2 at x = 2: 7 ^ 6 ^ 4 = 5
        let coefficients = [Gf256(7), Gf256(3), Gf256(1)];
        assert_eq!(Gf256::eval_polynomial(&coefficients, Gf256(2)), Gf256(5));
        assert_eq!(Gf256::eval_polynomial(&coefficients, Gf256::ZERO), Gf256(7));
    }

    proptest! {
        #[test]
        fn multiplication_is_commutative_and_associative(a: u8, b: u8, c: u8) {
            let (a, b, c) = (Gf256(a), Gf256(b), Gf256(c));
            prop_assert_eq!(a * b, b * a);
            prop_assert_eq!((a * b) * c, a * (b * c));
        }

        #[test]
        fn multiplication_distributes_over_addition(a: u8, b: u8, c: u8) {
            let (a, b, c) = (Gf256(a), Gf256(b), Gf256(c));
            prop_assert_eq!(a * (b + c), a * b + a * c);
        }

        #[test]
        fn division_undoes_multiplication(a: u8, b in 1u8..=255) {
            prop_assert_eq!((Gf256(a) * Gf256(b)) / Gf256(b), Gf256(a));
        }
    }
}
