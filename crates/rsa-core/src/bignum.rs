//! Thin facade over the arbitrary-precision integer backend.
//!
//! Nothing here does original math; it narrows `rug::Integer`'s much
//! larger surface down to the handful of operations the key and file
//! engines actually need, the same way [`crate::entropy`] narrows the OS
//! random source down to "open, warm up, read".

use rug::integer::{IsPrime, Order};
pub use rug::Integer as Bignum;

/// Result of a probabilistic primality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primality {
    Composite,
    ProbablyPrime,
    Prime,
}

/// Number of Miller-Rabin rounds used by [`probab_prime`].
///
/// 50 rounds keeps the false-positive probability below `4^-50`.
pub const PRIME_TEST_ROUNDS: u32 = 50;

/// Import a big-endian magnitude as a nonnegative bignum.
pub fn from_be_bytes(bytes: &[u8]) -> Bignum {
    Bignum::from_digits(bytes, Order::Msf)
}

/// Export the magnitude of a nonnegative bignum as big-endian bytes.
///
/// The returned vector has no guaranteed width; callers that need a fixed
/// field width pass the result through [`crate::canonical::right_justify`].
pub fn to_be_bytes(value: &Bignum) -> Vec<u8> {
    value.to_digits::<u8>(Order::Msf)
}

/// `base^exp mod modulus`, all nonnegative.
pub fn powm(base: &Bignum, exp: &Bignum, modulus: &Bignum) -> Bignum {
    Bignum::from(base.pow_mod_ref(exp, modulus).expect("modexp with nonnegative exponent and nonzero modulus"))
}

/// Greatest common divisor.
pub fn gcd(a: &Bignum, b: &Bignum) -> Bignum {
    Bignum::from(a.gcd_ref(b))
}

/// Least common multiple.
pub fn lcm(a: &Bignum, b: &Bignum) -> Bignum {
    Bignum::from(a.lcm_ref(b))
}

/// Modular inverse of `value` mod `modulus`, or `None` if they are not
/// coprime.
pub fn invert(value: &Bignum, modulus: &Bignum) -> Option<Bignum> {
    value.clone().invert(modulus).ok()
}

/// Smallest prime strictly greater than `value`.
pub fn next_prime(value: &Bignum) -> Bignum {
    value.clone().next_prime()
}

/// Probabilistic primality test with [`PRIME_TEST_ROUNDS`] witnesses.
pub fn probab_prime(value: &Bignum) -> Primality {
    match value.is_probably_prime(PRIME_TEST_ROUNDS) {
        IsPrime::No => Primality::Composite,
        IsPrime::Probably => Primality::ProbablyPrime,
        IsPrime::Yes => Primality::Prime,
    }
}

/// Number of bits needed to represent `value`, i.e. `floor(log2(value)) + 1`
/// for a positive value.
pub fn bit_length(value: &Bignum) -> u32 {
    value.significant_bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_bytes() {
        let original = Bignum::from(0x00ff_00ff_1234_5678_u64);
        let bytes = to_be_bytes(&original);
        let recovered = from_be_bytes(&bytes);
        assert_eq!(original, recovered);
    }

    #[test]
    fn powm_matches_known_value() {
        let base = Bignum::from(4);
        let exp = Bignum::from(13);
        let modulus = Bignum::from(497);
        assert_eq!(powm(&base, &exp, &modulus), Bignum::from(445));
    }

    #[test]
    fn invert_is_none_when_not_coprime() {
        let value = Bignum::from(6);
        let modulus = Bignum::from(9);
        assert!(invert(&value, &modulus).is_none());
    }

    #[test]
    fn invert_recovers_multiplicative_inverse() {
        let value = Bignum::from(3);
        let modulus = Bignum::from(11);
        let inv = invert(&value, &modulus).unwrap();
        assert_eq!((value * inv) % Bignum::from(11), Bignum::from(1));
    }

    #[test]
    fn next_prime_skips_composites() {
        assert_eq!(next_prime(&Bignum::from(8)), Bignum::from(11));
    }

    #[test]
    fn small_primes_are_recognized() {
        assert_eq!(probab_prime(&Bignum::from(97)), Primality::Prime);
        assert_eq!(probab_prime(&Bignum::from(98)), Primality::Composite);
    }
}
