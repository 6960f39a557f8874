//! Key generation: race worker threads against each other to find two
//! suitably-shaped primes, then derive the public/private exponents and
//! CRT parameters from them.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::bignum::{self, Bignum, Primality};
use crate::config::KeyEngineConfig;
use crate::entropy;
use crate::error::{Result, RsaError};
use crate::limits::MAX_THREADS;

use super::material::{CandidateBuffer, KeyMaterial};

/// Primes up to 100, excluding 2 (every candidate here is forced odd, so
/// `candidate - 1` is always even and a check against 2 would be vacuous).
const SMALL_PRIME_SIEVE: &[u32] = &[
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Minimum slack between the private exponent's bit length and the
/// modulus's bit length. A `d` shorter than this is rejected and the
/// search restarts, since a too-short private exponent leaks structure.
const MIN_D_SLACK_BITS: u32 = 4;

/// A single round of racing `config.threads` workers to find one prime of
/// `half_bits` bits satisfying the shape constraints below, first finisher
/// wins and the rest are abandoned in place.
fn race_for_prime(half_bits: u32, threads: usize) -> Bignum {
    let threads = threads.clamp(1, MAX_THREADS);
    let found: Arc<(Mutex<Option<Bignum>>, Condvar)> = Arc::new((Mutex::new(None), Condvar::new()));

    thread::scope(|scope| {
        for _ in 0..threads {
            let found = Arc::clone(&found);
            scope.spawn(move || {
                loop {
                    {
                        let guard = found.0.lock().unwrap();
                        if guard.is_some() {
                            return;
                        }
                    }
                    if let Some(candidate) = try_candidate(half_bits) {
                        let mut guard = found.0.lock().unwrap();
                        if guard.is_none() {
                            *guard = Some(candidate);
                            found.1.notify_all();
                        }
                        return;
                    }
                }
            });
        }
    });

    let guard = found.0.lock().unwrap();
    guard.clone().expect("worker pool exited without a winner")
}

/// Build and validate one candidate of `bits` bits. Returns `None` if it
/// fails shape, sieve, or primality checks so the caller can try again.
fn try_candidate(bits: u32) -> Option<Bignum> {
    let byte_len = (bits as usize).div_ceil(8);
    let mut buffer = CandidateBuffer(entropy::global().bytes(byte_len).ok()?);

    // Force the top two bits set so the product of two such primes always
    // has the full expected bit length, and force the candidate odd.
    buffer.0[0] |= 0b1100_0000;
    *buffer.0.last_mut().unwrap() |= 1;

    let candidate = bignum::from_be_bytes(&buffer.0);

    let predecessor = Bignum::from(&candidate - 1);
    for &small in SMALL_PRIME_SIEVE {
        if Bignum::from(&predecessor % small) == 0 {
            return None;
        }
    }

    match bignum::probab_prime(&candidate) {
        Primality::Composite => None,
        Primality::ProbablyPrime | Primality::Prime => Some(candidate),
    }
}

fn top_nibble(value: &Bignum) -> u8 {
    let bytes = bignum::to_be_bytes(value);
    bytes.first().copied().unwrap_or(0) >> 4
}

/// Generate a fresh key pair under `config`.
pub fn generate(config: &KeyEngineConfig) -> Result<KeyMaterial> {
    if config.modulus_bits % 8 != 0 {
        return Err(RsaError::ValueError(
            "modulus width must be a multiple of 8 bits".to_string(),
        ));
    }
    if config.modulus_bits < crate::limits::MIN_MODULUS_BITS {
        return Err(RsaError::ModulusTooSmall {
            bits: config.modulus_bits,
            minimum: crate::limits::MIN_MODULUS_BITS,
        });
    }
    if config.modulus_bits > crate::limits::MAX_MODULUS_BITS {
        return Err(RsaError::ModulusTooLarge {
            bits: config.modulus_bits,
            maximum: crate::limits::MAX_MODULUS_BITS,
        });
    }

    let half_bits = config.modulus_bits / 2;

    loop {
        let p = race_for_prime(half_bits, config.threads);
        let mut q = race_for_prime(half_bits, config.threads);

        // p and q must differ in their top nibble, otherwise their product
        // can land a bit short of the intended modulus width.
        while top_nibble(&p) == top_nibble(&q) {
            q = race_for_prime(half_bits, config.threads);
        }

        let n = Bignum::from(&p * &q);
        let p_minus_1 = Bignum::from(&p - 1);
        let q_minus_1 = Bignum::from(&q - 1);
        let lambda = bignum::lcm(&p_minus_1, &q_minus_1);

        let mut e = Bignum::from(config.public_exponent_floor);
        loop {
            if bignum::gcd(&e, &lambda) == 1 {
                break;
            }
            e = bignum::next_prime(&e);
        }

        let d = match bignum::invert(&e, &lambda) {
            Some(d) => d,
            None => continue,
        };

        if bignum::bit_length(&d) + MIN_D_SLACK_BITS < config.modulus_bits {
            continue;
        }

        let dp = Bignum::from(&d % &p_minus_1);
        let dq = Bignum::from(&d % &q_minus_1);
        let qinv = match bignum::invert(&q, &p) {
            Some(v) => v,
            None => continue,
        };

        return Ok(KeyMaterial {
            modulus: Some(n),
            public_exponent: Some(e),
            private_exponent: Some(d),
            prime_p: Some(p),
            prime_q: Some(q),
            dp: Some(dp),
            dq: Some(dq),
            qinv: Some(qinv),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_a_key_of_the_requested_width() {
        let config = KeyEngineConfig {
            modulus_bits: 768,
            threads: 2,
            public_exponent_floor: 65536,
        };
        let material = generate(&config).unwrap();
        let bits = material.modulus_bits().unwrap();
        // Forcing the top two bits of both primes guarantees the full
        // width; allow a one-bit margin since the product of two
        // same-width primes can land one bit short.
        assert!(bits >= config.modulus_bits - 1 && bits <= config.modulus_bits);
    }

    #[test]
    fn private_key_passes_crt_consistency() {
        let config = KeyEngineConfig {
            modulus_bits: 768,
            threads: 2,
            public_exponent_floor: 65536,
        };
        let material = generate(&config).unwrap();
        material.verify_crt_consistency().unwrap();
    }

    #[test]
    fn rejects_sub_minimum_width() {
        let config = KeyEngineConfig {
            modulus_bits: 256,
            threads: 1,
            public_exponent_floor: 65536,
        };
        assert!(generate(&config).is_err());
    }

    #[test]
    fn rejects_above_maximum_width() {
        let config = KeyEngineConfig {
            modulus_bits: 524288,
            threads: 1,
            public_exponent_floor: 65536,
        };
        assert!(matches!(generate(&config), Err(RsaError::ModulusTooLarge { .. })));
    }
}
