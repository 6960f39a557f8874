//! Process-wide handle onto the operating system's random source.
//!
//! Opens the source once, throws away a few warm-up reads, then hands out
//! a mutex-guarded handle for the lifetime of the process instead of
//! reopening it on every call.

use std::sync::{Mutex, OnceLock};

use rand::{rngs::OsRng, RngCore};

use crate::error::{Result, RsaError};

/// Number of discarded 256-byte warm-up reads performed on first open.
const WARMUP_READS: usize = 32;
const WARMUP_READ_SIZE: usize = 256;

pub struct Entropy {
    rng: Mutex<OsRng>,
}

impl Entropy {
    fn open() -> Self {
        let mut rng = OsRng;
        let mut scratch = [0u8; WARMUP_READ_SIZE];
        for _ in 0..WARMUP_READS {
            rng.fill_bytes(&mut scratch);
        }
        Entropy {
            rng: Mutex::new(rng),
        }
    }

    /// Fill `buf` with fresh random bytes.
    pub fn read(&self, buf: &mut [u8]) -> Result<()> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| RsaError::EntropyUnavailable("entropy mutex poisoned".to_string()))?;
        rng.fill_bytes(buf);
        Ok(())
    }

    /// Fill `buf` and return it by value, for call sites that want an
    /// owned random array rather than an out-parameter.
    pub fn bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read(&mut buf)?;
        Ok(buf)
    }
}

/// The single process-wide entropy handle, opened and warmed up on first
/// use.
pub fn global() -> &'static Entropy {
    static INSTANCE: OnceLock<Entropy> = OnceLock::new();
    INSTANCE.get_or_init(Entropy::open)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_requested_length() {
        let buf = global().bytes(64).unwrap();
        assert_eq!(buf.len(), 64);
    }

    #[test]
    fn successive_reads_differ() {
        let a = global().bytes(32).unwrap();
        let b = global().bytes(32).unwrap();
        assert_ne!(a, b, "two 32-byte reads collided, entropy source is broken");
    }
}
