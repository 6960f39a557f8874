/// Parameters governing a key generation run.
///
/// Owned by the CLI shell and threaded down into [`crate::key::generate`]
/// rather than read from module-level globals.
#[derive(Debug, Clone)]
pub struct KeyEngineConfig {
    /// Target modulus width in bits. Must be a multiple of 8 and at least
    /// [`crate::key::MIN_MODULUS_BITS`].
    pub modulus_bits: u32,
    /// Number of worker threads racing to find p and q.
    pub threads: usize,
    /// Starting candidate for the public exponent search.
    pub public_exponent_floor: u32,
}

impl Default for KeyEngineConfig {
    fn default() -> Self {
        KeyEngineConfig {
            modulus_bits: 4096,
            threads: default_thread_count(),
            public_exponent_floor: 65536,
        }
    }
}

/// Parameters governing a file engine run (encrypt/decrypt/sign/verify).
#[derive(Debug, Clone)]
pub struct FileEngineConfig {
    /// Number of worker threads used during decrypt.
    pub threads: usize,
    /// Refuse to overwrite an existing output path unless explicitly forced.
    pub allow_overwrite: bool,
    /// Decrypt via the CRT shortcut (`p`, `q`, `dp`, `dq`, `qinv`) rather
    /// than the direct `c^d mod n` path. `--nochinese` on the file CLI
    /// clears this.
    pub use_crt: bool,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        FileEngineConfig {
            threads: default_thread_count(),
            allow_overwrite: false,
            use_crt: true,
        }
    }
}

fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(crate::limits::MAX_THREADS)
}
