use thiserror::Error;

/// Tagged error taxonomy for the key engine and file engine: one variant
/// per failure class so callers can match instead of inspecting magic
/// numbers.
#[derive(Debug, Error)]
pub enum RsaError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("entropy read failed: requested {requested} bytes, received {received}")]
    EntropyRead { requested: usize, received: usize },

    #[error("key file I/O error: {0}")]
    KeyFileIo(#[from] std::io::Error),

    #[error("key field `{field}` truncated (needed {needed} bytes, had {had})")]
    KeyFieldTruncated {
        field: &'static str,
        needed: usize,
        had: usize,
    },

    #[error("modulus too small: {bits} bits (minimum {minimum})")]
    ModulusTooSmall { bits: u32, minimum: u32 },

    #[error("modulus too large: {bits} bits (maximum {maximum})")]
    ModulusTooLarge { bits: u32, maximum: u32 },

    #[error("key is missing required field `{0}`")]
    MissingKeyField(&'static str),

    #[error("ciphertext length {len} is not a multiple of block size {block_size}")]
    BadBlockSize { len: u64, block_size: u32 },

    #[error("wrong key or corrupted ciphertext")]
    WrongKeyOrCorrupt,

    #[error("output CRC {computed:#010x} does not match header CRC {expected:#010x}")]
    CrcMismatch { computed: u32, expected: u32 },

    #[error("output already exists: {0}")]
    OutputExists(String),

    #[error("unknown packet type {0:#06x}")]
    UnknownPacketType(u16),

    #[error("hash mismatch")]
    HashMismatch,

    #[error("invalid value: {0}")]
    ValueError(String),

    #[error("{0}")]
    GeneralError(String),
}

pub type Result<T> = std::result::Result<T, RsaError>;
