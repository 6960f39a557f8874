//! Shared numeric limits referenced by both the key engine and file engine.

/// Hard ceiling on worker threads for keygen racing and decrypt fan-out.
pub const MAX_THREADS: usize = 48;

/// Smallest modulus width the key engine will accept or produce.
pub const MIN_MODULUS_BITS: u32 = 768;

/// Largest modulus width the key engine will accept or produce.
pub const MAX_MODULUS_BITS: u32 = 262144;

/// Bytes of random padding at the front of every block, after the leading
/// zero marker byte.
pub const BLOCK_PADDING: usize = 12;
