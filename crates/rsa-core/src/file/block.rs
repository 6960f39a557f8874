//! Block geometry and the raw-buffer layout shared by encrypt and decrypt.
//!
//! Every block is exactly `block_size = K/8` bytes, where `K` is the
//! modulus width in bits, so that interpreted as a big-endian integer it
//! is guaranteed smaller than the modulus and the RSA transform never
//! overflows. The first eight bytes are a leading zero byte (forcing the
//! integer well below the modulus) followed by seven bytes of random
//! padding; the last four bytes are a reserved, always-zero trailing
//! margin. Payload lives in between.

use crate::file::header::HEADER_SIZE;
use crate::limits::BLOCK_PADDING;

const LEADING_ZERO_AND_RANDOM: usize = 8;
const TRAILING_RESERVED: usize = BLOCK_PADDING - LEADING_ZERO_AND_RANDOM;

/// Geometry derived once per run from the key's modulus width.
#[derive(Debug, Clone, Copy)]
pub struct BlockGeometry {
    pub block_size: usize,
    pub block_capacity: usize,
    pub first_block_capacity: usize,
}

impl BlockGeometry {
    pub fn from_modulus_bits(modulus_bits: u32) -> Self {
        let block_size = (modulus_bits as usize) / 8;
        let block_capacity = block_size - BLOCK_PADDING;
        BlockGeometry {
            block_size,
            block_capacity,
            first_block_capacity: block_capacity - HEADER_SIZE,
        }
    }

    pub fn payload_range(&self) -> std::ops::Range<usize> {
        LEADING_ZERO_AND_RANDOM..(self.block_size - TRAILING_RESERVED)
    }
}

/// Build a full `block_size`-byte plaintext block: zero byte, random
/// padding, payload, zero trailer.
pub fn pack_block(geometry: &BlockGeometry, payload: &[u8], random_padding: &[u8; 7]) -> Vec<u8> {
    assert!(payload.len() <= geometry.block_capacity);
    let mut block = vec![0u8; geometry.block_size];
    block[0] = 0;
    block[1..8].copy_from_slice(random_padding);
    let range = geometry.payload_range();
    block[range.start..range.start + payload.len()].copy_from_slice(payload);
    block
}

/// Extract the payload region from a decrypted block, trusting the caller
/// to have already validated the block (e.g. via the fileinfo_header
/// complement check on block zero).
pub fn unpack_payload(geometry: &BlockGeometry, block: &[u8]) -> &[u8] {
    let range = geometry.payload_range();
    &block[range]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_accounts_for_padding_and_header() {
        let geometry = BlockGeometry::from_modulus_bits(4096);
        assert_eq!(geometry.block_size, 512);
        assert_eq!(geometry.block_capacity, 500);
        assert_eq!(geometry.first_block_capacity, 500 - HEADER_SIZE);
    }

    #[test]
    fn pack_and_unpack_roundtrip() {
        let geometry = BlockGeometry::from_modulus_bits(1024);
        let payload = vec![0x42u8; geometry.block_capacity];
        let block = pack_block(&geometry, &payload, &[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(block.len(), geometry.block_size);
        assert_eq!(block[0], 0);
        assert_eq!(unpack_payload(&geometry, &block), payload.as_slice());
    }
}
