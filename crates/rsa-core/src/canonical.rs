//! Byte-level plumbing shared by the key engine and file engine: a fixed
//! big-endian wire representation for integers and floats, and a
//! left-padding helper for fitting a magnitude into a fixed-width field.
//!
//! Every integer and float on the wire is big-endian regardless of host
//! byte order; `to_be_bytes`/`from_be_bytes` give canonical-on-the-wire,
//! native-in-memory behavior with no runtime endianness probe needed.

/// Left-pad `data` with zero bytes until it is exactly `width` bytes long.
///
/// `data` must already be no longer than `width`; this is a left-pad, not
/// a truncation.
pub fn right_justify(data: &[u8], width: usize) -> Vec<u8> {
    assert!(
        data.len() <= width,
        "value of {} bytes does not fit in a {}-byte field",
        data.len(),
        width
    );
    let mut out = vec![0u8; width];
    out[width - data.len()..].copy_from_slice(data);
    out
}

pub fn u32_to_canonical(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

pub fn u32_from_canonical(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

pub fn i64_to_canonical(value: i64) -> [u8; 8] {
    value.to_be_bytes()
}

pub fn i64_from_canonical(bytes: [u8; 8]) -> i64 {
    i64::from_be_bytes(bytes)
}

pub fn f32_to_canonical(value: f32) -> [u8; 4] {
    value.to_be_bytes()
}

pub fn f32_from_canonical(bytes: [u8; 4]) -> f32 {
    f32::from_be_bytes(bytes)
}

pub fn u16_to_canonical(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

pub fn u16_from_canonical(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_justify_pads_on_the_left() {
        let data = [0xaa, 0xbb];
        assert_eq!(right_justify(&data, 5), vec![0, 0, 0, 0xaa, 0xbb]);
    }

    #[test]
    fn right_justify_is_noop_at_exact_width() {
        let data = [1, 2, 3];
        assert_eq!(right_justify(&data, 3), vec![1, 2, 3]);
    }

    #[test]
    #[should_panic]
    fn right_justify_rejects_oversized_input() {
        right_justify(&[1, 2, 3], 2);
    }

    #[test]
    fn canonical_ints_roundtrip() {
        let n: u32 = 0xdead_beef;
        assert_eq!(u32_from_canonical(u32_to_canonical(n)), n);
        let t: i64 = -12345;
        assert_eq!(i64_from_canonical(i64_to_canonical(t)), t);
    }

    #[test]
    fn right_justify_matches_a_known_fixture() {
        use hex_literal::hex;
        let short = hex!("aa bb cc");
        let padded = right_justify(&short, 8);
        assert_eq!(padded, hex!("00 00 00 00 00 aa bb cc"));
    }
}
