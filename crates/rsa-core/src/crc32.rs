//! Table-driven CRC-32 (IEEE 802.3 polynomial, reflected).

const POLY: u32 = 0xedb8_8320;
const CHUNK: usize = 4096;

fn table() -> &'static [u32; 256] {
    use std::sync::OnceLock;
    static TABLE: OnceLock<[u32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = i as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ POLY
                } else {
                    crc >> 1
                };
            }
            *entry = crc;
        }
        table
    })
}

/// Running CRC-32 accumulator, fed in 4 KiB-friendly chunks.
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Crc32 { state: 0xffff_ffff }
    }

    pub fn update(&mut self, data: &[u8]) {
        let table = table();
        for chunk in data.chunks(CHUNK) {
            for &byte in chunk {
                let idx = ((self.state ^ byte as u32) & 0xff) as usize;
                self.state = table[idx] ^ (self.state >> 8);
            }
        }
    }

    pub fn finalize(self) -> u32 {
        self.state ^ 0xffff_ffff
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience one-shot CRC-32 over a full buffer.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_vector() {
        // "123456789" is the canonical CRC-32/ISO-HDLC check string.
        assert_eq!(crc32(b"123456789"), 0xcbf4_3926);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data = vec![0x5au8; 10_000];
        let one_shot = crc32(&data);

        let mut incremental = Crc32::new();
        for chunk in data.chunks(777) {
            incremental.update(chunk);
        }
        assert_eq!(incremental.finalize(), one_shot);
    }
}
