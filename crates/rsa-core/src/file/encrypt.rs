//! Sequential, single-pass-per-side block encryption. Encrypt does not
//! need the worker pool decrypt uses: each block only depends on its own
//! plaintext and a few fresh random bytes, so there is nothing to
//! coordinate across threads.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::FileEngineConfig;
use crate::crc32::Crc32;
use crate::entropy;
use crate::error::{Result, RsaError};
use crate::file::block::{pack_block, BlockGeometry};
use crate::file::header::FileInfoHeader;
use crate::key::KeyMaterial;
use crate::{bignum, canonical};

fn check_output_path(path: &Path, config: &FileEngineConfig) -> Result<()> {
    if path.exists() && !config.allow_overwrite {
        return Err(RsaError::OutputExists(path.display().to_string()));
    }
    Ok(())
}

fn scan_size_and_crc(path: &Path) -> Result<(u64, u32)> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut crc = Crc32::new();
    let mut buf = [0u8; 8192];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        crc.update(&buf[..n]);
        total += n as u64;
    }
    Ok((total, crc.finalize()))
}

fn random_padding() -> Result<[u8; 7]> {
    let bytes = entropy::global().bytes(7)?;
    let mut out = [0u8; 7];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn encrypt_block_bytes(block: &[u8], n: &bignum::Bignum, e: &bignum::Bignum, block_size: usize) -> Vec<u8> {
    let value = bignum::from_be_bytes(block);
    let ciphertext = bignum::powm(&value, e, n);
    canonical::right_justify(&bignum::to_be_bytes(&ciphertext), block_size)
}

/// Encrypt `input` into `output` under `public`'s modulus and public
/// exponent. `geotag` is an optional `(latitude, longitude)` pair embedded
/// in the header; callers with nothing to report pass `None`.
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    public: &KeyMaterial,
    config: &FileEngineConfig,
    geotag: Option<(f32, f32)>,
) -> Result<()> {
    check_output_path(output, config)?;

    let n = public.n()?.clone();
    let e = public.e()?.clone();
    let modulus_bits = public.modulus_bits()?;
    let geometry = BlockGeometry::from_modulus_bits(modulus_bits);

    let (size, crc) = scan_size_and_crc(input)?;
    if size > u32::MAX as u64 {
        return Err(RsaError::ValueError(
            "input is larger than the 4 GiB this format's size field can record".to_string(),
        ));
    }

    let unix_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let (latitude, longitude) = geotag.unwrap_or((0.0, 0.0));
    // The low 7 bits are unused filler; only the high bit is reserved
    // (FLAG_SIGNED), which encrypted content must always leave clear.
    let flags = entropy::global().bytes(1)?[0] & 0x7f;
    let header = FileInfoHeader::new(flags, size as u32, crc, unix_time, latitude, longitude);

    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);

    // First block: header plus as much plaintext as fits alongside it.
    let mut first_payload = vec![0u8; geometry.first_block_capacity];
    let read_for_first = read_full(&mut reader, &mut first_payload)?;
    first_payload.truncate(read_for_first);

    let mut payload = header.to_bytes().to_vec();
    payload.extend_from_slice(&first_payload);

    let block = pack_block(&geometry, &payload, &random_padding()?);
    writer.write_all(&encrypt_block_bytes(&block, &n, &e, geometry.block_size))?;

    // Remaining blocks: pure plaintext payload, no header.
    let mut buf = vec![0u8; geometry.block_capacity];
    loop {
        let n_read = read_full(&mut reader, &mut buf)?;
        if n_read == 0 {
            break;
        }
        let block = pack_block(&geometry, &buf[..n_read], &random_padding()?);
        writer.write_all(&encrypt_block_bytes(&block, &n, &e, geometry.block_size))?;
        if n_read < buf.len() {
            break;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Read up to `buf.len()` bytes, short only at end of file (unlike
/// `Read::read`, which may short-read even mid-stream for some readers).
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Remove a partially written output file, used by CLI callers that want
/// to clean up after a failed run rather than leave a truncated file
/// behind.
pub fn remove_partial_output(path: &Path) {
    let _ = fs::remove_file(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyEngineConfig;
    use crate::key::generate::generate;

    #[test]
    fn refuses_to_overwrite_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.bin");
        fs::write(&input, b"hello").unwrap();
        fs::write(&output, b"already here").unwrap();

        let config = KeyEngineConfig {
            modulus_bits: 768,
            threads: 2,
            ..KeyEngineConfig::default()
        };
        let material = generate(&config).unwrap();
        let file_config = FileEngineConfig::default();

        let result = encrypt_file(&input, &output, &material, &file_config, None);
        assert!(matches!(result, Err(RsaError::OutputExists(_))));
    }

    #[test]
    fn produces_a_multiple_of_block_size() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.bin");
        fs::write(&input, vec![0x7eu8; 10_000]).unwrap();

        let key_config = KeyEngineConfig {
            modulus_bits: 768,
            threads: 2,
            ..KeyEngineConfig::default()
        };
        let material = generate(&key_config).unwrap();
        let file_config = FileEngineConfig {
            allow_overwrite: true,
            ..FileEngineConfig::default()
        };

        encrypt_file(&input, &output, &material, &file_config, None).unwrap();
        let geometry = BlockGeometry::from_modulus_bits(material.modulus_bits().unwrap());
        let written = fs::metadata(&output).unwrap().len() as usize;
        assert_eq!(written % geometry.block_size, 0);
    }
}
