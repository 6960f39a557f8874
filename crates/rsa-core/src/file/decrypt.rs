//! Block decryption: the first block is decrypted alone so a wrong-key
//! mismatch is caught before any worker threads spin up or any output is
//! written, then the remaining blocks are split across a fixed worker
//! pool by `index % threads` and committed to the output file in strict
//! ascending order regardless of which worker finished first.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Condvar, Mutex};

use crate::bignum::{self, Bignum};
use crate::config::FileEngineConfig;
use crate::crc32::Crc32;
use crate::error::{Result, RsaError};
use crate::file::block::{unpack_payload, BlockGeometry};
use crate::file::header::FileInfoHeader;
use crate::key::KeyMaterial;
use crate::limits::MAX_THREADS;

/// Outcome of a decrypt run. The CRC is reported rather than treated as
/// fatal: a mismatch here means bit rot or a truncated copy downstream of
/// a decrypt that otherwise succeeded under the right key, and the
/// caller's recovered bytes are still the best available reconstruction.
#[derive(Debug, Clone)]
pub struct DecryptReport {
    pub header: FileInfoHeader,
    pub crc_matches: bool,
}

fn crt_decrypt(ciphertext: &Bignum, private: &KeyMaterial) -> Result<Bignum> {
    let p = private.p()?;
    let q = private.q()?;
    let dp = private.dp()?;
    let dq = private.dq()?;
    let qinv = private.qinv()?;

    let m1 = bignum::powm(ciphertext, dp, p);
    let m2 = bignum::powm(ciphertext, dq, q);

    let mut diff = Bignum::from(&m1 - &m2) % p;
    if diff < 0 {
        diff += p;
    }
    let mut h = Bignum::from(qinv * diff) % p;
    if h < 0 {
        h += p;
    }

    Ok(Bignum::from(m2 + h * q))
}

/// The direct `c^d mod n` path, used instead of CRT when `--nochinese`
/// disables the shortcut. Mathematically equivalent, much slower.
fn direct_decrypt(ciphertext: &Bignum, private: &KeyMaterial) -> Result<Bignum> {
    let n = private.n()?;
    let d = private.d()?;
    Ok(bignum::powm(ciphertext, d, n))
}

fn decrypt_one_block(block: &[u8], private: &KeyMaterial, block_size: usize, use_crt: bool) -> Result<Vec<u8>> {
    let ciphertext = bignum::from_be_bytes(block);
    let plaintext_int = if use_crt {
        crt_decrypt(&ciphertext, private)?
    } else {
        direct_decrypt(&ciphertext, private)?
    };
    Ok(crate::canonical::right_justify(&bignum::to_be_bytes(&plaintext_int), block_size))
}

fn read_block(file: &mut File, index: u64, block_size: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; block_size];
    file.seek(SeekFrom::Start(index * block_size as u64))?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}

struct Tally {
    next_to_commit: u64,
    pending: HashMap<u64, Vec<u8>>,
    error: Option<RsaError>,
}

/// Decrypt `input` into `output` under `private`'s modulus and CRT
/// parameters.
pub fn decrypt_file(
    input: &Path,
    output: &Path,
    private: &KeyMaterial,
    config: &FileEngineConfig,
) -> Result<DecryptReport> {
    if output.exists() && !config.allow_overwrite {
        return Err(RsaError::OutputExists(output.display().to_string()));
    }

    let modulus_bits = private.modulus_bits()?;
    let geometry = BlockGeometry::from_modulus_bits(modulus_bits);
    let block_size = geometry.block_size as u64;

    let total_len = fs::metadata(input)?.len();
    if total_len == 0 || total_len % block_size != 0 {
        return Err(RsaError::BadBlockSize {
            len: total_len,
            block_size: geometry.block_size as u32,
        });
    }
    let block_count = total_len / block_size;

    let mut file = File::open(input)?;

    // Block zero first, alone: it carries the header we need to detect a
    // wrong key before anything else happens.
    let first_cipher = read_block(&mut file, 0, geometry.block_size)?;
    let first_plain = decrypt_one_block(&first_cipher, private, geometry.block_size, config.use_crt)?;
    let first_payload = unpack_payload(&geometry, &first_plain);
    let header = FileInfoHeader::from_bytes(first_payload)?;

    let mut remaining = header.plaintext_size as u64;
    let mut crc = Crc32::new();

    let mut writer = BufWriter::new(File::create(output)?);
    let from_first = &first_payload[crate::file::header::HEADER_SIZE..];
    let take = from_first.len().min(remaining as usize);
    writer.write_all(&from_first[..take])?;
    crc.update(&from_first[..take]);
    remaining -= take as u64;

    if block_count > 1 {
        let threads = config.threads.clamp(1, MAX_THREADS).min((block_count - 1) as usize).max(1);
        let tally = Mutex::new(Tally {
            next_to_commit: 1,
            pending: HashMap::new(),
            error: None,
        });
        let condvar = Condvar::new();

        std::thread::scope(|scope| -> Result<()> {
            for worker_id in 0..threads {
                let tally = &tally;
                let condvar = &condvar;
                let geometry = &geometry;
                let input = input;
                scope.spawn(move || {
                    let mut file = match File::open(input) {
                        Ok(f) => f,
                        Err(e) => {
                            let mut guard = tally.lock().unwrap();
                            guard.error.get_or_insert(RsaError::KeyFileIo(e));
                            condvar.notify_all();
                            return;
                        }
                    };
                    let mut index = 1u64 + worker_id as u64;
                    while index < block_count {
                        {
                            let guard = tally.lock().unwrap();
                            if guard.error.is_some() {
                                return;
                            }
                        }
                        let result = read_block(&mut file, index, geometry.block_size)
                            .and_then(|cipher| decrypt_one_block(&cipher, private, geometry.block_size, config.use_crt));
                        let mut guard = tally.lock().unwrap();
                        match result {
                            Ok(plain) => {
                                guard.pending.insert(index, plain);
                            }
                            Err(e) => {
                                guard.error.get_or_insert(e);
                            }
                        }
                        condvar.notify_all();
                        drop(guard);
                        index += threads as u64;
                    }
                });
            }

            // Committer: this thread owns output ordering; it never
            // decrypts, it only drains `pending` in index order.
            let mut next = 1u64;
            while next < block_count {
                let mut guard = tally.lock().unwrap();
                loop {
                    if guard.error.is_some() {
                        return Err(guard.error.take().unwrap());
                    }
                    if guard.pending.contains_key(&next) {
                        break;
                    }
                    guard = condvar.wait(guard).unwrap();
                }
                let plain = guard.pending.remove(&next).unwrap();
                drop(guard);

                let payload = unpack_payload(&geometry, &plain);
                let take = payload.len().min(remaining as usize);
                writer.write_all(&payload[..take]).map_err(RsaError::KeyFileIo)?;
                crc.update(&payload[..take]);
                remaining -= take as u64;
                next += 1;
            }
            Ok(())
        })?;
    }

    writer.flush()?;

    Ok(DecryptReport {
        crc_matches: crc.finalize() == header.crc,
        header,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyEngineConfig;
    use crate::file::encrypt::encrypt_file;
    use crate::key::generate::generate;

    fn keypair(bits: u32) -> KeyMaterial {
        let config = KeyEngineConfig {
            modulus_bits: bits,
            threads: 2,
            ..KeyEngineConfig::default()
        };
        generate(&config).unwrap()
    }

    #[test]
    fn roundtrips_a_multi_block_file() {
        let material = keypair(768);
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.txt");
        let cipher = dir.path().join("cipher.bin");
        let recovered = dir.path().join("recovered.txt");

        let plaintext: Vec<u8> = (0..5000).map(|i| (i % 251) as u8).collect();
        fs::write(&input, &plaintext).unwrap();

        let file_config = FileEngineConfig {
            threads: 3,
            allow_overwrite: true,
            ..FileEngineConfig::default()
        };
        encrypt_file(&input, &cipher, &material, &file_config, None).unwrap();
        let report = decrypt_file(&cipher, &recovered, &material, &file_config).unwrap();

        assert!(report.crc_matches);
        assert_eq!(fs::read(&recovered).unwrap(), plaintext);
    }

    #[test]
    fn wrong_key_is_detected_before_writing_output() {
        let material_a = keypair(768);
        let material_b = keypair(768);
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.txt");
        let cipher = dir.path().join("cipher.bin");
        let recovered = dir.path().join("recovered.txt");

        fs::write(&input, b"some secret bytes").unwrap();
        let file_config = FileEngineConfig {
            threads: 2,
            allow_overwrite: true,
            ..FileEngineConfig::default()
        };
        encrypt_file(&input, &cipher, &material_a, &file_config, None).unwrap();

        let result = decrypt_file(&cipher, &recovered, &material_b, &file_config);
        assert!(matches!(result, Err(RsaError::WrongKeyOrCorrupt)));
    }

    #[test]
    fn rejects_length_not_a_multiple_of_block_size() {
        let material = keypair(768);
        let dir = tempfile::tempdir().unwrap();
        let cipher = dir.path().join("cipher.bin");
        let recovered = dir.path().join("recovered.txt");
        fs::write(&cipher, vec![0u8; 17]).unwrap();

        let file_config = FileEngineConfig::default();
        let result = decrypt_file(&cipher, &recovered, &material, &file_config);
        assert!(matches!(result, Err(RsaError::BadBlockSize { .. })));
    }
}
