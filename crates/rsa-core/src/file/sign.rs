//! Whole-file signatures: hash the file with SHA-512, pack the digest plus
//! a timestamp and geotag into one block the same shape encrypt uses (a
//! leading zero byte, random padding, then payload), raise it to the
//! `d`-th power mod `n`, and write the result alongside a small
//! self-describing header so `verify` can sanity-check it came from a
//! compatible key before attempting the exponentiation.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::bignum;
use crate::canonical;
use crate::entropy;
use crate::error::{Result, RsaError};
use crate::file::block::{pack_block, unpack_payload, BlockGeometry};
use crate::key::KeyMaterial;

const SIGNATURE_MAGIC: [u8; 4] = *b"RSAS";

/// Signature payload: 64-byte digest, then `time`/`latitude`/`longitude` in
/// the same canonical layout the `fileinfo_header` uses for those fields.
const DIGEST_SIZE: usize = 64;
const PAYLOAD_SIZE: usize = DIGEST_SIZE + 8 + 4 + 4;

/// What `verify_file` recovered from a signature block, once the digest
/// has checked out.
#[derive(Debug, Clone, Copy)]
pub struct SignatureMetadata {
    pub unix_time: i64,
    pub latitude: f32,
    pub longitude: f32,
}

fn hash_file(path: &Path) -> Result<[u8; DIGEST_SIZE]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

fn random_padding() -> Result<[u8; 7]> {
    let bytes = entropy::global().bytes(7)?;
    let mut out = [0u8; 7];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Sign `path` with `private`, writing the result to `signature_path`.
/// `geotag` defaults to `(0.0, 0.0)` when not given, matching encrypt's
/// convention for callers with nothing to report.
pub fn sign_file(
    path: &Path,
    signature_path: &Path,
    private: &KeyMaterial,
    geotag: Option<(f32, f32)>,
) -> Result<()> {
    let digest = hash_file(path)?;
    let n = private.n()?;
    let d = private.d()?;
    let modulus_bits = private.modulus_bits()?;
    let geometry = BlockGeometry::from_modulus_bits(modulus_bits);
    let block_size = geometry.block_size;

    if geometry.block_capacity < PAYLOAD_SIZE {
        return Err(RsaError::ValueError(
            "modulus is too small to hold a signature payload".to_string(),
        ));
    }

    let unix_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let (latitude, longitude) = geotag.unwrap_or((0.0, 0.0));

    let mut payload = Vec::with_capacity(PAYLOAD_SIZE);
    payload.extend_from_slice(&digest);
    payload.extend_from_slice(&canonical::i64_to_canonical(unix_time));
    payload.extend_from_slice(&canonical::f32_to_canonical(latitude));
    payload.extend_from_slice(&canonical::f32_to_canonical(longitude));

    let block = pack_block(&geometry, &payload, &random_padding()?);
    let block_int = bignum::from_be_bytes(&block);
    let signature_int = bignum::powm(&block_int, d, n);
    let signature_bytes = canonical::right_justify(&bignum::to_be_bytes(&signature_int), block_size);

    let mut out = File::create(signature_path)?;
    out.write_all(&SIGNATURE_MAGIC)?;
    out.write_all(&canonical::u32_to_canonical(block_size as u32))?;
    out.write_all(&signature_bytes)?;
    Ok(())
}

fn read_signature(signature_path: &Path) -> Result<(u32, Vec<u8>)> {
    let mut file = File::open(signature_path)?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)
        .map_err(|_| RsaError::ValueError("signature file is truncated".to_string()))?;
    if magic != SIGNATURE_MAGIC {
        return Err(RsaError::ValueError("not an rsa signature file".to_string()));
    }
    let mut width_buf = [0u8; 4];
    file.read_exact(&mut width_buf)
        .map_err(|_| RsaError::ValueError("signature file is truncated".to_string()))?;
    let block_size = canonical::u32_from_canonical(width_buf);

    let mut signature_bytes = vec![0u8; block_size as usize];
    file.read_exact(&mut signature_bytes)
        .map_err(|_| RsaError::ValueError("signature file is truncated".to_string()))?;
    Ok((block_size, signature_bytes))
}

/// Verify that `signature_path` is a valid signature over `path` by
/// `public`. Returns `Some(metadata)` if the digest matches (the embedded
/// timestamp and geotag are then meaningful), `None` if the key and
/// signature are well-formed but the digest does not match, and `Err` for
/// anything structurally wrong (bad magic, wrong modulus width, truncated
/// file).
pub fn verify_file(
    path: &Path,
    signature_path: &Path,
    public: &KeyMaterial,
) -> Result<Option<SignatureMetadata>> {
    let (block_size, signature_bytes) = read_signature(signature_path)?;
    let modulus_bits = public.modulus_bits()?;
    let geometry = BlockGeometry::from_modulus_bits(modulus_bits);
    if block_size as usize != geometry.block_size {
        return Err(RsaError::ValueError(
            "signature was produced by a key of a different width".to_string(),
        ));
    }

    let n = public.n()?;
    let e = public.e()?;
    let signature_int = bignum::from_be_bytes(&signature_bytes);
    let recovered_int = bignum::powm(&signature_int, e, n);
    let recovered_block = canonical::right_justify(&bignum::to_be_bytes(&recovered_int), geometry.block_size);
    let payload = unpack_payload(&geometry, &recovered_block);

    if payload.len() < PAYLOAD_SIZE {
        return Err(RsaError::ValueError(
            "decrypted signature block is shorter than a signature payload".to_string(),
        ));
    }

    let digest = hash_file(path)?;
    let digest_matches: bool = payload[..DIGEST_SIZE].ct_eq(&digest).into();
    if !digest_matches {
        return Ok(None);
    }

    let unix_time = canonical::i64_from_canonical(payload[DIGEST_SIZE..DIGEST_SIZE + 8].try_into().unwrap());
    let latitude = canonical::f32_from_canonical(payload[DIGEST_SIZE + 8..DIGEST_SIZE + 12].try_into().unwrap());
    let longitude = canonical::f32_from_canonical(payload[DIGEST_SIZE + 12..PAYLOAD_SIZE].try_into().unwrap());

    Ok(Some(SignatureMetadata {
        unix_time,
        latitude,
        longitude,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyEngineConfig;
    use crate::key::generate::generate;
    use std::fs;

    fn keypair() -> KeyMaterial {
        let config = KeyEngineConfig {
            modulus_bits: 1024,
            threads: 2,
            ..KeyEngineConfig::default()
        };
        generate(&config).unwrap()
    }

    #[test]
    fn signature_verifies_against_the_original_file() {
        let material = keypair();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("message.txt");
        let sig = dir.path().join("message.sig");
        fs::write(&input, b"attack at dawn").unwrap();

        sign_file(&input, &sig, &material, Some((51.5, -0.12))).unwrap();
        let metadata = verify_file(&input, &sig, &material).unwrap();
        let metadata = metadata.expect("digest should match");
        assert_eq!(metadata.latitude, 51.5);
        assert_eq!(metadata.longitude, -0.12);
    }

    #[test]
    fn tampered_file_fails_verification() {
        let material = keypair();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("message.txt");
        let sig = dir.path().join("message.sig");
        fs::write(&input, b"attack at dawn").unwrap();

        sign_file(&input, &sig, &material, None).unwrap();
        fs::write(&input, b"attack at dusk").unwrap();
        assert!(verify_file(&input, &sig, &material).unwrap().is_none());
    }

    #[test]
    fn tampered_signature_byte_fails_verification() {
        let material = keypair();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("message.txt");
        let sig = dir.path().join("message.sig");
        fs::write(&input, b"attack at dawn").unwrap();

        sign_file(&input, &sig, &material, None).unwrap();
        let mut bytes = fs::read(&sig).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0b0000_1000;
        fs::write(&sig, &bytes).unwrap();
        assert!(verify_file(&input, &sig, &material).unwrap().is_none());
    }

    #[test]
    fn signature_from_a_different_key_width_is_rejected() {
        let material = keypair();
        let other = KeyEngineConfig {
            modulus_bits: 768,
            threads: 2,
            ..KeyEngineConfig::default()
        };
        let other_material = generate(&other).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("message.txt");
        let sig = dir.path().join("message.sig");
        fs::write(&input, b"attack at dawn").unwrap();

        sign_file(&input, &sig, &material, None).unwrap();
        assert!(verify_file(&input, &sig, &other_material).is_err());
    }
}
