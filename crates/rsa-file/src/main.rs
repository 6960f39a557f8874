//! CLI shell for the file engine: one binary, five mutually exclusive
//! modes (encrypt, decrypt, sign, verify, tell), sharing a key file and a
//! worker-thread count across whichever mode is selected.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;

use rsa_core::file::{decrypt_file, encrypt_file, sign_file, tell_key, verify_file};
use rsa_core::key::pem;
use rsa_core::FileEngineConfig;

/// Render a header/signature timestamp the way a human reads it, falling
/// back to the raw integer if it doesn't land on a representable date.
fn format_timestamp(unix_time: i64) -> String {
    match Utc.timestamp_opt(unix_time, 0).single() {
        Some(dt) => dt.to_rfc3339(),
        None => format!("{} (out of range)", unix_time),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "rsa-file",
    author,
    version,
    about = "Encrypt, decrypt, sign, verify, or inspect a file under an rsa-toolchain key"
)]
struct Cli {
    /// Encrypt `--in` under the public key, writing to `--out`.
    #[arg(short = 'e', long = "encrypt", group = "mode")]
    encrypt: bool,

    /// Decrypt `--in` under the private key, writing to `--out`.
    #[arg(short = 'd', long = "decrypt", group = "mode")]
    decrypt: bool,

    /// Sign `--in` with the private key, writing the signature to `--sig`.
    #[arg(short = 's', long = "sign", group = "mode")]
    sign: bool,

    /// Verify `--in` against the signature at `--sig` with the public key.
    #[arg(short = 'v', long = "verify", group = "mode")]
    verify: bool,

    /// Print every field loaded from `--key`, with its bit width and a hex dump.
    #[arg(short = 't', long = "tell", group = "mode")]
    tell: bool,

    /// Input file. Required for every mode except tell.
    #[arg(short = 'i', long = "in")]
    infile: Option<PathBuf>,

    /// Output file. Required for encrypt and decrypt.
    #[arg(short = 'o', long = "out")]
    outfile: Option<PathBuf>,

    /// Key file: public for encrypt/verify, private for decrypt/sign/tell.
    #[arg(short = 'k', long = "key")]
    keyfile: PathBuf,

    /// Signature file. Required for sign and verify.
    #[arg(short = 'g', long = "sig")]
    sigfile: Option<PathBuf>,

    /// Overwrite an existing output file instead of refusing.
    #[arg(short = 'w', long = "overwrite")]
    overwrite: bool,

    /// Latitude to embed in the header, for encrypt.
    #[arg(long = "latitude", allow_hyphen_values = true)]
    latitude: Option<f32>,

    /// Longitude to embed in the header, for encrypt.
    #[arg(long = "longitude", allow_hyphen_values = true)]
    longitude: Option<f32>,

    /// Worker thread count used during decrypt.
    #[arg(long = "threads")]
    threads: Option<usize>,

    /// Use the direct `c^d mod n` decrypt path instead of the CRT shortcut.
    #[arg(long = "nochinese")]
    nochinese: bool,

    /// Print extra diagnostic information.
    #[arg(long = "debug")]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mode_count = [cli.encrypt, cli.decrypt, cli.sign, cli.verify, cli.tell]
        .iter()
        .filter(|b| **b)
        .count();
    if mode_count != 1 {
        bail!("exactly one of -e, -d, -s, -v, -t must be given");
    }

    let config = FileEngineConfig {
        threads: cli.threads.unwrap_or_else(default_threads),
        allow_overwrite: cli.overwrite,
        use_crt: !cli.nochinese,
    };

    if cli.encrypt {
        let infile = cli.infile.context("-i/--in is required for --encrypt")?;
        let outfile = cli.outfile.context("-o/--out is required for --encrypt")?;
        let public = pem::read_key_file(&cli.keyfile).context("reading key file")?;
        let geotag = match (cli.latitude, cli.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            (None, None) => None,
            _ => bail!("--latitude and --longitude must be given together"),
        };
        if cli.debug {
            eprintln!("rsa-file: encrypting {} -> {}", infile.display(), outfile.display());
        }
        if let Err(e) = encrypt_file(&infile, &outfile, &public, &config, geotag) {
            rsa_core::file::remove_partial_output(&outfile);
            return Err(e.into());
        }
        println!("wrote {}", outfile.display());
    } else if cli.decrypt {
        let infile = cli.infile.context("-i/--in is required for --decrypt")?;
        let outfile = cli.outfile.context("-o/--out is required for --decrypt")?;
        let private = pem::read_key_file(&cli.keyfile).context("reading key file")?;
        private.require_usable_private_key().context("key file does not carry a private key")?;
        if cli.debug {
            eprintln!("rsa-file: decrypting {} -> {}", infile.display(), outfile.display());
        }
        let report = decrypt_file(&infile, &outfile, &private, &config)?;
        if !report.crc_matches {
            eprintln!("rsa-file: warning: recovered plaintext does not match the embedded CRC");
        }
        if cli.debug {
            eprintln!(
                "rsa-file: encrypted at {} ({}, {})",
                format_timestamp(report.header.unix_time),
                report.header.latitude,
                report.header.longitude
            );
        }
        println!("wrote {}", outfile.display());
    } else if cli.sign {
        let infile = cli.infile.context("-i/--in is required for --sign")?;
        let sigfile = cli.sigfile.context("-g/--sig is required for --sign")?;
        let private = pem::read_key_file(&cli.keyfile).context("reading key file")?;
        private.require_usable_private_key().context("key file does not carry a private key")?;
        let geotag = match (cli.latitude, cli.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            (None, None) => None,
            _ => bail!("--latitude and --longitude must be given together"),
        };
        sign_file(&infile, &sigfile, &private, geotag)?;
        println!("wrote {}", sigfile.display());
    } else if cli.verify {
        let infile = cli.infile.context("-i/--in is required for --verify")?;
        let sigfile = cli.sigfile.context("-g/--sig is required for --verify")?;
        let public = pem::read_key_file(&cli.keyfile).context("reading key file")?;
        match verify_file(&infile, &sigfile, &public)? {
            Some(metadata) => {
                println!("signature OK");
                println!(
                    "signed at {} ({}, {})",
                    format_timestamp(metadata.unix_time),
                    metadata.latitude,
                    metadata.longitude
                );
            }
            None => {
                println!("signature FAILED");
                std::process::exit(1);
            }
        }
    } else if cli.tell {
        let key = pem::read_key_file(&cli.keyfile).context("reading key file")?;
        let report = tell_key(&key);
        for f in &report.fields {
            println!("{} ({} bits): {}", f.name, f.bit_width, f.hex);
        }
    }

    Ok(())
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(rsa_core::limits::MAX_THREADS)
}
