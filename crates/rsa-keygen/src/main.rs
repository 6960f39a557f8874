//! CLI shell for the key engine: parse arguments into a validated
//! [`rsa_core::KeyEngineConfig`], generate a key pair, and write it out in
//! binary or PEM-armored form.
//!
//! Terminal coloring, a progress meter, and a terminal-width probe are
//! explicitly out of scope for this exercise's core; `--nocolor` is
//! accepted for command-line compatibility but this shell only ever
//! writes plain, uncolored status lines.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;

use rsa_core::key::{self, pem};
use rsa_core::KeyEngineConfig;

#[derive(Parser, Debug)]
#[command(
    name = "rsa-keygen",
    author,
    version,
    about = "Generate an RSA key pair in the rsa-toolchain's proprietary key format"
)]
struct Cli {
    /// Modulus width in bits (768..=262144, multiple of 256).
    #[arg(short = 'b', long = "bits", default_value_t = 4096)]
    bits: u32,

    /// Worker thread count racing to find p and q.
    #[arg(short = 't', long = "threads")]
    threads: Option<usize>,

    /// Output filename stem; writes `<stem>-public.*` and `<stem>-private.*`.
    #[arg(short = 'o', long = "out", default_value = "default")]
    out: String,

    /// Write PEM-armored output instead of raw binary.
    #[arg(long = "pem")]
    pem: bool,

    /// Accepted for CLI compatibility; this build never colors output.
    #[arg(long = "nocolor")]
    nocolor: bool,

    /// Print extra diagnostic information about the generation run.
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = cli.nocolor;

    if cli.bits % 256 != 0 {
        bail!("--bits must be a multiple of 256 (got {})", cli.bits);
    }
    if cli.bits < rsa_core::limits::MIN_MODULUS_BITS || cli.bits > rsa_core::limits::MAX_MODULUS_BITS {
        bail!(
            "--bits must be between {} and {} (got {})",
            rsa_core::limits::MIN_MODULUS_BITS,
            rsa_core::limits::MAX_MODULUS_BITS,
            cli.bits
        );
    }

    let config = KeyEngineConfig {
        modulus_bits: cli.bits,
        threads: cli.threads.unwrap_or_else(default_threads),
        ..KeyEngineConfig::default()
    };

    if cli.debug {
        eprintln!(
            "rsa-keygen: generating a {}-bit key with {} worker thread(s)",
            config.modulus_bits, config.threads
        );
    }

    let started = Instant::now();
    let material = key::generate(&config).context("key generation failed")?;
    if cli.debug {
        eprintln!("rsa-keygen: found p and q in {:.2?}", started.elapsed());
        eprintln!(
            "rsa-keygen: n has {} bits, d has {} bits",
            material.modulus_bits()?,
            rsa_core::bignum::bit_length(material.d()?)
        );
    }

    let ext = if cli.pem { "pem" } else { "bin" };
    let public_path = PathBuf::from(format!("{}-public.{}", cli.out, ext));
    let private_path = PathBuf::from(format!("{}-private.{}", cli.out, ext));

    let mut public_only = material.clone();
    public_only.private_exponent = None;
    public_only.prime_p = None;
    public_only.prime_q = None;
    public_only.dp = None;
    public_only.dq = None;
    public_only.qinv = None;

    pem::write_key_file(&public_path, &public_only, cli.pem).context("writing public key file")?;
    pem::write_key_file(&private_path, &material, cli.pem).context("writing private key file")?;

    println!("wrote {}", public_path.display());
    println!("wrote {}", private_path.display());
    Ok(())
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(rsa_core::limits::MAX_THREADS)
}
