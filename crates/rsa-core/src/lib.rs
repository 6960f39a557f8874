//! Bignum facade, entropy source, byte-level utilities, key engine, and
//! file engine for a from-scratch RSA toolchain.
//!
//! This crate does not implement RSA the way a standards-track library
//! would: there is no PKCS#1 padding, no ASN.1, no X.509. It implements
//! one proprietary key file format and one proprietary block-stream
//! ciphertext format, described in full by [`key`] and [`file`]
//! respectively.

pub mod armor;
pub mod bignum;
pub mod canonical;
pub mod config;
pub mod crc32;
pub mod entropy;
pub mod error;
pub mod file;
pub mod key;
pub mod limits;

pub use config::{FileEngineConfig, KeyEngineConfig};
pub use error::{Result, RsaError};
