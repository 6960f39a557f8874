//! Key engine: generate RSA key pairs and read/write them as typed-record
//! key files, optionally PEM-armored.

pub mod generate;
pub mod material;
pub mod pem;
pub mod record;

pub use generate::generate;
pub use material::KeyMaterial;
pub use pem::{read_key_file, write_key_file, PRIVATE_LABEL, PUBLIC_LABEL};
