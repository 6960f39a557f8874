//! Diffie-Hellman-Merkle key exchange: a session produces Alice's packet,
//! a peer consumes it to produce Bob's packet, and Alice consumes Bob's
//! packet to finish with the same shared secret Bob already holds.
//!
//! This crate deliberately reuses [`rsa_core`]'s bignum facade, canonical
//! byte layout, entropy handle, and error taxonomy rather than duplicating
//! them: the two subsystems describe the same large-integer and framing
//! idioms, just over a different wire shape.

pub mod packet;
pub mod session;

pub use packet::{AlicePacket, AlicePrivateKey, BobPacket, BobPrivateKey, ALICE_PACKTYPE, BOB_PACKTYPE};
pub use session::DhmSession;

pub use rsa_core::error::{Result, RsaError};
