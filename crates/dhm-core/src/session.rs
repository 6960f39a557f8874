//! Session state for one side of a DHM exchange: the GUID that ties
//! Alice's and Bob's packets together, and the shared secret once derived.

use zeroize::Zeroize;

use rsa_core::bignum::{self, Bignum, Primality};
use rsa_core::canonical;
use rsa_core::entropy;
use rsa_core::error::Result;

use crate::packet::{
    AlicePacket, AlicePrivateKey, BobPacket, BobPrivateKey, ALICE_PACKTYPE, BOB_PACKTYPE, GUID_SIZE, PUB_SIZE,
};

/// One side's view of a DHM exchange. Owns the session GUID and, once an
/// exchange completes, the derived shared secret.
///
/// The entropy handle is not owned here: it is the same process-global
/// handle the RSA key and file engines use ([`rsa_core::entropy::global`]),
/// so the "warm up 32 reads of 256 bytes" step described for DHM sessions
/// happens once per process rather than once per session.
pub struct DhmSession {
    pub guid: [u8; GUID_SIZE],
    secret: Option<Secret>,
}

#[derive(Zeroize)]
#[zeroize(drop)]
struct Secret([u8; PUB_SIZE]);

impl DhmSession {
    /// Start a new session with a freshly drawn GUID.
    pub fn open() -> Result<Self> {
        let mut guid = [0u8; GUID_SIZE];
        guid.copy_from_slice(&entropy::global().bytes(GUID_SIZE)?);
        Ok(DhmSession { guid, secret: None })
    }

    /// The derived shared secret, if this session has completed an
    /// exchange as either Alice or Bob.
    pub fn secret(&self) -> Option<&[u8; PUB_SIZE]> {
        self.secret.as_ref().map(|s| &s.0)
    }

    /// Draw and shape a candidate DHM modulus: force the top bit so it
    /// sits in `[2^(PUB_BITS-1), 2^PUB_BITS)`, force it odd, and promote to
    /// the next prime if it is not probably prime.
    fn draw_modulus() -> Result<Bignum> {
        let mut bytes = entropy::global().bytes(PUB_SIZE)?;
        bytes[0] |= 0x80;
        *bytes.last_mut().unwrap() |= 0x01;
        let candidate = bignum::from_be_bytes(&bytes);
        Ok(match bignum::probab_prime(&candidate) {
            Primality::Composite => bignum::next_prime(&candidate),
            Primality::ProbablyPrime | Primality::Prime => candidate,
        })
    }

    fn choose_generator() -> Result<u16> {
        let draw = entropy::global().bytes(4)?;
        let word = u32::from_be_bytes(draw.try_into().unwrap());
        Ok(if word & 1 == 0 { 3 } else { 5 })
    }

    /// Produce the first packet of an exchange: a candidate modulus `p`, a
    /// generator `g`, and this session's public value `A = g^a mod p`.
    pub fn generate_alice(&self) -> Result<(AlicePacket, AlicePrivateKey)> {
        let p = Self::draw_modulus()?;
        let g = Self::choose_generator()?;

        let a_bytes = entropy::global().bytes(crate::packet::PRIV_SIZE)?;
        let a = bignum::from_be_bytes(&a_bytes);

        let a_public = bignum::powm(&Bignum::from(g), &a, &p);

        let mut packet = AlicePacket {
            packtype: ALICE_PACKTYPE,
            hash: [0u8; crate::packet::HASH_SIZE],
            guid: self.guid,
            g,
            p: field(&p, PUB_SIZE),
            a_public: field(&a_public, PUB_SIZE),
        };
        packet.hash = packet.compute_hash();

        let mut key = [0u8; crate::packet::PRIV_SIZE];
        key.copy_from_slice(&canonical::right_justify(&magnitude_bytes(&a), crate::packet::PRIV_SIZE));

        Ok((packet, AlicePrivateKey { key }))
    }

    /// Consume a received Alice packet, producing this session's reply
    /// packet and deriving the shared secret along the way.
    pub fn generate_bob(&mut self, alice: &AlicePacket) -> Result<(BobPacket, BobPrivateKey)> {
        alice.validate()?;
        self.guid = alice.guid;

        let p = bignum::from_be_bytes(&alice.p);
        let g = Bignum::from(alice.g);
        let a_public = bignum::from_be_bytes(&alice.a_public);

        let b_bytes = entropy::global().bytes(crate::packet::PRIV_SIZE)?;
        let b = bignum::from_be_bytes(&b_bytes);

        let b_public = bignum::powm(&g, &b, &p);
        let secret = bignum::powm(&a_public, &b, &p);
        self.secret = Some(Secret(field(&secret, PUB_SIZE)));

        let mut packet = BobPacket {
            packtype: BOB_PACKTYPE,
            hash: [0u8; crate::packet::HASH_SIZE],
            guid: self.guid,
            b_public: field(&b_public, PUB_SIZE),
        };
        packet.hash = packet.compute_hash();

        let mut key = [0u8; crate::packet::PRIV_SIZE];
        key.copy_from_slice(&canonical::right_justify(&magnitude_bytes(&b), crate::packet::PRIV_SIZE));

        Ok((packet, BobPrivateKey { key }))
    }

    /// Consume a received Bob packet, deriving the same shared secret Bob
    /// already holds.
    pub fn finalize_alice(
        &mut self,
        alice: &AlicePacket,
        alice_private: &AlicePrivateKey,
        bob: &BobPacket,
    ) -> Result<()> {
        bob.validate()?;

        let p = bignum::from_be_bytes(&alice.p);
        let b_public = bignum::from_be_bytes(&bob.b_public);
        let a = bignum::from_be_bytes(&alice_private.key);

        let secret = bignum::powm(&b_public, &a, &p);
        self.secret = Some(Secret(field(&secret, PUB_SIZE)));
        Ok(())
    }
}

/// Export a bignum to an exactly-`width`-byte big-endian field, padding
/// with leading zeros as needed (the "right-justify" step every DHM
/// export requires, same as the RSA file and key engines).
fn field(value: &Bignum, width: usize) -> [u8; PUB_SIZE] {
    debug_assert_eq!(width, PUB_SIZE);
    let mut out = [0u8; PUB_SIZE];
    let padded = canonical::right_justify(&bignum::to_be_bytes(value), width);
    out.copy_from_slice(&padded);
    out
}

fn magnitude_bytes(value: &Bignum) -> Vec<u8> {
    bignum::to_be_bytes(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alice_and_bob_agree_on_the_same_secret() {
        let alice_session = DhmSession::open().unwrap();
        let (alice_packet, alice_private) = alice_session.generate_alice().unwrap();

        let mut bob_session = DhmSession::open().unwrap();
        let (bob_packet, _bob_private) = bob_session.generate_bob(&alice_packet).unwrap();

        let mut alice_session = alice_session;
        alice_session
            .finalize_alice(&alice_packet, &alice_private, &bob_packet)
            .unwrap();

        assert_eq!(alice_session.secret(), bob_session.secret());
        assert!(alice_session.secret().is_some());
    }

    #[test]
    fn bob_rejects_a_forged_alice_packet() {
        let alice_session = DhmSession::open().unwrap();
        let (mut alice_packet, _alice_private) = alice_session.generate_alice().unwrap();
        alice_packet.g = if alice_packet.g == 3 { 5 } else { 3 };

        let mut bob_session = DhmSession::open().unwrap();
        assert!(bob_session.generate_bob(&alice_packet).is_err());
    }

    #[test]
    fn bob_packet_carries_alice_guid() {
        let alice_session = DhmSession::open().unwrap();
        let (alice_packet, _alice_private) = alice_session.generate_alice().unwrap();

        let mut bob_session = DhmSession::open().unwrap();
        let (bob_packet, _bob_private) = bob_session.generate_bob(&alice_packet).unwrap();

        assert_eq!(bob_packet.guid, alice_packet.guid);
        assert_eq!(bob_session.guid, alice_packet.guid);
    }
}
