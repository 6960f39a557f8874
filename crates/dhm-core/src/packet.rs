//! The wire shape of Alice's and Bob's packets: a packet-type tag, a
//! SHA-224 self-hash over everything that follows it, a session GUID, and
//! the packet's cryptographic payload.

use sha2::{Digest, Sha224};
use zeroize::Zeroize;

use rsa_core::canonical;
use rsa_core::error::{Result, RsaError};

/// Bit width of the DHM public modulus and public values `p`, `A`, `B`.
pub const PUB_BITS: u32 = 2176;
/// Byte width of the DHM public modulus and public values `p`, `A`, `B`.
pub const PUB_SIZE: usize = 272;
/// Bit width of each side's private exponent.
pub const PRIV_BITS: u32 = 368;
/// Byte width of each side's private exponent.
pub const PRIV_SIZE: usize = 46;
/// Byte width of the session GUID.
pub const GUID_SIZE: usize = 12;
/// Byte width of a SHA-224 digest.
pub const HASH_SIZE: usize = 28;

/// Alice packet type stamp, stored in network byte order.
pub const ALICE_PACKTYPE: u16 = 0xc1a5;
/// Bob packet type stamp, stored in network byte order.
pub const BOB_PACKTYPE: u16 = 0xc2a5;

/// The message the initiator sends first: a candidate prime modulus `p`,
/// a small generator `g`, and the initiator's public value `A = g^a mod p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlicePacket {
    pub packtype: u16,
    pub hash: [u8; HASH_SIZE],
    pub guid: [u8; GUID_SIZE],
    pub g: u16,
    pub p: [u8; PUB_SIZE],
    pub a_public: [u8; PUB_SIZE],
}

/// Alice's private exponent `a`. Kept separate from [`AlicePacket`] because
/// it is never transmitted; zeroized on drop like the RSA key engine's
/// private scalars.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct AlicePrivateKey {
    pub key: [u8; PRIV_SIZE],
}

/// The message the responder sends back: its own public value
/// `B = g^b mod p`. The shared secret is not transmitted; both sides
/// derive it independently from the packets they have already exchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BobPacket {
    pub packtype: u16,
    pub hash: [u8; HASH_SIZE],
    pub guid: [u8; GUID_SIZE],
    pub b_public: [u8; PUB_SIZE],
}

/// Bob's private exponent `b`, zeroized on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct BobPrivateKey {
    pub key: [u8; PRIV_SIZE],
}

impl AlicePacket {
    /// Everything this packet hashes over: the GUID, generator, modulus,
    /// and public value, in wire order. Excludes `packtype` and `hash`
    /// itself, since the hash can only cover what comes after it.
    fn hashed_region(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(GUID_SIZE + 2 + PUB_SIZE + PUB_SIZE);
        buf.extend_from_slice(&self.guid);
        buf.extend_from_slice(&canonical::u16_to_canonical(self.g));
        buf.extend_from_slice(&self.p);
        buf.extend_from_slice(&self.a_public);
        buf
    }

    pub(crate) fn compute_hash(&self) -> [u8; HASH_SIZE] {
        Sha224::digest(self.hashed_region()).into()
    }

    /// Serialize to the packet's on-wire byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + HASH_SIZE + GUID_SIZE + 2 + PUB_SIZE + PUB_SIZE);
        buf.extend_from_slice(&canonical::u16_to_canonical(self.packtype));
        buf.extend_from_slice(&self.hash);
        buf.extend_from_slice(&self.hashed_region());
        buf
    }

    /// Parse a packet from its on-wire byte layout. Does not validate the
    /// packet type or hash; callers that consume a received packet should
    /// call [`AlicePacket::validate`] afterward.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let expected = 2 + HASH_SIZE + GUID_SIZE + 2 + PUB_SIZE + PUB_SIZE;
        if bytes.len() != expected {
            return Err(RsaError::ValueError(format!(
                "Alice packet must be {} bytes, got {}",
                expected,
                bytes.len()
            )));
        }
        let mut pos = 0;
        let packtype = canonical::u16_from_canonical(bytes[pos..pos + 2].try_into().unwrap());
        pos += 2;
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&bytes[pos..pos + HASH_SIZE]);
        pos += HASH_SIZE;
        let mut guid = [0u8; GUID_SIZE];
        guid.copy_from_slice(&bytes[pos..pos + GUID_SIZE]);
        pos += GUID_SIZE;
        let g = canonical::u16_from_canonical(bytes[pos..pos + 2].try_into().unwrap());
        pos += 2;
        let mut p = [0u8; PUB_SIZE];
        p.copy_from_slice(&bytes[pos..pos + PUB_SIZE]);
        pos += PUB_SIZE;
        let mut a_public = [0u8; PUB_SIZE];
        a_public.copy_from_slice(&bytes[pos..pos + PUB_SIZE]);

        Ok(AlicePacket {
            packtype,
            hash,
            guid,
            g,
            p,
            a_public,
        })
    }

    /// Check the packet type tag and self-hash before trusting any field.
    pub fn validate(&self) -> Result<()> {
        if self.packtype != ALICE_PACKTYPE {
            return Err(RsaError::UnknownPacketType(self.packtype));
        }
        if self.compute_hash() != self.hash {
            return Err(RsaError::HashMismatch);
        }
        Ok(())
    }
}

impl BobPacket {
    fn hashed_region(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(GUID_SIZE + PUB_SIZE);
        buf.extend_from_slice(&self.guid);
        buf.extend_from_slice(&self.b_public);
        buf
    }

    pub(crate) fn compute_hash(&self) -> [u8; HASH_SIZE] {
        Sha224::digest(self.hashed_region()).into()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + HASH_SIZE + GUID_SIZE + PUB_SIZE);
        buf.extend_from_slice(&canonical::u16_to_canonical(self.packtype));
        buf.extend_from_slice(&self.hash);
        buf.extend_from_slice(&self.hashed_region());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let expected = 2 + HASH_SIZE + GUID_SIZE + PUB_SIZE;
        if bytes.len() != expected {
            return Err(RsaError::ValueError(format!(
                "Bob packet must be {} bytes, got {}",
                expected,
                bytes.len()
            )));
        }
        let mut pos = 0;
        let packtype = canonical::u16_from_canonical(bytes[pos..pos + 2].try_into().unwrap());
        pos += 2;
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&bytes[pos..pos + HASH_SIZE]);
        pos += HASH_SIZE;
        let mut guid = [0u8; GUID_SIZE];
        guid.copy_from_slice(&bytes[pos..pos + GUID_SIZE]);
        pos += GUID_SIZE;
        let mut b_public = [0u8; PUB_SIZE];
        b_public.copy_from_slice(&bytes[pos..pos + PUB_SIZE]);

        Ok(BobPacket {
            packtype,
            hash,
            guid,
            b_public,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.packtype != BOB_PACKTYPE {
            return Err(RsaError::UnknownPacketType(self.packtype));
        }
        if self.compute_hash() != self.hash {
            return Err(RsaError::HashMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alice() -> AlicePacket {
        let mut packet = AlicePacket {
            packtype: ALICE_PACKTYPE,
            hash: [0u8; HASH_SIZE],
            guid: [0x11; GUID_SIZE],
            g: 5,
            p: [0x22; PUB_SIZE],
            a_public: [0x33; PUB_SIZE],
        };
        packet.hash = packet.compute_hash();
        packet
    }

    #[test]
    fn alice_packet_roundtrips_through_bytes() {
        let packet = sample_alice();
        let bytes = packet.to_bytes();
        assert_eq!(bytes.len(), 2 + HASH_SIZE + GUID_SIZE + 2 + PUB_SIZE + PUB_SIZE);
        let parsed = AlicePacket::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, packet);
        parsed.validate().unwrap();
    }

    #[test]
    fn alice_packet_rejects_wrong_type() {
        let mut packet = sample_alice();
        packet.packtype = BOB_PACKTYPE;
        assert!(matches!(packet.validate(), Err(RsaError::UnknownPacketType(_))));
    }

    #[test]
    fn alice_packet_rejects_tampered_hash() {
        let mut packet = sample_alice();
        packet.p[0] ^= 0xff;
        assert!(matches!(packet.validate(), Err(RsaError::HashMismatch)));
    }

    #[test]
    fn bob_packet_roundtrips_through_bytes() {
        use hex_literal::hex;
        let guid: [u8; GUID_SIZE] = hex!("00112233445566778899aabb");
        let mut packet = BobPacket {
            packtype: BOB_PACKTYPE,
            hash: [0u8; HASH_SIZE],
            guid,
            b_public: [0xbb; PUB_SIZE],
        };
        packet.hash = packet.compute_hash();

        let bytes = packet.to_bytes();
        assert_eq!(bytes.len(), 2 + HASH_SIZE + GUID_SIZE + PUB_SIZE);
        let parsed = BobPacket::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, packet);
        parsed.validate().unwrap();
    }
}
