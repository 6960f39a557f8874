//! The typed-record wire format a key file is built from: a stream of
//! `{type: u8, bit_width: u32 BE, payload: bit_width/8 bytes BE}` records,
//! one per key field, terminated by end of file.

use std::io::{Read, Write};

use crate::bignum::{self, Bignum};
use crate::canonical;
use crate::error::{Result, RsaError};

/// Fixed on-disk width of the public exponent field: always a 4-byte,
/// 32-bit payload regardless of the exponent's actual magnitude, so a
/// small `e` like 65537 still serializes as a right-justified 32-bit value.
const PUBLIC_EXPONENT_BITS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldKind {
    Modulus = 1,
    PublicExponent = 2,
    PrivateExponent = 3,
    PrimeP = 4,
    PrimeQ = 5,
    Dp = 6,
    Dq = 7,
    QInv = 8,
}

impl FieldKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => FieldKind::Modulus,
            2 => FieldKind::PublicExponent,
            3 => FieldKind::PrivateExponent,
            4 => FieldKind::PrimeP,
            5 => FieldKind::PrimeQ,
            6 => FieldKind::Dp,
            7 => FieldKind::Dq,
            8 => FieldKind::QInv,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Modulus => "modulus",
            FieldKind::PublicExponent => "public exponent",
            FieldKind::PrivateExponent => "private exponent",
            FieldKind::PrimeP => "prime p",
            FieldKind::PrimeQ => "prime q",
            FieldKind::Dp => "dp",
            FieldKind::Dq => "dq",
            FieldKind::QInv => "qinv",
        }
    }
}

/// One `{type, bit_width, payload}` record.
#[derive(Debug, Clone)]
pub struct Record {
    pub kind_tag: u8,
    pub bit_width: u32,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn from_bignum(kind: FieldKind, value: &Bignum) -> Self {
        let (bit_width, payload) = if kind == FieldKind::PublicExponent {
            let width = (PUBLIC_EXPONENT_BITS / 8) as usize;
            (PUBLIC_EXPONENT_BITS, canonical::right_justify(&bignum::to_be_bytes(value), width))
        } else {
            let payload = bignum::to_be_bytes(value);
            ((payload.len() as u32) * 8, payload)
        };
        Record {
            kind_tag: kind as u8,
            bit_width,
            payload,
        }
    }

    pub fn to_bignum(&self) -> Bignum {
        bignum::from_be_bytes(&self.payload)
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&[self.kind_tag])?;
        out.write_all(&canonical::u32_to_canonical(self.bit_width))?;
        out.write_all(&self.payload)?;
        Ok(())
    }

    /// Read a single record, or `Ok(None)` at a clean end of stream.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Option<Self>> {
        let mut tag = [0u8; 1];
        match input.read(&mut tag)? {
            0 => return Ok(None),
            1 => {}
            _ => unreachable!(),
        }

        let mut width_buf = [0u8; 4];
        input
            .read_exact(&mut width_buf)
            .map_err(|_| RsaError::KeyFieldTruncated {
                field: "bit_width",
                needed: 4,
                had: 0,
            })?;
        let bit_width = canonical::u32_from_canonical(width_buf);
        let byte_width = (bit_width as usize).div_ceil(8);

        let mut payload = vec![0u8; byte_width];
        input
            .read_exact(&mut payload)
            .map_err(|_| RsaError::KeyFieldTruncated {
                field: "payload",
                needed: byte_width,
                had: 0,
            })?;

        Ok(Some(Record {
            kind_tag: tag[0],
            bit_width,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_roundtrips_through_bytes() {
        let n = Bignum::from(0xdead_beef_u64);
        let record = Record::from_bignum(FieldKind::Modulus, &n);

        let mut buf = Vec::new();
        record.write_to(&mut buf).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let parsed = Record::read_from(&mut cursor).unwrap().unwrap();
        assert_eq!(parsed.kind_tag, FieldKind::Modulus as u8);
        assert_eq!(parsed.to_bignum(), n);
        assert!(Record::read_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn unknown_field_kind_is_recoverable() {
        assert!(FieldKind::from_tag(200).is_none());
    }

    #[test]
    fn public_exponent_always_serializes_at_32_bits() {
        let e = Bignum::from(65537u32);
        let record = Record::from_bignum(FieldKind::PublicExponent, &e);
        assert_eq!(record.bit_width, 32);
        assert_eq!(record.payload, vec![0x00, 0x01, 0x00, 0x01]);
        assert_eq!(record.to_bignum(), e);
    }
}
