//! In-memory key material: a sparse record of whichever fields a key file
//! actually carried. A public key has `modulus` and `public_exponent`; a
//! private key additionally carries the rest.

use zeroize::Zeroize;

use crate::bignum::{self, Bignum};
use crate::error::{Result, RsaError};
use crate::limits::MIN_MODULUS_BITS;

use super::record::{FieldKind, Record};

/// Whichever fields were present in the key file that produced this value.
///
/// Unlike a typical `PublicKey`/`PrivateKey` split, this stays sparse on
/// purpose: a key file that was truncated or hand-edited should fail at
/// the point a missing field is actually needed, not at load time.
#[derive(Debug, Clone, Default)]
pub struct KeyMaterial {
    pub modulus: Option<Bignum>,
    pub public_exponent: Option<Bignum>,
    pub private_exponent: Option<Bignum>,
    pub prime_p: Option<Bignum>,
    pub prime_q: Option<Bignum>,
    pub dp: Option<Bignum>,
    pub dq: Option<Bignum>,
    pub qinv: Option<Bignum>,
}

impl KeyMaterial {
    pub fn modulus_bits(&self) -> Result<u32> {
        let n = self.modulus.as_ref().ok_or(RsaError::MissingKeyField("modulus"))?;
        Ok(bignum::bit_length(n))
    }

    pub fn require_modulus_bits(&self, minimum: u32) -> Result<()> {
        let bits = self.modulus_bits()?;
        if bits < minimum {
            return Err(RsaError::ModulusTooSmall { bits, minimum });
        }
        Ok(())
    }

    pub fn is_public(&self) -> bool {
        self.modulus.is_some() && self.public_exponent.is_some()
    }

    pub fn is_private(&self) -> bool {
        self.modulus.is_some()
            && self.private_exponent.is_some()
            && self.prime_p.is_some()
            && self.prime_q.is_some()
    }

    pub fn n(&self) -> Result<&Bignum> {
        self.modulus.as_ref().ok_or(RsaError::MissingKeyField("modulus"))
    }

    pub fn e(&self) -> Result<&Bignum> {
        self.public_exponent.as_ref().ok_or(RsaError::MissingKeyField("public exponent"))
    }

    pub fn d(&self) -> Result<&Bignum> {
        self.private_exponent.as_ref().ok_or(RsaError::MissingKeyField("private exponent"))
    }

    pub fn p(&self) -> Result<&Bignum> {
        self.prime_p.as_ref().ok_or(RsaError::MissingKeyField("prime p"))
    }

    pub fn q(&self) -> Result<&Bignum> {
        self.prime_q.as_ref().ok_or(RsaError::MissingKeyField("prime q"))
    }

    pub fn dp(&self) -> Result<&Bignum> {
        self.dp.as_ref().ok_or(RsaError::MissingKeyField("dp"))
    }

    pub fn dq(&self) -> Result<&Bignum> {
        self.dq.as_ref().ok_or(RsaError::MissingKeyField("dq"))
    }

    pub fn qinv(&self) -> Result<&Bignum> {
        self.qinv.as_ref().ok_or(RsaError::MissingKeyField("qinv"))
    }

    /// Recompute `dp`, `dq`, `qinv` from `p`, `q`, `d` and check they match
    /// what the file claimed, if it claimed anything at all.
    pub fn verify_crt_consistency(&self) -> Result<()> {
        let p = self.p()?;
        let q = self.q()?;
        let d = self.d()?;

        let one = Bignum::from(1);
        let expected_dp = Bignum::from(d % (p.clone() - &one));
        let expected_dq = Bignum::from(d % (q.clone() - &one));
        let expected_qinv = bignum::invert(q, p).ok_or_else(|| {
            RsaError::ValueError("q has no inverse mod p; key material is inconsistent".to_string())
        })?;

        if let Some(dp) = &self.dp {
            if dp != &expected_dp {
                return Err(RsaError::ValueError("dp does not match p, q, d".to_string()));
            }
        }
        if let Some(dq) = &self.dq {
            if dq != &expected_dq {
                return Err(RsaError::ValueError("dq does not match p, q, d".to_string()));
            }
        }
        if let Some(qinv) = &self.qinv {
            if qinv != &expected_qinv {
                return Err(RsaError::ValueError("qinv does not match p, q".to_string()));
            }
        }
        Ok(())
    }

    pub fn to_records(&self) -> Vec<Record> {
        let mut records = Vec::new();
        if let Some(n) = &self.modulus {
            records.push(Record::from_bignum(FieldKind::Modulus, n));
        }
        if let Some(e) = &self.public_exponent {
            records.push(Record::from_bignum(FieldKind::PublicExponent, e));
        }
        if let Some(d) = &self.private_exponent {
            records.push(Record::from_bignum(FieldKind::PrivateExponent, d));
        }
        if let Some(p) = &self.prime_p {
            records.push(Record::from_bignum(FieldKind::PrimeP, p));
        }
        if let Some(q) = &self.prime_q {
            records.push(Record::from_bignum(FieldKind::PrimeQ, q));
        }
        if let Some(dp) = &self.dp {
            records.push(Record::from_bignum(FieldKind::Dp, dp));
        }
        if let Some(dq) = &self.dq {
            records.push(Record::from_bignum(FieldKind::Dq, dq));
        }
        if let Some(qinv) = &self.qinv {
            records.push(Record::from_bignum(FieldKind::QInv, qinv));
        }
        records
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        let mut material = KeyMaterial::default();
        for record in records {
            match FieldKind::from_tag(record.kind_tag) {
                Some(FieldKind::Modulus) => material.modulus = Some(record.to_bignum()),
                Some(FieldKind::PublicExponent) => material.public_exponent = Some(record.to_bignum()),
                Some(FieldKind::PrivateExponent) => material.private_exponent = Some(record.to_bignum()),
                Some(FieldKind::PrimeP) => material.prime_p = Some(record.to_bignum()),
                Some(FieldKind::PrimeQ) => material.prime_q = Some(record.to_bignum()),
                Some(FieldKind::Dp) => material.dp = Some(record.to_bignum()),
                Some(FieldKind::Dq) => material.dq = Some(record.to_bignum()),
                Some(FieldKind::QInv) => material.qinv = Some(record.to_bignum()),
                None => {
                    // Unknown field tag: skip it and keep parsing the rest
                    // of the file rather than failing outright.
                    eprintln!("rsa: skipping unknown key field tag {}", record.kind_tag);
                }
            }
        }
        material
    }

    /// Extra guard used right before a private-key operation: confirm the
    /// modulus meets the minimum width this build will operate on.
    pub fn require_usable_private_key(&self) -> Result<()> {
        if !self.is_private() {
            return Err(RsaError::MissingKeyField("private exponent, prime p, or prime q"));
        }
        self.require_modulus_bits(MIN_MODULUS_BITS)
    }
}

/// Zero out the private scalar fields in place before the material is
/// dropped. `rug::Integer`'s own heap buffer is not guaranteed scrubbed by
/// this -- it only clears the stack-resident handle -- but it keeps the
/// struct from being accidentally cloned and reused after a caller meant
/// to discard it.
impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.private_exponent = None;
        self.dp = None;
        self.dq = None;
        self.qinv = None;
        self.prime_p = None;
        self.prime_q = None;
    }
}

/// Random scratch buffer for a candidate prime, zeroized on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct CandidateBuffer(pub Vec<u8>);
