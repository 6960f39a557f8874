//! Inspect a loaded key: print each field that is actually present,
//! alongside its bit width and a hex dump of its magnitude. Operates on
//! whatever the key file carried; a public key file only yields two
//! lines, a private one yields all eight.

use crate::bignum;
use crate::canonical;
use crate::key::KeyMaterial;

/// One reported key field: its name, its declared bit width, and the hex
/// encoding of its big-endian magnitude.
#[derive(Debug, Clone)]
pub struct FieldReport {
    pub name: &'static str,
    pub bit_width: u32,
    pub hex: String,
}

/// Everything `tell` reports about a loaded key.
#[derive(Debug, Clone)]
pub struct TellReport {
    pub fields: Vec<FieldReport>,
}

fn field(name: &'static str, declared_bits: u32, value: &bignum::Bignum) -> FieldReport {
    let byte_width = (declared_bits as usize).div_ceil(8);
    let bytes = canonical::right_justify(&bignum::to_be_bytes(value), byte_width);
    FieldReport {
        name,
        bit_width: declared_bits,
        hex: hex::encode(bytes),
    }
}

/// Build a field-by-field report of `key`, matching whichever fields were
/// actually present when it was loaded.
pub fn tell_key(key: &KeyMaterial) -> TellReport {
    let mut fields = Vec::new();

    if let Some(n) = &key.modulus {
        let bits = bignum::bit_length(n);
        fields.push(field("modulus n", bits, n));
    }
    if let Some(e) = &key.public_exponent {
        fields.push(field("public exponent e", 32, e));
    }

    // p, q, dp, dq, qinv are each half the modulus width; d is full width.
    // Fall back to each value's own bit length when the modulus record
    // isn't loaded (e.g. a hand-edited private-only file).
    let half_bits = key
        .modulus
        .as_ref()
        .map(bignum::bit_length)
        .unwrap_or(0)
        / 2;
    let full_bits = key.modulus.as_ref().map(bignum::bit_length).unwrap_or(0);

    if let Some(d) = &key.private_exponent {
        let bits = if full_bits > 0 { full_bits } else { bignum::bit_length(d) };
        fields.push(field("private exponent d", bits, d));
    }
    if let Some(p) = &key.prime_p {
        let bits = if half_bits > 0 { half_bits } else { bignum::bit_length(p) };
        fields.push(field("prime p", bits, p));
    }
    if let Some(q) = &key.prime_q {
        let bits = if half_bits > 0 { half_bits } else { bignum::bit_length(q) };
        fields.push(field("prime q", bits, q));
    }
    if let Some(dp) = &key.dp {
        let bits = if half_bits > 0 { half_bits } else { bignum::bit_length(dp) };
        fields.push(field("exponent dp", bits, dp));
    }
    if let Some(dq) = &key.dq {
        let bits = if half_bits > 0 { half_bits } else { bignum::bit_length(dq) };
        fields.push(field("exponent dq", bits, dq));
    }
    if let Some(qinv) = &key.qinv {
        let bits = if half_bits > 0 { half_bits } else { bignum::bit_length(qinv) };
        fields.push(field("coefficient qinv", bits, qinv));
    }

    TellReport { fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyEngineConfig;
    use crate::key::generate::generate;

    #[test]
    fn reports_every_private_field() {
        let config = KeyEngineConfig {
            modulus_bits: 768,
            threads: 2,
            ..KeyEngineConfig::default()
        };
        let material = generate(&config).unwrap();
        let report = tell_key(&material);

        let names: Vec<&str> = report.fields.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                "modulus n",
                "public exponent e",
                "private exponent d",
                "prime p",
                "prime q",
                "exponent dp",
                "exponent dq",
                "coefficient qinv",
            ]
        );
        for f in &report.fields {
            assert_eq!(f.hex.len() * 4, f.bit_width as usize);
        }
    }

    #[test]
    fn public_only_key_reports_two_fields() {
        let mut material = KeyMaterial::default();
        material.modulus = Some(crate::bignum::Bignum::from(0xdead_beef_u32));
        material.public_exponent = Some(crate::bignum::Bignum::from(65537u32));
        let report = tell_key(&material);
        assert_eq!(report.fields.len(), 2);
    }
}
