//! Signature records with partially known nonces

use crate::math::{parse_decimal_strict, ScalarKind};
use anyhow::{bail, Result};
use rug::Integer;
use serde::{Deserialize, Serialize};

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.trim().is_empty()))
}

/// Wire form of one observed signature, as read from JSON or CSV.
///
/// All integers are decimal strings. `kp` is the value of the leaked nonce
/// bits (low bits for LSB leakage, top bits for MSB leakage) and defaults to
/// zero. `leak_bits` defaults to the attack-wide setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureInput {
    pub r: String,
    pub s: String,
    pub z: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub kp: Option<String>,
    #[serde(default)]
    pub leak_bits: Option<u32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub nonce: Option<String>,
}

/// One observed signature plus what is known about its nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    pub message_hash: Integer,
    pub r: Integer,
    pub s: Integer,
    pub known_leak_bits: u32,
    /// Value of the leaked bits.
    pub known_nonce_bits: Integer,
    /// The full nonce, only present for synthetic test vectors.
    pub nonce: Option<Integer>,
}

impl SignatureInput {
    pub fn into_record(self, default_leak_bits: u32, order: &Integer) -> Result<SignatureRecord> {
        let r = parse_decimal_strict(&self.r, ScalarKind::RorS, order)?;
        let s = parse_decimal_strict(&self.s, ScalarKind::RorS, order)?;
        let message_hash = parse_decimal_strict(&self.z, ScalarKind::Z, order)?;
        let known_leak_bits = self.leak_bits.unwrap_or(default_leak_bits);

        let known_nonce_bits = match &self.kp {
            Some(kp) => parse_decimal_strict(kp, ScalarKind::Z, order)?,
            None => Integer::new(),
        };
        if known_nonce_bits.significant_bits() > known_leak_bits {
            bail!(
                "kp = {} does not fit in {} leaked bits",
                known_nonce_bits,
                known_leak_bits
            );
        }

        let nonce = match &self.nonce {
            Some(k) => Some(parse_decimal_strict(k, ScalarKind::RorS, order)?),
            None => None,
        };

        Ok(SignatureRecord {
            message_hash,
            r,
            s,
            known_leak_bits,
            known_nonce_bits,
            nonce,
        })
    }
}

impl From<&SignatureRecord> for SignatureInput {
    fn from(record: &SignatureRecord) -> Self {
        SignatureInput {
            r: record.r.to_string(),
            s: record.s.to_string(),
            z: record.message_hash.to_string(),
            kp: Some(record.known_nonce_bits.to_string()),
            leak_bits: Some(record.known_leak_bits),
            nonce: record.nonce.as_ref().map(|k| k.to_string()),
        }
    }
}
