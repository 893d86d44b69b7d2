//! Exact modular arithmetic over arbitrary-precision integers

use anyhow::{anyhow, bail, Result};
use k256::elliptic_curve::ff::PrimeField;
use k256::Scalar;
use rug::integer::Order;
use rug::Integer;

/// secp256k1 group order n in hexadecimal.
pub const SECP256K1_ORDER_HEX: &str =
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141";

pub enum ScalarKind {
    RorS,
    Z,
}

pub fn secp256k1_order() -> Integer {
    Integer::from_str_radix(SECP256K1_ORDER_HEX, 16).unwrap_or_default()
}

pub fn parse_decimal_strict(s: &str, kind: ScalarKind, modulus: &Integer) -> Result<Integer> {
    if s.is_empty() {
        bail!("Empty decimal string");
    }
    if !s.chars().all(|c| c.is_ascii_digit()) {
        bail!("Invalid decimal string: only digits 0-9 allowed");
    }
    if s.len() > 1 && s.starts_with('0') {
        bail!("Invalid decimal string: no leading zeros allowed");
    }

    let value =
        Integer::from_str_radix(s, 10).map_err(|e| anyhow!("Failed to parse decimal: {}", e))?;

    if value >= *modulus {
        bail!("Value >= curve order, ensure your data is already reduced");
    }

    if let ScalarKind::RorS = kind {
        if value.is_zero() {
            bail!("r and s values cannot be zero");
        }
    }

    Ok(value)
}

/// Reduces `x` into `[0, q)`.
pub fn reduce(x: Integer, q: &Integer) -> Integer {
    let mut r = x % q;
    if r < 0 {
        r += q;
    }
    r
}

pub fn mod_mul(a: &Integer, b: &Integer, q: &Integer) -> Integer {
    reduce(Integer::from(a * b), q)
}

pub fn mod_inverse(a: &Integer, q: &Integer) -> Option<Integer> {
    let a = reduce(a.clone(), q);
    if a.is_zero() {
        return None;
    }
    a.invert(q).ok()
}

/// Maps a residue in `[0, q)` to its representative in `(-q/2, q/2]`.
pub fn centered(x: Integer, q: &Integer) -> Integer {
    let x = reduce(x, q);
    let half = Integer::from(q >> 1);
    if x > half {
        x - q
    } else {
        x
    }
}

pub fn pow2(bits: u32) -> Integer {
    Integer::from(1) << bits
}

/// `floor(num / den / sqrt(3))`, computed without floating point.
pub fn floor_over_sqrt3(num: &Integer, den: &Integer) -> Integer {
    let numerator = Integer::from(num.square_ref());
    let denominator = Integer::from(den.square_ref()) * 3u32;
    (numerator / denominator).sqrt()
}

pub fn scalar_to_integer(scalar: &Scalar) -> Integer {
    Integer::from_digits(scalar.to_bytes().as_slice(), Order::Msf)
}

/// Converts a residue to a secp256k1 scalar. `None` if it is out of range.
pub fn integer_to_scalar(value: &Integer) -> Option<Scalar> {
    if *value < 0 {
        return None;
    }
    let bytes = value.to_digits::<u8>(Order::Msf);
    if bytes.len() > 32 {
        return None;
    }
    let mut padded = [0u8; 32];
    let offset = 32 - bytes.len();
    padded[offset..].copy_from_slice(&bytes);
    Option::<Scalar>::from(Scalar::from_repr(padded.into()))
}

pub fn integer_to_hex_32(value: &Integer) -> String {
    let bytes = value.to_digits::<u8>(Order::Msf);
    let mut padded = vec![0u8; 32usize.saturating_sub(bytes.len())];
    padded.extend_from_slice(&bytes);
    hex::encode(padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_strict_valid() {
        let n = secp256k1_order();
        let v = parse_decimal_strict(
            "6819641642398093696120236467967538361543858578256722584730163952555838220871",
            ScalarKind::RorS,
            &n,
        )
        .unwrap();
        assert!(!v.is_zero());
    }

    #[test]
    fn test_parse_decimal_strict_rejects_zero_for_r_s() {
        let n = secp256k1_order();
        assert!(parse_decimal_strict("0", ScalarKind::RorS, &n).is_err());
        assert!(parse_decimal_strict("0", ScalarKind::Z, &n).is_ok());
    }

    #[test]
    fn test_parse_rejects_value_ge_order() {
        let n = secp256k1_order();
        let result = parse_decimal_strict(&n.to_string(), ScalarKind::Z, &n);
        assert!(result.unwrap_err().to_string().contains("curve order"));
    }

    #[test]
    fn test_parse_rejects_leading_zero_and_sign() {
        let n = secp256k1_order();
        assert!(parse_decimal_strict("012", ScalarKind::Z, &n).is_err());
        assert!(parse_decimal_strict("-12", ScalarKind::Z, &n).is_err());
    }

    #[test]
    fn test_reduce_negative() {
        let q = Integer::from(97);
        assert_eq!(reduce(Integer::from(-1), &q), 96);
        assert_eq!(reduce(Integer::from(-194), &q), 0);
        assert_eq!(reduce(Integer::from(100), &q), 3);
    }

    #[test]
    fn test_mod_inverse() {
        let n = secp256k1_order();
        let a = Integer::from(12345);
        let inv = mod_inverse(&a, &n).unwrap();
        assert_eq!(mod_mul(&a, &inv, &n), 1);
        assert!(mod_inverse(&Integer::new(), &n).is_none());
        assert!(mod_inverse(&n, &n).is_none());
    }

    #[test]
    fn test_centered() {
        let q = Integer::from(11);
        assert_eq!(centered(Integer::from(5), &q), 5);
        assert_eq!(centered(Integer::from(6), &q), -5);
        assert_eq!(centered(Integer::from(-1), &q), -1);
    }

    #[test]
    fn test_floor_over_sqrt3() {
        // 100 / sqrt(3) = 57.73...
        assert_eq!(floor_over_sqrt3(&Integer::from(100), &Integer::from(1)), 57);
        // 1000 / 4 / sqrt(3) = 144.33...
        assert_eq!(floor_over_sqrt3(&Integer::from(1000), &Integer::from(4)), 144);
    }

    #[test]
    fn test_scalar_roundtrip() {
        let original = Scalar::from(123456789u64);
        let big = scalar_to_integer(&original);
        assert_eq!(big, 123456789);
        assert_eq!(integer_to_scalar(&big).unwrap(), original);
        assert!(integer_to_scalar(&secp256k1_order()).is_none());
    }

    #[test]
    fn test_hex_is_padded() {
        let hex = integer_to_hex_32(&Integer::from(255));
        assert_eq!(hex.len(), 64);
        assert!(hex.ends_with("ff"));
    }
}
