//! Curve collaborator: group order and generator multiples

use crate::math::{integer_to_scalar, secp256k1_order};
use anyhow::{anyhow, Result};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, ProjectivePoint, PublicKey};
use rug::Integer;
use std::fmt::Debug;

/// The only curve operations the attack needs.
pub trait Curve {
    type Point: Clone + PartialEq + Debug;

    fn order(&self) -> &Integer;

    /// `k·G`, or `None` when `k` is not a valid non-zero scalar.
    fn mul_generator(&self, k: &Integer) -> Option<Self::Point>;

    fn same_x(&self, p: &Self::Point, q: &Self::Point) -> bool;
}

#[derive(Debug, Clone)]
pub struct Secp256k1 {
    order: Integer,
}

impl Secp256k1 {
    pub fn new() -> Self {
        Self {
            order: secp256k1_order(),
        }
    }

    /// Parses a SEC1 public key, compressed or uncompressed, from hex.
    pub fn parse_point(&self, hex_str: &str) -> Result<AffinePoint> {
        let trimmed = hex_str.trim();
        let without_prefix = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(without_prefix)?;
        let key = PublicKey::from_sec1_bytes(&bytes)
            .map_err(|_| anyhow!("Invalid public key: not a point on secp256k1"))?;
        Ok(*key.as_affine())
    }

    pub fn encode_point(&self, point: &AffinePoint) -> String {
        hex::encode(point.to_encoded_point(true).as_bytes())
    }
}

impl Default for Secp256k1 {
    fn default() -> Self {
        Self::new()
    }
}

impl Curve for Secp256k1 {
    type Point = AffinePoint;

    fn order(&self) -> &Integer {
        &self.order
    }

    fn mul_generator(&self, k: &Integer) -> Option<AffinePoint> {
        let scalar = integer_to_scalar(k)?;
        if bool::from(scalar.is_zero()) {
            return None;
        }
        let point: AffinePoint = (ProjectivePoint::GENERATOR * scalar).into();
        Some(point)
    }

    fn same_x(&self, p: &AffinePoint, q: &AffinePoint) -> bool {
        p.to_encoded_point(false).x() == q.to_encoded_point(false).x()
    }
}
