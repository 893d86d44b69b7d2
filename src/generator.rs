//! Synthetic ECDSA signatures with partially leaked nonces
//!
//! Used by tests and the `simulate` command. Each nonce is drawn uniformly
//! from `[1, q)`; the leaked low or high bits are recorded alongside the
//! signature as `known_nonce_bits`.

use crate::curve::{Curve, Secp256k1};
use crate::hnp::Placement;
use crate::math::{mod_inverse, mod_mul, reduce, secp256k1_order};
use crate::signature::SignatureRecord;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::AffinePoint;
use rand::{CryptoRng, RngCore};
use rug::integer::Order;
use rug::Integer;
use sha2::{Digest, Sha256};

pub struct LeakySigner {
    curve: Secp256k1,
    private_key: Integer,
    public_key: AffinePoint,
}

impl LeakySigner {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let order = secp256k1_order();
        loop {
            if let Some(signer) = Self::with_key(uniform_nonzero(rng, &order)) {
                return signer;
            }
        }
    }

    /// `None` unless `private_key` is in `[1, q)`.
    pub fn with_key(private_key: Integer) -> Option<Self> {
        let curve = Secp256k1::new();
        let public_key = curve.mul_generator(&private_key)?;
        Some(Self {
            curve,
            private_key,
            public_key,
        })
    }

    pub fn private_key(&self) -> &Integer {
        &self.private_key
    }

    pub fn public_key(&self) -> &AffinePoint {
        &self.public_key
    }

    pub fn curve(&self) -> &Secp256k1 {
        &self.curve
    }

    /// Signs `n` random messages, leaking `leak_bits` nonce bits at `placement`.
    pub fn sign_batch<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        n: usize,
        placement: Placement,
        leak_bits: u32,
    ) -> Vec<SignatureRecord> {
        let q = self.curve.order();
        let order_bits = q.significant_bits();
        let mut out = Vec::with_capacity(n);

        while out.len() < n {
            let nonce = uniform_nonzero(rng, q);
            let mut message = [0u8; 32];
            rng.fill_bytes(&mut message);
            let digest = Sha256::digest(message);
            let message_hash = reduce(Integer::from_digits(digest.as_slice(), Order::Msf), q);

            let Some(r_point) = self.curve.mul_generator(&nonce) else {
                continue;
            };
            let encoded = r_point.to_encoded_point(false);
            let Some(x) = encoded.x() else {
                continue;
            };
            let r = reduce(Integer::from_digits(x.as_slice(), Order::Msf), q);
            if r.is_zero() {
                continue;
            }

            let Some(nonce_inv) = mod_inverse(&nonce, q) else {
                continue;
            };
            let mut rd = mod_mul(&r, &self.private_key, q);
            rd += &message_hash;
            let s = mod_mul(&nonce_inv, &rd, q);
            if s.is_zero() {
                continue;
            }

            let known_nonce_bits = match placement {
                Placement::Lsb => nonce.clone().keep_bits(leak_bits),
                Placement::Msb => {
                    Integer::from(&nonce >> (order_bits - leak_bits.min(order_bits)))
                }
            };

            out.push(SignatureRecord {
                message_hash,
                r,
                s,
                known_leak_bits: leak_bits,
                known_nonce_bits,
                nonce: Some(nonce),
            });
        }
        out
    }
}

/// Uniform in `[1, q)`.
pub fn uniform_nonzero<R: RngCore + ?Sized>(rng: &mut R, q: &Integer) -> Integer {
    // 64 extra bits keep the modular bias negligible.
    let len = (q.significant_bits() as usize).div_ceil(8) + 8;
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    let bound = Integer::from(q - 1u32);
    reduce(Integer::from_digits(&bytes, Order::Msf), &bound) + 1u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_signatures_verify() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let signer = LeakySigner::random(&mut rng);
        let q = signer.curve().order().clone();
        let sigs = signer.sign_batch(&mut rng, 4, Placement::Lsb, 8);
        assert_eq!(sigs.len(), 4);

        for sig in &sigs {
            // s·k == h + r·d (mod q)
            let k = sig.nonce.clone().unwrap();
            let lhs = mod_mul(&sig.s, &k, &q);
            let mut rhs = mod_mul(&sig.r, signer.private_key(), &q);
            rhs += &sig.message_hash;
            assert_eq!(lhs, reduce(rhs, &q));
        }
    }

    #[test]
    fn test_leaked_bits_match_nonce() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let signer = LeakySigner::random(&mut rng);
        for sig in signer.sign_batch(&mut rng, 3, Placement::Lsb, 12) {
            let k = sig.nonce.unwrap();
            assert_eq!(sig.known_nonce_bits, k.keep_bits(12));
        }
        for sig in signer.sign_batch(&mut rng, 3, Placement::Msb, 12) {
            let k = sig.nonce.unwrap();
            assert_eq!(sig.known_nonce_bits, Integer::from(&k >> 244u32));
            assert!(sig.known_nonce_bits.significant_bits() <= 12);
        }
    }
}
