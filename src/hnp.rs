//! Hidden Number Problem instances and their lattice encodings
//!
//! A batch of ECDSA signatures whose nonces leak `ℓ` bits becomes a set of
//! samples `(a_i, t_i)` with `t_i·α − a_i ≡ e_i (mod q)` for a small error
//! `0 ≤ e_i < 2^(N−ℓ)`. Two lattice layouts encode that problem:
//!
//! - `Plain`, `(n+2)`-dimensional: after reduction some row carries `±α` in
//!   column `n`, read back directly by the candidate scan.
//! - `Compressed`, `(n+1)`-dimensional: sample 0 is eliminated, so the key can
//!   no longer be read from a coordinate and solution vectors are recognised by
//!   the predicate filter instead.
//!
//! Reference: Howgrave-Graham & Smart (2001), Albrecht & Heninger (2021)

use crate::error::{Error, Result};
use crate::lattice::LatticeBasis;
use crate::math::{floor_over_sqrt3, mod_inverse, mod_mul, pow2, reduce};
use crate::signature::SignatureRecord;
use rug::Integer;
use std::fmt;
use std::str::FromStr;

/// Which end of the nonce is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `kp = k mod 2^ℓ`.
    Lsb,
    /// `kp = k >> (N − ℓ)`, `N` the bit length of the group order.
    Msb,
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lsb" => Ok(Placement::Lsb),
            "msb" => Ok(Placement::Msb),
            _ => Err(Error::Configuration(format!(
                "unknown leakage placement: {s} (expected lsb or msb)"
            ))),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Lsb => f.write_str("lsb"),
            Placement::Msb => f.write_str("msb"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Plain,
    Compressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leakage {
    pub placement: Placement,
    pub bits: u32,
}

impl Leakage {
    pub fn new(placement: Placement, bits: u32) -> Self {
        Self { placement, bits }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HnpSample {
    pub a: Integer,
    pub t: Integer,
}

/// Samples plus the constants every consumer of the instance needs.
#[derive(Debug, Clone)]
pub struct HnpInstance {
    pub order: Integer,
    pub leakage: Leakage,
    pub samples: Vec<HnpSample>,
    /// Half the error range; errors are centered by subtracting it.
    pub omega: Integer,
    /// Expected magnitude of a centered error, `ω/√3`.
    pub tau: Integer,
}

/// An HNP instance together with the lattice basis encoding it.
///
/// The basis is rebuilt, never patched, when the leakage or sample set
/// changes.
#[derive(Debug, Clone)]
pub struct HnpModel {
    instance: HnpInstance,
    layout: Layout,
    basis: LatticeBasis,
}

impl HnpModel {
    pub fn build(
        signatures: &[SignatureRecord],
        order: &Integer,
        leakage: Leakage,
        layout: Layout,
    ) -> Result<Self> {
        validate(signatures, order, leakage)?;

        let n = signatures.len();
        let (omega, tau) = error_bounds(order, leakage);
        let mut samples = Vec::with_capacity(n);
        let mut plain = match layout {
            Layout::Plain => Some(LatticeBasis::zero(n + 2)),
            Layout::Compressed => None,
        };

        let kbi = pow2(leakage.bits);
        let two_kbi = Integer::from(&kbi * 2u32);
        let kbi_inv = mod_inverse(&kbi, order)
            .ok_or_else(|| Error::Configuration("2^ℓ is not invertible modulo q".into()))?;
        let msb_shift = pow2(order.significant_bits() - leakage.bits);

        for (i, sig) in signatures.iter().enumerate() {
            let s_inv = mod_inverse(&sig.s, order).ok_or(Error::InvalidSignature { index: i })?;
            let r_s_inv = mod_mul(&sig.r, &s_inv, order);
            let h_s_inv = mod_mul(&sig.message_hash, &s_inv, order);
            let kp = &sig.known_nonce_bits;

            let sample = match leakage.placement {
                Placement::Lsb => HnpSample {
                    t: mod_mul(&r_s_inv, &kbi_inv, order),
                    a: mod_mul(&reduce(Integer::from(kp - &h_s_inv), order), &kbi_inv, order),
                },
                Placement::Msb => HnpSample {
                    t: r_s_inv.clone(),
                    a: reduce(Integer::from(kp * &msb_shift) - &h_s_inv, order),
                },
            };
            samples.push(sample);

            if let Some(basis) = plain.as_mut() {
                basis[(i, i)] = Integer::from(&two_kbi * order);
                match leakage.placement {
                    Placement::Lsb => {
                        let t = mod_mul(&kbi_inv, &r_s_inv, order);
                        basis[(n, i)] = Integer::from(&two_kbi * &t);

                        let kp_minus = reduce(Integer::from(kp - &h_s_inv), order);
                        let u = mod_mul(&kbi_inv, &kp_minus, order);
                        basis[(n + 1, i)] = Integer::from(&two_kbi * &u) + order;
                    }
                    Placement::Msb => {
                        basis[(n, i)] = Integer::from(&two_kbi * &r_s_inv);

                        // h·s⁻¹ is deliberately left unreduced here.
                        let z_times_sinv = Integer::from(&sig.message_hash * &s_inv);
                        let diff = Integer::from(kp * &msb_shift) - z_times_sinv;
                        basis[(n + 1, i)] = Integer::from(&two_kbi * &diff) + order;
                    }
                }
            }
        }

        if samples.len() != n {
            return Err(Error::InternalInconsistency(format!(
                "{} samples for {} signatures",
                samples.len(),
                n
            )));
        }

        let instance = HnpInstance {
            order: order.clone(),
            leakage,
            samples,
            omega,
            tau,
        };

        let basis = match plain {
            Some(mut basis) => {
                basis[(n, n)] = Integer::from(1);
                basis[(n + 1, n + 1)] = order.clone();
                basis
            }
            None => compressed_basis(&instance)?,
        };

        Ok(Self {
            instance,
            layout,
            basis,
        })
    }

    pub fn instance(&self) -> &HnpInstance {
        &self.instance
    }

    pub fn samples(&self) -> &[HnpSample] {
        &self.instance.samples
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn basis(&self) -> &LatticeBasis {
        &self.basis
    }

    /// Mutable basis alongside a shared view of the samples, so the oracle
    /// can reduce while a predicate reads the instance.
    pub fn split_mut(&mut self) -> (&mut LatticeBasis, &HnpInstance) {
        (&mut self.basis, &self.instance)
    }

    /// Column holding `±α` after reduction; only the plain layout has one.
    pub fn key_column(&self) -> Option<usize> {
        match self.layout {
            Layout::Plain => Some(self.basis.dim() - 2),
            Layout::Compressed => None,
        }
    }
}

fn validate(signatures: &[SignatureRecord], order: &Integer, leakage: Leakage) -> Result<()> {
    if signatures.is_empty() {
        return Err(Error::Configuration("at least one signature is required".into()));
    }
    if *order < 2 {
        return Err(Error::Configuration("group order must exceed 1".into()));
    }
    let order_bits = order.significant_bits();
    if leakage.bits >= order_bits {
        return Err(Error::Configuration(format!(
            "{} leaked bits leave nothing to recover from a {}-bit order",
            leakage.bits, order_bits
        )));
    }
    for (i, sig) in signatures.iter().enumerate() {
        if sig.known_leak_bits != leakage.bits {
            return Err(Error::Configuration(format!(
                "signature {} leaks {} bits, model expects {}",
                i, sig.known_leak_bits, leakage.bits
            )));
        }
        if sig.known_nonce_bits < 0 || sig.known_nonce_bits.significant_bits() > leakage.bits {
            return Err(Error::Configuration(format!(
                "signature {i}: known nonce bits do not fit in {} bits",
                leakage.bits
            )));
        }
    }
    Ok(())
}

/// `(ω, τ)` for the placement: `ω` is half the error range, `τ = ω/√3`.
pub fn error_bounds(order: &Integer, leakage: Leakage) -> (Integer, Integer) {
    match leakage.placement {
        Placement::Lsb => {
            let omega = Integer::from(order >> (leakage.bits + 1));
            let tau = floor_over_sqrt3(order, &pow2(leakage.bits + 1));
            (omega, tau)
        }
        Placement::Msb => {
            let omega = pow2(order.significant_bits() - leakage.bits - 1);
            let tau = floor_over_sqrt3(&omega, &Integer::from(1));
            (omega, tau)
        }
    }
}

// Layout, with n samples and dimension n+1:
//   rows 0..n-1   q·e_{i-1}                       (one per eliminated relation)
//   row  n-1      (t'_1, …, t'_{n-1}, 1, 0)
//   row  n        (a'_1, …, a'_{n-1}, 0, τ)
// where t'_i = t_i·t_0⁻¹ and a'_i = a_i − t'_i·a_0 + ω·(1 − t'_i).
// The solution vector is (e_1−ω, …, e_{n-1}−ω, e_0−ω, −τ).
fn compressed_basis(instance: &HnpInstance) -> Result<LatticeBasis> {
    let q = &instance.order;
    let samples = &instance.samples;
    let n = samples.len();
    let first = &samples[0];
    let t0_inv = mod_inverse(&first.t, q).ok_or(Error::DegenerateSample)?;

    let mut basis = LatticeBasis::zero(n + 1);
    for (i, sample) in samples.iter().enumerate().skip(1) {
        let col = i - 1;
        let t_prime = mod_mul(&sample.t, &t0_inv, q);

        let mut a_prime = Integer::from(&sample.a - &mod_mul(&t_prime, &first.a, q));
        a_prime += &instance.omega;
        a_prime -= &instance.omega * &t_prime;

        basis[(col, col)] = q.clone();
        basis[(n - 1, col)] = t_prime;
        basis[(n, col)] = reduce(a_prime, q);
    }
    basis[(n - 1, n - 1)] = Integer::from(1);
    basis[(n, n)] = instance.tau.clone();
    Ok(basis)
}
