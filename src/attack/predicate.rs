//! Solution-vector predicate for the compressed lattice
//!
//! A vector `v` of the `(n+1)`-dimensional lattice is a solution when its last
//! coordinate is `±τ` and the remaining coordinates are centered nonce errors
//! `±(e_i − ω)`. Sample 0 was eliminated when the basis was built, so its
//! error sits in `v[n−1]` and fixes a single key candidate; every other sample
//! must then agree with that candidate.
//!
//! Everything here is exact integer arithmetic and stops at the first sample
//! that disagrees.

use crate::attack::candidate::CandidateExtractor;
use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::hnp::HnpInstance;
use crate::lattice::oracle::{VectorPredicate, Verdict};
use crate::math::{mod_inverse, mod_mul, reduce};
use log::debug;
use rug::Integer;

pub struct PredicateFilter<'a> {
    instance: &'a HnpInstance,
    t0_inv: Integer,
    /// Largest admissible `|e_i − ω|`.
    bound: Integer,
}

impl<'a> PredicateFilter<'a> {
    pub fn new(instance: &'a HnpInstance) -> Result<Self> {
        let first = instance.samples.first().ok_or_else(|| {
            Error::InternalInconsistency("predicate built for an empty instance".into())
        })?;
        let t0_inv = mod_inverse(&first.t, &instance.order).ok_or(Error::DegenerateSample)?;
        // With LSB leakage e_i can reach ⌊q/2^ℓ⌋, one past 2ω.
        let bound = Integer::from(&instance.omega + 1u32);
        Ok(Self {
            instance,
            t0_inv,
            bound,
        })
    }

    pub fn evaluate(&self, v: &[Integer]) -> Verdict {
        let inst = self.instance;
        let n = inst.samples.len();
        if v.len() != n + 1 {
            return Verdict::Reject;
        }
        let q = &inst.order;
        let omega = &inst.omega;

        let negative = if v[n] == -Integer::from(&inst.tau) {
            true
        } else if v[n] == inst.tau {
            false
        } else {
            return Verdict::Reject;
        };

        // e_0 = v[n−1] + ω on the −τ branch, ω − v[n−1] on the +τ branch.
        let mut e0 = Integer::from(&v[n - 1] + omega);
        if !negative {
            e0 = Integer::from(omega - &v[n - 1]);
        }
        let alpha = mod_mul(
            &self.t0_inv,
            &reduce(Integer::from(&inst.samples[0].a + &e0), q),
            q,
        );

        for (i, sample) in inst.samples.iter().enumerate().skip(1) {
            let coord = &v[i - 1];
            if Integer::from(coord.abs_ref()) > self.bound {
                return Verdict::Reject;
            }
            let e = if negative {
                Integer::from(coord + omega)
            } else {
                Integer::from(omega - coord)
            };
            let lhs = reduce(Integer::from(&sample.a + &e), q);
            if lhs != mod_mul(&sample.t, &alpha, q) {
                return Verdict::Reject;
            }
        }
        Verdict::Accept(alpha)
    }
}

impl VectorPredicate for PredicateFilter<'_> {
    fn evaluate(&self, vector: &[Integer]) -> Verdict {
        PredicateFilter::evaluate(self, vector)
    }
}

/// Predicate acceptances confirmed by the key check.
///
/// With too little leakage the lattice can hold short vectors that satisfy
/// the predicate for a wrong key; those are rejected here.
pub struct VerifiedPredicate<'p, 'a, C: Curve> {
    filter: &'p PredicateFilter<'p>,
    extractor: &'p CandidateExtractor<'a, C>,
}

impl<'p, 'a, C: Curve> VerifiedPredicate<'p, 'a, C> {
    pub fn new(filter: &'p PredicateFilter<'p>, extractor: &'p CandidateExtractor<'a, C>) -> Self {
        Self { filter, extractor }
    }
}

impl<C: Curve> VectorPredicate for VerifiedPredicate<'_, '_, C> {
    fn evaluate(&self, vector: &[Integer]) -> Verdict {
        match self.filter.evaluate(vector) {
            Verdict::Accept(alpha) if self.extractor.verify(&alpha) => Verdict::Accept(alpha),
            Verdict::Accept(alpha) => {
                debug!("predicate accepted {alpha}, key check disagrees");
                Verdict::Reject
            }
            Verdict::Reject => Verdict::Reject,
        }
    }
}
