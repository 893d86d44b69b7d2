//! Reading private key candidates back out of a reduced plain basis
//!
//! After reduction some row is expected to carry `±α` in the key column.
//! That is an empirical property of the construction, not a guarantee, so
//! every row is tried and every candidate is verified before it is trusted.

use crate::curve::Curve;
use crate::lattice::oracle::{VectorPredicate, Verdict};
use crate::math::reduce;
use log::warn;
use rug::Integer;

/// How a candidate key is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCheck<P> {
    /// Compare against a known private key (test harness).
    Known(Integer),
    /// Compare `c·G` against the target public key.
    PublicKey(P),
}

pub struct CandidateExtractor<'a, C: Curve> {
    curve: &'a C,
    check: &'a KeyCheck<C::Point>,
}

impl<'a, C: Curve> CandidateExtractor<'a, C> {
    pub fn new(curve: &'a C, check: &'a KeyCheck<C::Point>) -> Self {
        Self { curve, check }
    }

    pub fn verify(&self, candidate: &Integer) -> bool {
        match self.check {
            KeyCheck::Known(key) => candidate == key,
            KeyCheck::PublicKey(target) => {
                let Some(point) = self.curve.mul_generator(candidate) else {
                    return false;
                };
                if point == *target {
                    return true;
                }
                if self.curve.same_x(&point, target) {
                    warn!("candidate {candidate} matches the public key x-coordinate only");
                }
                false
            }
        }
    }

    /// `(c, q − c)` for the key column of `vector`, or nothing when it is
    /// zero modulo `q`.
    pub fn candidates(&self, vector: &[Integer], column: usize) -> Option<[Integer; 2]> {
        let q = self.curve.order();
        let c = reduce(vector.get(column)?.clone(), q);
        if c.is_zero() {
            return None;
        }
        let neg = Integer::from(q - &c);
        Some([c, neg])
    }

    /// First verified candidate from the key column of `vector`.
    pub fn check_vector(&self, vector: &[Integer], column: usize) -> Option<Integer> {
        self.candidates(vector, column)?
            .into_iter()
            .find(|c| self.verify(c))
    }

    /// Adapts the column check to the oracle's predicate interface.
    pub fn at_column(&self, column: usize) -> KeyColumn<'_, 'a, C> {
        KeyColumn {
            extractor: self,
            column,
        }
    }
}

/// Column read-back as a [`VectorPredicate`], so a sieve can stop as soon as
/// a row exposes the key.
pub struct KeyColumn<'e, 'a, C: Curve> {
    extractor: &'e CandidateExtractor<'a, C>,
    column: usize,
}

impl<C: Curve> VectorPredicate for KeyColumn<'_, '_, C> {
    fn evaluate(&self, vector: &[Integer]) -> Verdict {
        match self.extractor.check_vector(vector, self.column) {
            Some(key) => Verdict::Accept(key),
            None => Verdict::Reject,
        }
    }
}
