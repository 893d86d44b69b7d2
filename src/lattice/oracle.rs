//! Reduction oracle contract and the built-in implementation
//!
//! The attack layer only talks to [`ReductionOracle`]; [`NativeReducer`] is the
//! pure-Rust implementation shipped with the crate. Its sieve entry points are
//! enumeration-based stand-ins that honour the same contract as a real sieve:
//! they reduce the basis and surface lifted candidate vectors to an optional
//! [`VectorPredicate`].

use crate::error::ReductionError;
use crate::lattice::bkz::{bkz, BkzParams};
use crate::lattice::enumeration::{self, Block};
use crate::lattice::gso::IntegralGso;
use crate::lattice::lll::{lll, Delta};
use crate::lattice::LatticeBasis;
use log::debug;
use rug::Integer;
use std::time::{Duration, Instant};

/// Outcome of testing one lattice vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Reject,
    /// The vector encodes this private key candidate.
    Accept(Integer),
}

/// Exact test run on every candidate vector a sieve surfaces.
pub trait VectorPredicate {
    fn evaluate(&self, vector: &[Integer]) -> Verdict;
}

/// Tuning of a single sieve call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SieveParams {
    pub block_size: usize,
    pub dim_free_fraction: f64,
    pub extra_dim_free: usize,
}

impl SieveParams {
    /// Dimensions left to enumeration rather than sieving.
    pub fn dims_free(&self) -> usize {
        (self.dim_free_fraction * self.block_size as f64).floor() as usize + self.extra_dim_free
    }
}

pub trait ReductionOracle {
    /// LLL-reduces the basis in place.
    fn lll(&self, basis: &mut LatticeBasis) -> Result<(), ReductionError>;

    /// BKZ-reduces the basis in place.
    fn bkz(&self, basis: &mut LatticeBasis, block_size: usize) -> Result<(), ReductionError>;

    /// Sieves with the given parameters; returns the first key accepted by
    /// `predicate`, if one is given and accepts.
    fn sieve(
        &self,
        basis: &mut LatticeBasis,
        params: &SieveParams,
        predicate: Option<&dyn VectorPredicate>,
    ) -> Result<Option<Integer>, ReductionError>;

    /// Sieves the projected window `[window_start, dim)` for `passes` rounds,
    /// lifting every database vector to the full lattice and handing it to
    /// `predicate`.
    fn sieve_window(
        &self,
        basis: &mut LatticeBasis,
        window_start: usize,
        passes: usize,
        predicate: &dyn VectorPredicate,
    ) -> Result<Option<Integer>, ReductionError>;
}

#[derive(Debug, Clone)]
pub struct ReducerConfig {
    pub delta: Delta,
    pub max_tours: usize,
    /// Enumeration nodes allowed per block.
    pub node_budget: u64,
    /// Wall-clock cap per oracle call.
    pub time_limit: Option<Duration>,
    /// Most vectors kept per sieve pass.
    pub sieve_db_limit: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            delta: Delta::default(),
            max_tours: 8,
            node_budget: 5_000_000,
            time_limit: None,
            sieve_db_limit: 256,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NativeReducer {
    config: ReducerConfig,
}

impl NativeReducer {
    pub fn new(config: ReducerConfig) -> Self {
        Self { config }
    }

    fn deadline(&self) -> Option<Instant> {
        self.config.time_limit.map(|limit| Instant::now() + limit)
    }

    fn bkz_params(&self, block_size: usize) -> BkzParams {
        BkzParams {
            block_size,
            delta: self.config.delta,
            max_tours: self.config.max_tours,
            node_budget: self.config.node_budget,
            deadline: self.deadline(),
        }
    }
}

impl ReductionOracle for NativeReducer {
    fn lll(&self, basis: &mut LatticeBasis) -> Result<(), ReductionError> {
        lll(basis.rows_mut(), self.config.delta).map(|_| ())
    }

    fn bkz(&self, basis: &mut LatticeBasis, block_size: usize) -> Result<(), ReductionError> {
        bkz(basis.rows_mut(), &self.bkz_params(block_size)).map(|_| ())
    }

    fn sieve(
        &self,
        basis: &mut LatticeBasis,
        params: &SieveParams,
        predicate: Option<&dyn VectorPredicate>,
    ) -> Result<Option<Integer>, ReductionError> {
        let block_size = params
            .block_size
            .saturating_sub(params.dims_free())
            .max(2)
            .min(basis.dim());
        debug!(
            "sieve β={} with {} free dimensions: reducing at block size {}",
            params.block_size,
            params.dims_free(),
            block_size
        );
        bkz(basis.rows_mut(), &self.bkz_params(block_size))?;
        Ok(predicate.and_then(|p| scan_rows(basis, p)))
    }

    fn sieve_window(
        &self,
        basis: &mut LatticeBasis,
        window_start: usize,
        passes: usize,
        predicate: &dyn VectorPredicate,
    ) -> Result<Option<Integer>, ReductionError> {
        let dim = basis.dim();
        if window_start >= dim {
            return Err(ReductionError::Failed(format!(
                "window start {window_start} outside a {dim}-dimensional basis"
            )));
        }
        let deadline = self.deadline();
        let gso = lll(basis.rows_mut(), self.config.delta)?;
        if let Some(key) = scan_rows(basis, predicate) {
            return Ok(Some(key));
        }

        let block = Block::from_gso(&gso, window_start, dim);
        let mu = lift_coefficients(&gso, window_start, dim);
        for pass in 0..passes {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(ReductionError::Timeout {
                    block_size: dim - window_start,
                });
            }
            let radius = 1.0 + 0.5 * pass as f64;
            let db = enumeration::collect(
                &block,
                radius,
                self.config.sieve_db_limit,
                self.config.node_budget,
            )?;
            debug!(
                "window [{window_start}, {dim}) pass {pass}: {} vectors below {radius}·‖b*‖²",
                db.len()
            );
            for projected in &db {
                let Some(coeffs) = babai_lift(&mu, window_start, projected) else {
                    debug!("skipping a window vector whose lift leaves the i64 range");
                    continue;
                };
                let vector = basis.combination(&coeffs);
                if let Verdict::Accept(key) = predicate.evaluate(&vector) {
                    return Ok(Some(key));
                }
            }
        }
        Ok(None)
    }
}

/// First key accepted among the rows of `basis`.
pub(crate) fn scan_rows(basis: &LatticeBasis, predicate: &dyn VectorPredicate) -> Option<Integer> {
    basis.rows().iter().find_map(|row| match predicate.evaluate(row) {
        Verdict::Accept(key) => Some(key),
        Verdict::Reject => None,
    })
}

/// `mu[j][i]` for `j < dim`, `i < start`: the part of the GSO needed to lift
/// a projected vector back over the rows in front of the window.
fn lift_coefficients(gso: &IntegralGso, start: usize, dim: usize) -> Vec<Vec<f64>> {
    (0..dim)
        .map(|j| (0..start.min(j)).map(|i| gso.mu(j, i)).collect())
        .collect()
}

/// Extends window coefficients by size-reducing against rows `0..start`, so
/// the lifted vector is short in the full lattice rather than only in
/// projection. The result is an exact integer combination, or `None` when a
/// coefficient is not finite or does not fit in an `i64`.
fn babai_lift(mu: &[Vec<f64>], start: usize, projected: &[i64]) -> Option<Vec<Integer>> {
    let dim = mu.len();
    let mut x = vec![0f64; dim];
    for (slot, &c) in x[start..].iter_mut().zip(projected) {
        *slot = c as f64;
    }
    for i in (0..start).rev() {
        let c: f64 = (i + 1..dim).map(|j| x[j] * mu[j][i]).sum();
        x[i] = -c.round();
    }
    x.into_iter().map(exact_coefficient).collect()
}

// 2^63 is exactly representable, so the half-open range is exactly i64.
fn exact_coefficient(v: f64) -> Option<Integer> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if v.is_finite() && (-LIMIT..LIMIT).contains(&v) {
        Some(Integer::from(v as i64))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Target(Vec<Integer>);

    impl VectorPredicate for Target {
        fn evaluate(&self, vector: &[Integer]) -> Verdict {
            let neg: Vec<Integer> = vector.iter().map(|x| Integer::from(-x)).collect();
            if vector == self.0.as_slice() || neg == self.0 {
                Verdict::Accept(Integer::from(1))
            } else {
                Verdict::Reject
            }
        }
    }

    fn basis(rows: &[&[i64]]) -> LatticeBasis {
        LatticeBasis::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|&x| Integer::from(x)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_dims_free() {
        let p = SieveParams {
            block_size: 60,
            dim_free_fraction: 0.3,
            extra_dim_free: 2,
        };
        assert_eq!(p.dims_free(), 20);
    }

    #[test]
    fn test_sieve_surfaces_short_vector() {
        let mut b = basis(&[&[1009, 0], &[673, 1]]);
        let target = Target(vec![Integer::from(1), Integer::from(3)]);
        let params = SieveParams {
            block_size: 2,
            dim_free_fraction: 0.0,
            extra_dim_free: 0,
        };
        let found = NativeReducer::default().sieve(&mut b, &params, Some(&target)).unwrap();
        assert_eq!(found, Some(Integer::from(1)));
    }

    #[test]
    fn test_sieve_window_lifts_candidates() {
        // Even-sum lattice; the basis is already LLL-reduced and does not
        // contain ±(0, 1, −1), which only the lifted window search reaches.
        let mut b = basis(&[&[1, 1, 0], &[0, 1, 1], &[1, 0, 1]]);
        let target = Target(vec![Integer::from(0), Integer::from(1), Integer::from(-1)]);
        let oracle = NativeReducer::default();
        let found = oracle.sieve_window(&mut b, 1, 4, &target).unwrap();
        assert_eq!(found, Some(Integer::from(1)));
    }

    #[test]
    fn test_babai_lift_size_reduces_front_rows() {
        // Row 1 projects with mu = 0.5 on row 0; lifting (·, 3) subtracts 2·row 0.
        let mu = vec![vec![], vec![0.5]];
        let lifted = babai_lift(&mu, 1, &[3]).unwrap();
        assert_eq!(lifted, vec![Integer::from(-2), Integer::from(3)]);
    }

    #[test]
    fn test_babai_lift_skips_unrepresentable_coefficients() {
        assert_eq!(babai_lift(&[vec![], vec![f64::NAN]], 1, &[1]), None);
        assert_eq!(babai_lift(&[vec![], vec![f64::INFINITY]], 1, &[1]), None);
        assert_eq!(babai_lift(&[vec![], vec![1e30]], 1, &[1]), None);
        assert_eq!(exact_coefficient(-9_223_372_036_854_775_808.0), Some(Integer::from(i64::MIN)));
        assert_eq!(exact_coefficient(9_223_372_036_854_775_808.0), None);
    }

    #[test]
    fn test_sieve_window_rejects_bad_window() {
        let mut b = basis(&[&[1, 0], &[0, 1]]);
        let target = Target(vec![]);
        assert!(matches!(
            NativeReducer::default().sieve_window(&mut b, 2, 1, &target),
            Err(ReductionError::Failed(_))
        ));
    }
}
