//! Exact Gram-Schmidt data in integral form
//!
//! For a basis `b_0..b_{n-1}`, `d[i]` is the Gram determinant of the first
//! `i` rows (`d[0] = 1`) and `lambda[i][j] = d[j+1]·μ_ij` for `j < i`. Both
//! are integers, so the whole orthogonalisation stays exact (Cohen, Alg. 2.6.7).

use crate::error::ReductionError;
use crate::lattice::dot;
use rug::{Integer, Rational};

#[derive(Debug, Clone)]
pub(crate) struct IntegralGso {
    pub(crate) d: Vec<Integer>,
    pub(crate) lambda: Vec<Vec<Integer>>,
}

impl IntegralGso {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            d: vec![Integer::from(1); n + 1],
            lambda: vec![vec![Integer::new(); n]; n],
        }
    }

    pub(crate) fn compute(rows: &[Vec<Integer>]) -> Result<Self, ReductionError> {
        let mut gso = Self::new(rows.len());
        for k in 0..rows.len() {
            gso.compute_row(rows, k)?;
        }
        Ok(gso)
    }

    /// Fills `lambda[k][..k]` and `d[k+1]`; rows `0..k` must already be done.
    pub(crate) fn compute_row(
        &mut self,
        rows: &[Vec<Integer>],
        k: usize,
    ) -> Result<(), ReductionError> {
        for j in 0..=k {
            let mut u = dot(&rows[k], &rows[j]);
            for m in 0..j {
                let mut t = Integer::from(&self.d[m + 1] * &u);
                t -= &self.lambda[k][m] * &self.lambda[j][m];
                t /= &self.d[m];
                u = t;
            }
            if j < k {
                self.lambda[k][j] = u;
            } else {
                if u.is_zero() {
                    return Err(ReductionError::Failed(format!(
                        "basis rows are linearly dependent at row {k}"
                    )));
                }
                self.d[k + 1] = u;
            }
        }
        Ok(())
    }

    /// `μ_ij` as a float.
    pub(crate) fn mu(&self, i: usize, j: usize) -> f64 {
        Rational::from((self.lambda[i][j].clone(), self.d[j + 1].clone())).to_f64()
    }

    /// `‖b*_i‖² / ‖b*_base‖²` as a float.
    pub(crate) fn norm_ratio(&self, i: usize, base: usize) -> f64 {
        let num = Integer::from(&self.d[i + 1] * &self.d[base]);
        let den = Integer::from(&self.d[i] * &self.d[base + 1]);
        Rational::from((num, den)).to_f64()
    }
}
