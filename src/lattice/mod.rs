//! Integer lattice bases and the built-in reduction oracle

use rug::Integer;
use std::ops::{Index, IndexMut};

pub(crate) mod bkz;
pub(crate) mod enumeration;
pub(crate) mod gso;
pub(crate) mod lll;
pub mod oracle;

pub use oracle::{NativeReducer, ReducerConfig, ReductionOracle, SieveParams};

/// Square integer basis, one lattice vector per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatticeBasis {
    rows: Vec<Vec<Integer>>,
}

impl LatticeBasis {
    pub fn zero(dim: usize) -> Self {
        Self {
            rows: vec![vec![Integer::new(); dim]; dim],
        }
    }

    pub fn from_rows(rows: Vec<Vec<Integer>>) -> Self {
        Self { rows }
    }

    pub fn dim(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Integer>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &[Integer] {
        &self.rows[i]
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Integer>> {
        &mut self.rows
    }

    /// Exact `Σ coeffs[i] · row[i]`.
    pub fn combination(&self, coeffs: &[Integer]) -> Vec<Integer> {
        let width = self.rows.first().map_or(0, Vec::len);
        let mut out = vec![Integer::new(); width];
        for (c, row) in coeffs.iter().zip(&self.rows) {
            if c.is_zero() {
                continue;
            }
            for (acc, x) in out.iter_mut().zip(row) {
                *acc += c * x;
            }
        }
        out
    }
}

impl Index<(usize, usize)> for LatticeBasis {
    type Output = Integer;

    fn index(&self, (i, j): (usize, usize)) -> &Integer {
        &self.rows[i][j]
    }
}

impl IndexMut<(usize, usize)> for LatticeBasis {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Integer {
        &mut self.rows[i][j]
    }
}

pub(crate) fn dot(a: &[Integer], b: &[Integer]) -> Integer {
    a.iter().zip(b).fold(Integer::new(), |mut acc, (x, y)| {
        acc += x * y;
        acc
    })
}

/// `rows[k] -= q · rows[l]`.
pub(crate) fn sub_mul_row(rows: &mut [Vec<Integer>], k: usize, l: usize, q: &Integer) {
    if q.is_zero() {
        return;
    }
    let row_l = rows[l].clone();
    for (x, y) in rows[k].iter_mut().zip(&row_l) {
        *x -= q * y;
    }
}
