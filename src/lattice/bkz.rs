//! Block Korkine-Zolotarev reduction
//!
//! Each tour slides a window of `block_size` rows down the basis, enumerates
//! the shortest vector of the projected block and, when it beats the current
//! first row of the block, inserts it and re-runs LLL.

use crate::error::ReductionError;
use crate::lattice::enumeration::{self, Block};
use crate::lattice::gso::IntegralGso;
use crate::lattice::lll::{lll, Delta};
use crate::lattice::sub_mul_row;
use log::trace;
use rug::Integer;
use std::time::Instant;

/// Relative improvement required before a block vector is inserted.
const INSERT_THRESHOLD: f64 = 0.99;

pub(crate) struct BkzParams {
    pub(crate) block_size: usize,
    pub(crate) delta: Delta,
    pub(crate) max_tours: usize,
    pub(crate) node_budget: u64,
    pub(crate) deadline: Option<Instant>,
}

pub(crate) fn bkz(
    rows: &mut [Vec<Integer>],
    params: &BkzParams,
) -> Result<IntegralGso, ReductionError> {
    let mut gso = lll(rows, params.delta)?;
    let n = rows.len();
    if params.block_size < 2 || n < 2 {
        return Ok(gso);
    }

    for tour in 0..params.max_tours {
        let mut inserted = 0usize;
        for start in 0..n - 1 {
            if params.deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(ReductionError::Timeout {
                    block_size: params.block_size,
                });
            }
            let end = (start + params.block_size).min(n);
            let block = Block::from_gso(&gso, start, end);
            if let Some(coeffs) = enumeration::shortest(&block, INSERT_THRESHOLD, params.node_budget)? {
                insert(rows, start, &coeffs);
                gso = lll(rows, params.delta)?;
                inserted += 1;
            }
        }
        trace!("bkz-{} tour {}: {} insertions", params.block_size, tour, inserted);
        if inserted == 0 {
            break;
        }
    }
    Ok(gso)
}

/// Replaces the block starting at `start` by a unimodular transform of
/// itself whose first row is `Σ coeffs[j]·rows[start + j]`.
///
/// A gcd-style elimination on the coefficients folds the combination into a
/// single row, which is then rotated to the front of the block.
pub(crate) fn insert(rows: &mut [Vec<Integer>], start: usize, coeffs: &[i64]) {
    let mut x = coeffs.to_vec();
    let pivot = loop {
        let mut nonzero = x.iter().enumerate().filter(|&(_, &v)| v != 0);
        let Some((first, _)) = nonzero.next() else {
            return;
        };
        if nonzero.next().is_none() {
            break first;
        }
        let p = x
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0)
            .min_by_key(|&(_, &v)| v.unsigned_abs())
            .map_or(first, |(j, _)| j);
        for j in 0..x.len() {
            if j == p || x[j] == 0 {
                continue;
            }
            let quot = x[j] / x[p];
            if quot == 0 {
                continue;
            }
            x[j] -= quot * x[p];
            // row_p += quot·row_j
            sub_mul_row(rows, start + p, start + j, &Integer::from(-quot));
        }
    };

    if x[pivot] < 0 {
        for v in rows[start + pivot].iter_mut() {
            *v = -std::mem::take(v);
        }
    }
    rows[start..=start + pivot].rotate_right(1);
}
