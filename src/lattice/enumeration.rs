//! Schnorr-Euchner enumeration over a projected block
//!
//! Floating point is used only to steer the search. Any vector it returns is
//! rebuilt from integer coefficients, so rounding can cost optimality but never
//! correctness.

use crate::error::ReductionError;
use crate::lattice::gso::IntegralGso;

/// Gram-Schmidt view of rows `start..end`, norms relative to `‖b*_start‖²`.
pub(crate) struct Block {
    mu: Vec<Vec<f64>>,
    b: Vec<f64>,
}

impl Block {
    pub(crate) fn from_gso(gso: &IntegralGso, start: usize, end: usize) -> Self {
        let m = end - start;
        let mut mu = vec![vec![0.0; m]; m];
        let mut b = vec![0.0; m];
        for i in 0..m {
            b[i] = gso.norm_ratio(start + i, start);
            for j in 0..i {
                mu[i][j] = gso.mu(start + i, start + j);
            }
        }
        Self { mu, b }
    }

    pub(crate) fn len(&self) -> usize {
        self.b.len()
    }
}

/// Coefficients of the shortest non-zero vector with projected squared norm
/// below `radius_sq`, if any.
pub(crate) fn shortest(
    block: &Block,
    radius_sq: f64,
    budget: u64,
) -> Result<Option<Vec<i64>>, ReductionError> {
    let mut best = None;
    walk(block, radius_sq, budget, |x, norm| {
        best = Some(x.to_vec());
        Some(norm)
    })?;
    Ok(best)
}

/// Up to `limit` non-zero vectors (one of each `±v` pair) below `radius_sq`.
pub(crate) fn collect(
    block: &Block,
    radius_sq: f64,
    limit: usize,
    budget: u64,
) -> Result<Vec<Vec<i64>>, ReductionError> {
    let mut found = Vec::new();
    if limit == 0 {
        return Ok(found);
    }
    walk(block, radius_sq, budget, |x, _| {
        found.push(x.to_vec());
        (found.len() < limit).then_some(radius_sq)
    })?;
    Ok(found)
}

/// Depth-first zig-zag search. `visit` sees every non-zero leaf inside the
/// current radius and returns the new radius, or `None` to stop.
fn walk<F>(block: &Block, mut radius_sq: f64, budget: u64, mut visit: F) -> Result<(), ReductionError>
where
    F: FnMut(&[i64], f64) -> Option<f64>,
{
    let m = block.len();
    if m == 0 {
        return Ok(());
    }

    let mut x = vec![0i64; m];
    let mut center = vec![0f64; m];
    let mut partial = vec![0f64; m + 1];
    let mut step = vec![0i64; m];
    let mut dir = vec![-1i64; m];
    let mut nodes = 0u64;
    let mut i = m - 1;

    loop {
        nodes += 1;
        if nodes > budget {
            return Err(ReductionError::NodeBudgetExceeded { nodes: budget });
        }

        let diff = x[i] as f64 - center[i];
        partial[i] = partial[i + 1] + diff * diff * block.b[i];

        if partial[i] < radius_sq {
            if i > 0 {
                i -= 1;
                let mut c = 0.0;
                for j in i + 1..m {
                    c -= x[j] as f64 * block.mu[j][i];
                }
                center[i] = c;
                x[i] = c.round() as i64;
                step[i] = 0;
                dir[i] = if c < x[i] as f64 { 1 } else { -1 };
                continue;
            }
            if x.iter().any(|&v| v != 0) {
                match visit(&x, partial[0]) {
                    Some(r) => radius_sq = r,
                    None => return Ok(()),
                }
            }
        } else {
            i += 1;
            if i == m {
                return Ok(());
            }
        }
        next_sibling(i, &mut x, &mut step, &mut dir, &partial);
    }
}

fn next_sibling(i: usize, x: &mut [i64], step: &mut [i64], dir: &mut [i64], partial: &[f64]) {
    if partial[i + 1] == 0.0 {
        // Everything above is zero: only walk one way to skip −v.
        x[i] += 1;
    } else {
        dir[i] = -dir[i];
        step[i] = dir[i] - step[i];
        x[i] += step[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::gso::IntegralGso;
    use rug::Integer;

    fn block_of(rows: &[&[i64]]) -> Block {
        let rows: Vec<Vec<Integer>> = rows
            .iter()
            .map(|r| r.iter().map(|&x| Integer::from(x)).collect())
            .collect();
        let gso = IntegralGso::compute(&rows).unwrap();
        Block::from_gso(&gso, 0, rows.len())
    }

    fn norm_sq(rows: &[&[i64]], coeffs: &[i64]) -> i64 {
        let width = rows[0].len();
        (0..width)
            .map(|c| {
                let v: i64 = rows.iter().zip(coeffs).map(|(r, x)| r[c] * x).sum();
                v * v
            })
            .sum()
    }

    #[test]
    fn test_shortest_finds_hidden_vector() {
        // (1, 3) = 3·b1 − 2·b0 is the unique shortest pair ±v.
        let rows: &[&[i64]] = &[&[1009, 0], &[673, 1]];
        let block = block_of(rows);
        let x = shortest(&block, 1.0, 10_000).unwrap().unwrap();
        assert_eq!(norm_sq(rows, &x), 10);
    }

    #[test]
    fn test_shortest_none_when_first_row_is_shortest() {
        let rows: &[&[i64]] = &[&[1, 0, 0], &[0, 2, 0], &[0, 0, 3]];
        let block = block_of(rows);
        assert!(shortest(&block, 0.99, 10_000).unwrap().is_none());
    }

    #[test]
    fn test_collect_lists_each_pair_once() {
        let rows: &[&[i64]] = &[&[1, 0], &[0, 1]];
        let block = block_of(rows);
        // Norm² < 2.5: ±(1,0), ±(0,1), ±(1,1), ±(1,−1)
        let found = collect(&block, 2.5, 100, 10_000).unwrap();
        assert_eq!(found.len(), 4);
        let limited = collect(&block, 2.5, 2, 10_000).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_budget_is_enforced() {
        let rows: &[&[i64]] = &[&[1, 0], &[0, 1]];
        let block = block_of(rows);
        assert_eq!(
            collect(&block, 1000.0, 10_000, 5).unwrap_err(),
            ReductionError::NodeBudgetExceeded { nodes: 5 }
        );
    }
}
