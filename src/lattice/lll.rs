//! Integral LLL reduction (Cohen, Alg. 2.6.7)
//!
//! Works entirely on exact integers, so no precision tuning is needed for
//! the few-hundred-bit entries of HNP bases.

use crate::error::ReductionError;
use crate::lattice::gso::IntegralGso;
use crate::lattice::sub_mul_row;
use rug::Integer;

/// Lovász parameter as a fraction `num/den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delta {
    pub num: u32,
    pub den: u32,
}

impl Default for Delta {
    fn default() -> Self {
        Self { num: 99, den: 100 }
    }
}

/// LLL-reduces `rows` in place and returns the Gram-Schmidt data of the
/// reduced basis.
pub(crate) fn lll(rows: &mut [Vec<Integer>], delta: Delta) -> Result<IntegralGso, ReductionError> {
    let n = rows.len();
    let mut gso = IntegralGso::new(n);
    if n == 0 {
        return Ok(gso);
    }
    gso.compute_row(rows, 0)?;

    let mut k = 1;
    let mut k_max = 0;
    while k < n {
        if k > k_max {
            k_max = k;
            gso.compute_row(rows, k)?;
        }
        loop {
            size_reduce(rows, &mut gso, k, k - 1);
            if lovasz_fails(&gso, k, delta) {
                swap(rows, &mut gso, k, k_max);
                k = (k - 1).max(1);
            } else {
                for l in (0..k - 1).rev() {
                    size_reduce(rows, &mut gso, k, l);
                }
                k += 1;
                break;
            }
        }
    }
    Ok(gso)
}

fn size_reduce(rows: &mut [Vec<Integer>], gso: &mut IntegralGso, k: usize, l: usize) {
    let twice = Integer::from(gso.lambda[k][l].abs_ref()) * 2u32;
    if twice <= gso.d[l + 1] {
        return;
    }
    let (q, _) = gso.lambda[k][l].clone().div_rem_round(gso.d[l + 1].clone());
    sub_mul_row(rows, k, l, &q);

    let d = gso.d[l + 1].clone();
    gso.lambda[k][l] -= &q * &d;
    for i in 0..l {
        let lam_li = gso.lambda[l][i].clone();
        gso.lambda[k][i] -= &q * &lam_li;
    }
}

// den·d_{k+1}·d_{k-1} < num·d_k² − den·λ_{k,k-1}²
fn lovasz_fails(gso: &IntegralGso, k: usize, delta: Delta) -> bool {
    let lhs = Integer::from(&gso.d[k + 1] * &gso.d[k - 1]) * delta.den;
    let mut rhs = Integer::from(gso.d[k].square_ref()) * delta.num;
    rhs -= Integer::from(gso.lambda[k][k - 1].square_ref()) * delta.den;
    lhs < rhs
}

fn swap(rows: &mut [Vec<Integer>], gso: &mut IntegralGso, k: usize, k_max: usize) {
    rows.swap(k, k - 1);
    for j in 0..k - 1 {
        let tmp = std::mem::take(&mut gso.lambda[k][j]);
        gso.lambda[k][j] = std::mem::replace(&mut gso.lambda[k - 1][j], tmp);
    }

    let lam = gso.lambda[k][k - 1].clone();
    let mut b = Integer::from(&gso.d[k - 1] * &gso.d[k + 1]);
    b += Integer::from(lam.square_ref());
    b /= &gso.d[k];

    for i in k + 1..=k_max {
        let t = gso.lambda[i][k].clone();

        let mut upper = Integer::from(&gso.d[k + 1] * &gso.lambda[i][k - 1]);
        upper -= &lam * &t;
        upper /= &gso.d[k];
        gso.lambda[i][k] = upper;

        let mut lower = Integer::from(&b * &t);
        lower += &lam * &gso.lambda[i][k];
        lower /= &gso.d[k + 1];
        gso.lambda[i][k - 1] = lower;
    }
    gso.d[k] = b;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::dot;

    fn ints(rows: &[&[i64]]) -> Vec<Vec<Integer>> {
        rows.iter()
            .map(|r| r.iter().map(|&x| Integer::from(x)).collect())
            .collect()
    }

    fn det(gso: &IntegralGso) -> Integer {
        gso.d.last().cloned().unwrap()
    }

    #[test]
    fn test_lll_textbook_example() {
        let mut rows = ints(&[&[1, 1, 1], &[-1, 0, 2], &[3, 5, 6]]);
        let before = IntegralGso::compute(&rows).unwrap();
        let gso = lll(&mut rows, Delta::default()).unwrap();

        // Same lattice: the Gram determinant is preserved.
        assert_eq!(det(&gso), det(&before));
        for row in &rows {
            assert!(dot(row, row) <= 5);
        }
    }

    #[test]
    fn test_lll_gso_matches_recomputation() {
        let mut rows = ints(&[
            &[201, 37, 0, 0],
            &[1648, 297, 0, 0],
            &[3, 5, 7, 11],
            &[13, 17, 19, 1],
        ]);
        let gso = lll(&mut rows, Delta::default()).unwrap();
        let fresh = IntegralGso::compute(&rows).unwrap();
        assert_eq!(gso.d, fresh.d);
        for i in 0..rows.len() {
            for j in 0..i {
                assert_eq!(gso.lambda[i][j], fresh.lambda[i][j]);
                // size-reduced
                assert!(Integer::from(gso.lambda[i][j].abs_ref()) * 2u32 <= gso.d[j + 1]);
            }
        }
    }

    #[test]
    fn test_lll_finds_planted_short_vector() {
        // q-ary lattice with a hidden short relation 3·x ≡ 1 (mod 1009)
        let mut rows = ints(&[&[1009, 0], &[673, 1]]);
        lll(&mut rows, Delta::default()).unwrap();
        let shortest = rows.iter().map(|r| dot(r, r)).min().unwrap();
        // (1, 3) = 3·(673, 1) − 2·(1009, 0)
        assert_eq!(shortest, 10);
    }
}
