//! Escalation schedules
//!
//! Each strategy walks an increasing sequence of reduction strengths. The
//! sieve schedule depends on four tuning knobs that can be fixed or re-drawn
//! per attempt, since lattice reduction succeeds only with some probability.

use crate::error::{Error, Result};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Largest block size the BKZ schedule steps through before the closing pass.
pub const BKZ_MAX_BLOCK: usize = 70;
const BKZ_FIRST_BLOCK: usize = 20;
const BKZ_STEP: usize = 5;
const SIEVE_MIN_BLOCK: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Plain lattice, BKZ with growing block size.
    Bkz,
    /// Plain lattice, progressive sieve.
    Sieve,
    /// Compressed lattice, windowed sieve filtered by the predicate.
    Predicate,
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bkz" => Ok(Strategy::Bkz),
            "sieve" | "g6k" => Ok(Strategy::Sieve),
            "predicate" | "g6k-predicate" => Ok(Strategy::Predicate),
            _ => Err(Error::Configuration(format!(
                "unknown strategy: {s} (expected bkz, sieve or predicate)"
            ))),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Bkz => "bkz",
            Strategy::Sieve => "sieve",
            Strategy::Predicate => "predicate",
        })
    }
}

/// Sieve schedule knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduleParams {
    pub steps: usize,
    pub jump: usize,
    pub extra_dim_free: usize,
    pub dim_free_fraction: f64,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            steps: 5,
            jump: 100,
            extra_dim_free: 2,
            dim_free_fraction: 0.3,
        }
    }
}

impl ScheduleParams {
    /// Draws exploratory parameters uniformly from their tuned ranges.
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        Self {
            steps: if rng.gen_bool(0.5) { 5 } else { 10 },
            jump: if rng.gen_bool(0.5) { 30 } else { 40 },
            extra_dim_free: rng.gen_range(2..=5),
            dim_free_fraction: rng.gen_range(0.28..=0.32),
        }
    }
}

/// How schedule parameters are chosen for each attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulePolicy {
    Fixed(ScheduleParams),
    Exploratory,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        SchedulePolicy::Fixed(ScheduleParams::default())
    }
}

impl SchedulePolicy {
    pub fn params_for_attempt<R: Rng>(&self, rng: &mut R) -> ScheduleParams {
        match self {
            SchedulePolicy::Fixed(params) => *params,
            SchedulePolicy::Exploratory => ScheduleParams::sample(rng),
        }
    }
}

/// `20, 25, …` up to `min(n, 70)`, then `n` itself when it was skipped and
/// below 70.
pub fn bkz_block_sizes(n: usize) -> Vec<usize> {
    let cap = n.min(BKZ_MAX_BLOCK);
    let mut sizes: Vec<usize> = (BKZ_FIRST_BLOCK..=cap).step_by(BKZ_STEP).collect();
    if sizes.last() != Some(&n) && n < BKZ_MAX_BLOCK {
        sizes.push(n);
    }
    sizes
}

/// `max(20, n − jump)` to `n` in `steps` increments, closing at `n`.
pub fn sieve_block_sizes(n: usize, params: &ScheduleParams) -> Vec<usize> {
    let start = SIEVE_MIN_BLOCK.max(n.saturating_sub(params.jump));
    let mut sizes: Vec<usize> = (start..=n).step_by(params.steps.max(1)).collect();
    if sizes.last().map_or(true, |&last| last < n) {
        sizes.push(n);
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_bkz_schedule() {
        assert_eq!(bkz_block_sizes(40), vec![20, 25, 30, 35, 40]);
        assert_eq!(bkz_block_sizes(42), vec![20, 25, 30, 35, 40, 42]);
        assert_eq!(bkz_block_sizes(12), vec![12]);
        assert_eq!(bkz_block_sizes(70), vec![20, 25, 30, 35, 40, 45, 50, 55, 60, 65, 70]);
        let large = bkz_block_sizes(90);
        assert_eq!(large.last(), Some(&70));
        assert_eq!(large.len(), 11);
    }

    #[test]
    fn test_sieve_schedule() {
        let params = ScheduleParams::default();
        assert_eq!(sieve_block_sizes(40, &params), vec![20, 25, 30, 35, 40]);
        assert_eq!(sieve_block_sizes(43, &params), vec![20, 25, 30, 35, 40, 43]);
        assert_eq!(sieve_block_sizes(10, &params), vec![10]);

        let narrow = ScheduleParams {
            steps: 10,
            jump: 30,
            ..params
        };
        assert_eq!(sieve_block_sizes(100, &narrow), vec![70, 80, 90, 100]);
    }

    #[test]
    fn test_sampled_params_in_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        for _ in 0..64 {
            let p = ScheduleParams::sample(&mut rng);
            assert!(p.steps == 5 || p.steps == 10);
            assert!(p.jump == 30 || p.jump == 40);
            assert!((2..=5).contains(&p.extra_dim_free));
            assert!((0.28..=0.32).contains(&p.dim_free_fraction));
        }
    }

    #[test]
    fn test_fixed_policy_ignores_rng() {
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        let policy = SchedulePolicy::default();
        assert_eq!(policy.params_for_attempt(&mut rng), ScheduleParams::default());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("BKZ".parse::<Strategy>().unwrap(), Strategy::Bkz);
        assert_eq!("g6k".parse::<Strategy>().unwrap(), Strategy::Sieve);
        assert_eq!("predicate".parse::<Strategy>().unwrap(), Strategy::Predicate);
        assert!(matches!("fplll".parse::<Strategy>(), Err(Error::Configuration(_))));
    }
}
