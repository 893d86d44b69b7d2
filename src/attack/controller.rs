//! Attack state machine
//!
//! ```text
//! Init → Bootstrap(LLL) → Check → {Escalate(strategy) → Check}* → Success | Exhausted
//! ```
//!
//! Each attempt rebuilds the model from the signatures, LLL-reduces it, checks
//! for the key, then walks the strategy's schedule checking after every step.
//! Oracle failures only cost the step they happened in.

use crate::attack::candidate::{CandidateExtractor, KeyCheck};
use crate::attack::predicate::{PredicateFilter, VerifiedPredicate};
use crate::attack::schedule::{
    bkz_block_sizes, sieve_block_sizes, SchedulePolicy, ScheduleParams, Strategy,
};
use crate::attack::{AttackAttempt, AttackReport, Outcome, RecoveredKey, Step, StepFailure};
use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::hnp::{HnpModel, Layout, Leakage};
use crate::lattice::oracle::{scan_rows, ReductionOracle, SieveParams, VectorPredicate};
use crate::lattice::LatticeBasis;
use crate::signature::SignatureRecord;
use log::{debug, info, warn};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rug::Integer;
use std::time::Instant;

/// Initial sieve window width for the predicate strategy.
pub const DEFAULT_PREDICATE_WINDOW: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct AttackConfig {
    pub strategy: Strategy,
    pub attempts: usize,
    pub schedule: SchedulePolicy,
    pub predicate_window: usize,
    /// Sieve passes per window width.
    pub sieve_passes: usize,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Bkz,
            attempts: 1,
            schedule: SchedulePolicy::default(),
            predicate_window: DEFAULT_PREDICATE_WINDOW,
            sieve_passes: 4,
        }
    }
}

pub struct AttackController<C: Curve, O: ReductionOracle, R: RngCore + CryptoRng = OsRng> {
    curve: C,
    oracle: O,
    rng: R,
    config: AttackConfig,
}

impl<C: Curve, O: ReductionOracle> AttackController<C, O> {
    pub fn new(curve: C, oracle: O, config: AttackConfig) -> Self {
        Self::with_rng(curve, oracle, config, OsRng)
    }
}

impl<C: Curve, O: ReductionOracle, R: RngCore + CryptoRng> AttackController<C, O, R> {
    pub fn with_rng(curve: C, oracle: O, config: AttackConfig, rng: R) -> Self {
        Self {
            curve,
            oracle,
            rng,
            config,
        }
    }

    /// Runs up to `config.attempts` independent attempts.
    ///
    /// Configuration and signature errors are returned before any reduction
    /// work; everything the oracle raises is recorded in the report instead.
    pub fn run(
        &mut self,
        signatures: &[SignatureRecord],
        leakage: Leakage,
        check: &KeyCheck<C::Point>,
    ) -> Result<AttackReport> {
        if self.config.attempts == 0 {
            return Err(Error::Configuration("at least one attempt is required".into()));
        }
        if self.config.strategy == Strategy::Predicate && self.config.predicate_window < 2 {
            return Err(Error::Configuration("predicate window must be at least 2".into()));
        }

        let mut ordered = signatures.to_vec();
        let mut attempts = Vec::with_capacity(self.config.attempts);

        for index in 0..self.config.attempts {
            let params = self.config.schedule.params_for_attempt(&mut self.rng);
            info!(
                "attempt {}/{}: {} strategy, {} signatures, {} {} bits",
                index + 1,
                self.config.attempts,
                self.config.strategy,
                ordered.len(),
                leakage.bits,
                leakage.placement
            );
            debug!("schedule parameters: {params:?}");

            let started = Instant::now();
            let mut attempt = AttackAttempt {
                index,
                strategy: self.config.strategy,
                params,
                steps: Vec::new(),
                failures: Vec::new(),
                found: None,
            };

            match self.attempt(&ordered, leakage, check, &mut attempt) {
                Ok(()) => {}
                Err(Error::DegenerateSample) => {
                    warn!("attempt {}: normalizing sample has t = 0, rotating samples", index + 1);
                    attempt.failures.push(StepFailure {
                        step: Step::Build,
                        reason: Error::DegenerateSample.to_string(),
                    });
                    ordered.rotate_left(1);
                }
                Err(e) => return Err(e),
            }

            info!(
                "attempt {} finished in {:.2?}: {}",
                index + 1,
                started.elapsed(),
                if attempt.found.is_some() { "key found" } else { "exhausted" }
            );
            let found = attempt.found.clone();
            attempts.push(attempt);
            if let Some(key) = found {
                return Ok(AttackReport {
                    outcome: Outcome::Found {
                        key: RecoveredKey::new(key),
                        attempt: index,
                    },
                    attempts,
                });
            }
        }

        Ok(AttackReport {
            outcome: Outcome::Exhausted,
            attempts,
        })
    }

    fn attempt(
        &self,
        signatures: &[SignatureRecord],
        leakage: Leakage,
        check: &KeyCheck<C::Point>,
        attempt: &mut AttackAttempt,
    ) -> Result<()> {
        let layout = match attempt.strategy {
            Strategy::Bkz | Strategy::Sieve => Layout::Plain,
            Strategy::Predicate => Layout::Compressed,
        };
        let mut model = HnpModel::build(signatures, self.curve.order(), leakage, layout)?;
        let extractor = CandidateExtractor::new(&self.curve, check);
        let key_column = model.key_column();
        let (basis, instance) = model.split_mut();

        let filter = match layout {
            Layout::Compressed => Some(PredicateFilter::new(instance)?),
            Layout::Plain => None,
        };
        let verified = filter.as_ref().map(|f| VerifiedPredicate::new(f, &extractor));
        let column_probe = key_column.map(|c| extractor.at_column(c));
        let probe: &dyn VectorPredicate = match (&verified, &column_probe) {
            (Some(v), _) => v,
            (None, Some(c)) => c,
            (None, None) => {
                return Err(Error::InternalInconsistency(
                    "plain layout without a key column".into(),
                ))
            }
        };

        info!("bootstrap: LLL on a {}-dimensional basis", basis.dim());
        attempt.steps.push(Step::Bootstrap);
        match self.oracle.lll(basis) {
            Ok(()) => {
                if let Some(key) = scan_rows(basis, probe) {
                    info!("key exposed by LLL alone");
                    attempt.found = Some(key);
                    return Ok(());
                }
            }
            Err(e) => record_failure(attempt, Step::Bootstrap, e),
        }

        let n = signatures.len();
        let found = match attempt.strategy {
            Strategy::Bkz => self.escalate_bkz(basis, n, probe, attempt),
            Strategy::Sieve => self.escalate_sieve(basis, n, probe, attempt),
            Strategy::Predicate => self.escalate_windows(basis, probe, attempt),
        };
        attempt.found = found;
        Ok(())
    }

    fn escalate_bkz(
        &self,
        basis: &mut LatticeBasis,
        n: usize,
        probe: &dyn VectorPredicate,
        attempt: &mut AttackAttempt,
    ) -> Option<Integer> {
        for block_size in bkz_block_sizes(n) {
            info!("BKZ-{block_size}");
            attempt.steps.push(Step::BlockSize(block_size));
            match self.oracle.bkz(basis, block_size) {
                Ok(()) => {
                    if let Some(key) = scan_rows(basis, probe) {
                        return Some(key);
                    }
                }
                Err(e) => record_failure(attempt, Step::BlockSize(block_size), e),
            }
        }
        None
    }

    fn escalate_sieve(
        &self,
        basis: &mut LatticeBasis,
        n: usize,
        probe: &dyn VectorPredicate,
        attempt: &mut AttackAttempt,
    ) -> Option<Integer> {
        let params: ScheduleParams = attempt.params;
        for block_size in sieve_block_sizes(n, &params) {
            let sieve = SieveParams {
                block_size,
                dim_free_fraction: params.dim_free_fraction,
                extra_dim_free: params.extra_dim_free,
            };
            info!("sieve β={block_size}");
            attempt.steps.push(Step::BlockSize(block_size));
            match self.oracle.sieve(basis, &sieve, Some(probe)) {
                Ok(Some(key)) => return Some(key),
                Ok(None) => {}
                Err(e) => record_failure(attempt, Step::BlockSize(block_size), e),
            }
        }
        None
    }

    fn escalate_windows(
        &self,
        basis: &mut LatticeBasis,
        probe: &dyn VectorPredicate,
        attempt: &mut AttackAttempt,
    ) -> Option<Integer> {
        let dim = basis.dim();
        let first = dim.saturating_sub(self.config.predicate_window);
        for window_start in (0..=first).rev() {
            let width = dim - window_start;
            info!("predicate sieve on window [{window_start}, {dim})");
            attempt.steps.push(Step::Window(width));
            match self
                .oracle
                .sieve_window(basis, window_start, self.config.sieve_passes, probe)
            {
                Ok(Some(key)) => return Some(key),
                Ok(None) => {}
                Err(e) => record_failure(attempt, Step::Window(width), e),
            }
        }
        None
    }
}

fn record_failure(attempt: &mut AttackAttempt, step: Step, error: impl std::fmt::Display) {
    warn!("{step} failed, moving on: {error}");
    attempt.failures.push(StepFailure {
        step,
        reason: error.to_string(),
    });
}
