//! End-to-end recoveries against synthetic leaky signers

use noncesieve::attack::predicate::PredicateFilter;
use noncesieve::attack::schedule::{SchedulePolicy, ScheduleParams};
use noncesieve::attack::Step;
use noncesieve::curve::Curve;
use noncesieve::generator::LeakySigner;
use noncesieve::lattice::oracle::Verdict;
use noncesieve::{
    AttackConfig, AttackController, AttackReport, HnpModel, KeyCheck, Layout, Leakage,
    NativeReducer, Outcome, Placement, ReducerConfig, ReductionError, SignatureRecord, Strategy,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::time::Duration;

fn setup(seed: u64, n: usize, leakage: Leakage) -> (LeakySigner, Vec<SignatureRecord>) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let signer = LeakySigner::random(&mut rng);
    let sigs = signer.sign_batch(&mut rng, n, leakage.placement, leakage.bits);
    (signer, sigs)
}

fn attack(
    signer: &LeakySigner,
    sigs: &[SignatureRecord],
    leakage: Leakage,
    config: AttackConfig,
    reducer: ReducerConfig,
) -> AttackReport {
    let mut controller = AttackController::with_rng(
        signer.curve().clone(),
        NativeReducer::new(reducer),
        config,
        ChaCha20Rng::seed_from_u64(99),
    );
    controller
        .run(sigs, leakage, &KeyCheck::PublicKey(*signer.public_key()))
        .unwrap()
}

fn strategy(strategy: Strategy) -> AttackConfig {
    AttackConfig {
        strategy,
        ..AttackConfig::default()
    }
}

fn assert_recovered(report: &AttackReport, signer: &LeakySigner) {
    match &report.outcome {
        Outcome::Found { key, attempt } => {
            assert_eq!(&key.private_key, signer.private_key());
            assert_eq!(*attempt, 0);
        }
        Outcome::Exhausted => panic!("key not recovered: {:?}", report.attempts),
    }
}

#[test]
fn lll_alone_exposes_key_with_generous_leakage() {
    let leakage = Leakage::new(Placement::Lsb, 24);
    let (signer, sigs) = setup(101, 24, leakage);
    let report = attack(&signer, &sigs, leakage, strategy(Strategy::Bkz), ReducerConfig::default());
    assert_recovered(&report, &signer);
    assert_eq!(report.attempts[0].steps, vec![Step::Bootstrap]);
}

#[test]
fn bkz_strategy_recovers_in_one_attempt() {
    let leakage = Leakage::new(Placement::Lsb, 28);
    let (signer, sigs) = setup(102, 12, leakage);
    let report = attack(&signer, &sigs, leakage, strategy(Strategy::Bkz), ReducerConfig::default());
    assert_recovered(&report, &signer);
    assert_eq!(report.attempts.len(), 1);
}

#[test]
fn sieve_strategy_recovers_lsb_and_msb() {
    for (leakage, n) in [
        (Leakage::new(Placement::Lsb, 32), 10),
        (Leakage::new(Placement::Msb, 64), 8),
    ] {
        let (signer, sigs) = setup(103, n, leakage);
        let report = attack(&signer, &sigs, leakage, strategy(Strategy::Sieve), ReducerConfig::default());
        assert_recovered(&report, &signer);
    }
}

#[test]
fn predicate_strategy_recovers_lsb_and_msb() {
    for (leakage, n) in [
        (Leakage::new(Placement::Lsb, 32), 10),
        (Leakage::new(Placement::Msb, 64), 8),
    ] {
        let (signer, sigs) = setup(104, n, leakage);
        let report = attack(
            &signer,
            &sigs,
            leakage,
            strategy(Strategy::Predicate),
            ReducerConfig::default(),
        );
        assert_recovered(&report, &signer);
    }
}

#[test]
fn exploratory_schedule_still_recovers() {
    let leakage = Leakage::new(Placement::Lsb, 32);
    let (signer, sigs) = setup(105, 10, leakage);
    let config = AttackConfig {
        strategy: Strategy::Sieve,
        schedule: SchedulePolicy::Exploratory,
        ..AttackConfig::default()
    };
    let report = attack(&signer, &sigs, leakage, config, ReducerConfig::default());
    assert_recovered(&report, &signer);
    assert_ne!(report.attempts[0].params, ScheduleParams::default());
}

#[test]
fn too_little_leakage_exhausts_without_false_positive() {
    let leakage = Leakage::new(Placement::Lsb, 2);
    let (signer, sigs) = setup(106, 12, leakage);
    for s in [Strategy::Bkz, Strategy::Predicate] {
        let config = AttackConfig {
            strategy: s,
            attempts: 2,
            ..AttackConfig::default()
        };
        let report = attack(&signer, &sigs, leakage, config, ReducerConfig::default());
        assert_eq!(report.outcome, Outcome::Exhausted);
        assert_eq!(report.attempts.len(), 2);
        assert!(report.attempts.iter().all(|a| a.found.is_none()));
    }
}

#[test]
fn expired_time_limit_fails_steps_not_the_attack() {
    let leakage = Leakage::new(Placement::Lsb, 2);
    let (signer, sigs) = setup(107, 12, leakage);
    let reducer = ReducerConfig {
        time_limit: Some(Duration::ZERO),
        ..ReducerConfig::default()
    };
    let report = attack(&signer, &sigs, leakage, strategy(Strategy::Bkz), reducer);
    assert_eq!(report.outcome, Outcome::Exhausted);
    let failures = &report.attempts[0].failures;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].step, Step::BlockSize(12));
    assert_eq!(
        failures[0].reason,
        ReductionError::Timeout { block_size: 12 }.to_string()
    );
}

#[test]
fn predicate_verdicts_are_deterministic() {
    let leakage = Leakage::new(Placement::Lsb, 32);
    let (signer, sigs) = setup(108, 10, leakage);
    let model = HnpModel::build(&sigs, signer.curve().order(), leakage, Layout::Compressed).unwrap();
    let filter = PredicateFilter::new(model.instance()).unwrap();

    for row in model.basis().rows() {
        let first = filter.evaluate(row);
        assert_eq!(first, Verdict::Reject);
        assert_eq!(filter.evaluate(row), first);
    }
}
