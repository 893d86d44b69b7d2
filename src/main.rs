//! CLI for ECDSA key recovery from leaky nonces

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use noncesieve::attack::schedule::{SchedulePolicy, ScheduleParams};
use noncesieve::attack::{AttackAttempt, AttackConfig, AttackController, AttackReport, KeyCheck};
use noncesieve::curve::{Curve, Secp256k1};
use noncesieve::generator::LeakySigner;
use noncesieve::hnp::{Leakage, Placement};
use noncesieve::lattice::{NativeReducer, ReducerConfig};
use noncesieve::math::{parse_decimal_strict, ScalarKind};
use noncesieve::provider::load_signatures;
use noncesieve::{Outcome, Strategy};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::process::ExitCode;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "noncesieve")]
#[command(about = "ECDSA private key recovery from partially leaked nonces")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Recover the key behind a set of signatures (exit 0 recovered, 1 exhausted)
    Recover {
        #[arg(default_value = "-")]
        input: String,

        #[command(flatten)]
        attack: AttackArgs,

        #[arg(
            long,
            conflicts_with = "private_key",
            required_unless_present = "private_key",
            help = "Target public key (SEC1 hex) used to confirm candidates"
        )]
        pubkey: Option<String>,

        #[arg(long, help = "Known private key (decimal), for testing the pipeline")]
        private_key: Option<String>,
    },
    /// Attack freshly generated keys (exit 0 when every run recovers its key)
    Simulate {
        #[arg(long, default_value = "40", help = "Signatures per run")]
        signatures: usize,

        #[command(flatten)]
        attack: AttackArgs,

        #[arg(long, default_value = "1")]
        runs: usize,

        #[arg(long, help = "Seed for keys, messages, nonces and schedule sampling")]
        seed: Option<u64>,
    },
}

#[derive(Args)]
struct AttackArgs {
    #[arg(long, default_value = "lsb", help = "Leaked nonce bits: lsb, msb")]
    placement: String,

    #[arg(long, default_value = "8", help = "Number of leaked bits per nonce")]
    bits: u32,

    #[arg(long, default_value = "bkz", help = "Strategy: bkz, sieve, predicate")]
    strategy: String,

    #[arg(long, default_value = "1")]
    attempts: usize,

    #[arg(long, help = "Re-draw sieve schedule parameters for every attempt")]
    explore: bool,

    #[arg(long, default_value = "50", help = "Initial window width for predicate sieving")]
    predicate_window: usize,

    #[arg(long, default_value = "4", help = "Sieve passes per window width")]
    sieve_passes: usize,

    #[arg(long, default_value = "5000000", help = "Enumeration nodes per block")]
    node_budget: u64,

    #[arg(long, default_value = "8")]
    max_tours: usize,

    #[arg(long, help = "Seconds allowed per reduction step")]
    time_limit: Option<u64>,
}

impl AttackArgs {
    fn leakage(&self) -> Result<Leakage> {
        let placement: Placement = self.placement.parse()?;
        Ok(Leakage::new(placement, self.bits))
    }

    fn config(&self) -> Result<AttackConfig> {
        let strategy: Strategy = self.strategy.parse()?;
        let schedule = if self.explore {
            SchedulePolicy::Exploratory
        } else {
            SchedulePolicy::Fixed(ScheduleParams::default())
        };
        Ok(AttackConfig {
            strategy,
            attempts: self.attempts,
            schedule,
            predicate_window: self.predicate_window,
            sieve_passes: self.sieve_passes,
        })
    }

    fn reducer(&self) -> NativeReducer {
        NativeReducer::new(ReducerConfig {
            max_tours: self.max_tours,
            node_budget: self.node_budget,
            time_limit: self.time_limit.map(Duration::from_secs),
            ..ReducerConfig::default()
        })
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Recover {
            input,
            attack,
            pubkey,
            private_key,
        } => {
            let curve = Secp256k1::new();
            let leakage = attack.leakage()?;
            let config = attack.config()?;
            let signatures = load_signatures(&input, leakage.bits, curve.order())?;

            let check = match (&pubkey, &private_key) {
                (Some(hex), _) => KeyCheck::PublicKey(curve.parse_point(hex)?),
                (None, Some(dec)) => {
                    KeyCheck::Known(parse_decimal_strict(dec, ScalarKind::RorS, curve.order())?)
                }
                (None, None) => return Err(anyhow!("either --pubkey or --private-key is required")),
            };

            let started = Instant::now();
            let mut controller = AttackController::new(curve, attack.reducer(), config);
            let report = controller.run(&signatures, leakage, &check)?;

            let output = format_report(&report, signatures.len(), leakage, started.elapsed(), cli.json)?;
            println!("{}", output);
            Ok(report.recovered().is_some())
        }
        Command::Simulate {
            signatures,
            attack,
            runs,
            seed,
        } => {
            let leakage = attack.leakage()?;
            let config = attack.config()?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let mut results = Vec::with_capacity(runs);
            for run in 0..runs {
                let signer = LeakySigner::random(&mut rng);
                let sigs = signer.sign_batch(&mut rng, signatures, leakage.placement, leakage.bits);
                let check = KeyCheck::PublicKey(*signer.public_key());
                let controller_rng = StdRng::from_rng(&mut rng)?;

                let started = Instant::now();
                let mut controller = AttackController::with_rng(
                    signer.curve().clone(),
                    attack.reducer(),
                    config.clone(),
                    controller_rng,
                );
                let report = controller.run(&sigs, leakage, &check)?;
                let recovered = report
                    .recovered()
                    .is_some_and(|k| &k.private_key == signer.private_key());
                results.push(RunOutput {
                    run,
                    recovered,
                    attempt: match report.outcome {
                        Outcome::Found { attempt, .. } => Some(attempt),
                        Outcome::Exhausted => None,
                    },
                    seconds: started.elapsed().as_secs_f64(),
                });
            }

            let successes = results.iter().filter(|r| r.recovered).count();
            let output = format_simulation(results, signatures, leakage, config.strategy, cli.json)?;
            println!("{}", output);
            Ok(successes == runs)
        }
    }
}

#[derive(Serialize)]
struct ReportOutput {
    status: String,
    recovered_key: Option<RecoveredKeyOutput>,
    winning_attempt: Option<usize>,
    attempts: Vec<AttemptOutput>,
    summary: SummaryOutput,
}

#[derive(Serialize)]
struct RecoveredKeyOutput {
    private_key_decimal: String,
    private_key_hex: String,
}

#[derive(Serialize)]
struct AttemptOutput {
    index: usize,
    strategy: Strategy,
    params: ScheduleParams,
    steps: Vec<String>,
    failures: Vec<FailureOutput>,
}

#[derive(Serialize)]
struct FailureOutput {
    step: String,
    reason: String,
}

#[derive(Serialize)]
struct SummaryOutput {
    total_signatures: usize,
    placement: String,
    leak_bits: u32,
    attempts_run: usize,
    seconds: f64,
}

#[derive(Serialize)]
struct SimulationOutput {
    signatures: usize,
    placement: String,
    leak_bits: u32,
    strategy: String,
    runs: usize,
    successes: usize,
    success_rate: f64,
    mean_seconds: f64,
    results: Vec<RunOutput>,
}

#[derive(Serialize)]
struct RunOutput {
    run: usize,
    recovered: bool,
    attempt: Option<usize>,
    seconds: f64,
}

fn attempt_output(attempt: &AttackAttempt) -> AttemptOutput {
    AttemptOutput {
        index: attempt.index,
        strategy: attempt.strategy,
        params: attempt.params,
        steps: attempt.steps.iter().map(ToString::to_string).collect(),
        failures: attempt
            .failures
            .iter()
            .map(|f| FailureOutput {
                step: f.step.to_string(),
                reason: f.reason.clone(),
            })
            .collect(),
    }
}

fn format_report(
    report: &AttackReport,
    total_signatures: usize,
    leakage: Leakage,
    elapsed: Duration,
    json: bool,
) -> Result<String> {
    let (status, winning_attempt) = match &report.outcome {
        Outcome::Found { attempt, .. } => ("recovered", Some(*attempt)),
        Outcome::Exhausted => ("exhausted", None),
    };
    let output = ReportOutput {
        status: status.to_string(),
        recovered_key: report.recovered().map(|key| RecoveredKeyOutput {
            private_key_decimal: key.private_key_decimal.clone(),
            private_key_hex: key.private_key_hex.clone(),
        }),
        winning_attempt,
        attempts: report.attempts.iter().map(attempt_output).collect(),
        summary: SummaryOutput {
            total_signatures,
            placement: leakage.placement.to_string(),
            leak_bits: leakage.bits,
            attempts_run: report.attempts.len(),
            seconds: elapsed.as_secs_f64(),
        },
    };

    if json {
        return Ok(serde_json::to_string_pretty(&output)?);
    }

    let mut text = String::new();
    text.push_str(&format!(
        "Attacked {} signatures leaking {} {} bits\n\n",
        total_signatures, leakage.bits, leakage.placement
    ));
    for attempt in &output.attempts {
        text.push_str(&format!("Attempt #{} ({})\n", attempt.index + 1, attempt.strategy));
        text.push_str(&format!("  Steps: {}\n", attempt.steps.join(", ")));
        for failure in &attempt.failures {
            text.push_str(&format!("  Failed {}: {}\n", failure.step, failure.reason));
        }
    }
    text.push('\n');
    match &output.recovered_key {
        Some(key) => {
            text.push_str(&format!("Status: {}\n", output.status));
            text.push_str(&format!("  Private Key (decimal): {}\n", key.private_key_decimal));
            text.push_str(&format!("  Private Key (hex): {}\n", key.private_key_hex));
        }
        None => {
            text.push_str(&format!("Status: {}\n", output.status));
            text.push_str("  No candidate passed verification.\n");
        }
    }
    Ok(text)
}

fn format_simulation(
    results: Vec<RunOutput>,
    signatures: usize,
    leakage: Leakage,
    strategy: Strategy,
    json: bool,
) -> Result<String> {
    let runs = results.len();
    let successes = results.iter().filter(|r| r.recovered).count();
    let total: f64 = results.iter().map(|r| r.seconds).sum();
    let (success_rate, mean_seconds) = if runs == 0 {
        (0.0, 0.0)
    } else {
        (successes as f64 / runs as f64, total / runs as f64)
    };
    let output = SimulationOutput {
        signatures,
        placement: leakage.placement.to_string(),
        leak_bits: leakage.bits,
        strategy: strategy.to_string(),
        runs,
        successes,
        success_rate,
        mean_seconds,
        results,
    };

    if json {
        return Ok(serde_json::to_string_pretty(&output)?);
    }

    let mut text = String::new();
    text.push_str(&format!(
        "Simulated {} runs: {} signatures, {} {} bits, {} strategy\n",
        output.runs, output.signatures, output.leak_bits, output.placement, output.strategy
    ));
    text.push_str(&format!(
        "  Recovered: {}/{} ({:.1}%)\n",
        output.successes,
        output.runs,
        output.success_rate * 100.0
    ));
    text.push_str(&format!("  Mean time per run: {:.2}s\n", output.mean_seconds));
    Ok(text)
}
