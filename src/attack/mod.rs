//! Key recovery: candidate read-back, the solution predicate and the attack
//! state machine driving the reduction oracle

use crate::math::integer_to_hex_32;
use rug::Integer;
use std::fmt;

pub mod candidate;
pub mod controller;
pub mod predicate;
pub mod schedule;

pub use candidate::{CandidateExtractor, KeyCheck};
pub use controller::{AttackConfig, AttackController};
pub use predicate::PredicateFilter;
pub use schedule::{SchedulePolicy, ScheduleParams, Strategy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredKey {
    pub private_key: Integer,
    pub private_key_decimal: String,
    pub private_key_hex: String,
}

impl RecoveredKey {
    pub fn new(private_key: Integer) -> Self {
        Self {
            private_key_decimal: private_key.to_string(),
            private_key_hex: integer_to_hex_32(&private_key),
            private_key,
        }
    }
}

/// One reduction step of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Build,
    Bootstrap,
    BlockSize(usize),
    /// Sieve window of the given width.
    Window(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Build => f.write_str("build"),
            Step::Bootstrap => f.write_str("lll"),
            Step::BlockSize(b) => write!(f, "block {b}"),
            Step::Window(w) => write!(f, "window {w}"),
        }
    }
}

/// A step that failed without ending the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: Step,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttackAttempt {
    pub index: usize,
    pub strategy: Strategy,
    pub params: ScheduleParams,
    /// Steps that ran, in order.
    pub steps: Vec<Step>,
    pub failures: Vec<StepFailure>,
    pub found: Option<Integer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Found { key: RecoveredKey, attempt: usize },
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttackReport {
    pub outcome: Outcome,
    pub attempts: Vec<AttackAttempt>,
}

impl AttackReport {
    pub fn recovered(&self) -> Option<&RecoveredKey> {
        match &self.outcome {
            Outcome::Found { key, .. } => Some(key),
            Outcome::Exhausted => None,
        }
    }
}
