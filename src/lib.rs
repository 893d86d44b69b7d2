//! ECDSA private key recovery from partially leaked nonces
//!
//! Signatures whose nonces leak a few low or high bits are turned into a
//! Hidden Number Problem instance and a lattice whose short vectors encode
//! the private key. An attack controller drives a reduction oracle (LLL, BKZ
//! or a sieve) through an escalating schedule and checks for the key after
//! every step.

pub mod attack;
pub mod curve;
pub mod error;
pub mod generator;
pub mod hnp;
pub mod lattice;
pub mod math;
pub mod provider;
pub mod signature;

pub use attack::{AttackConfig, AttackController, AttackReport, KeyCheck, Outcome, Strategy};
pub use error::{Error, ReductionError};
pub use hnp::{HnpModel, Layout, Leakage, Placement};
pub use lattice::{LatticeBasis, NativeReducer, ReducerConfig, ReductionOracle};
pub use signature::{SignatureInput, SignatureRecord};
