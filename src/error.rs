//! Error taxonomy for model construction, reduction and attack orchestration

use thiserror::Error;

/// Failures raised by the reduction oracle.
///
/// These never abort an attempt: the controller logs them and moves on to
/// the next scheduled block size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReductionError {
    #[error("reduction at block size {block_size} exceeded its time limit")]
    Timeout { block_size: usize },
    #[error("enumeration exceeded its node budget of {nodes}")]
    NodeBudgetExceeded { nodes: u64 },
    #[error("reduction failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("signature {index} has s not invertible modulo the curve order")]
    InvalidSignature { index: usize },
    #[error("normalizing sample has t = 0")]
    DegenerateSample,
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
