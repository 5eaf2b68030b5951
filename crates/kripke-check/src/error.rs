//! Error types for the verification engine
//!
//! The taxonomy separates verification outcomes from engine and input
//! errors. A [`VerifyError::Violation`] is the one variant that carries
//! a reconstructed counterexample; everything else terminates the run
//! without a verdict.

use crate::counterexample::CounterexampleReport;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VerifyError>;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// A requirement did not hold; carries the violating expression and
    /// the reconstructed branch (and cost details for timed failures)
    #[error("{0}")]
    Violation(Box<CounterexampleReport>),

    /// The requirement uses a construct outside the supported fragment.
    /// Never a pass or a fail; the specification itself is at fault.
    #[error("unsupported requirement construct: {0}")]
    NotSupported(String),

    /// Malformed input structure or an engine bug, e.g. an edge to a
    /// node with no edge-mapping entry or a trail that crosses a
    /// nonexistent edge
    #[error("structural inconsistency: {0}")]
    Inconsistent(String),

    /// Number of parsed requirements does not match the number of
    /// requested requirement sources
    #[error("requirement count mismatch: {expected} source(s) but {actual} requirement(s)")]
    CountMismatch { expected: usize, actual: usize },

    /// Obligation store failure (disk backend I/O or corruption)
    #[error("obligation store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A record read back from disk did not parse
    #[error("corrupt store record at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// A key already resolved to a terminal status was resolved again
    /// with a different one; resolving once per key is an engine
    /// invariant
    #[error("obligation {key} re-resolved from {previous} to {attempted}")]
    DoubleResolve {
        key: String,
        previous: String,
        attempted: String,
    },

    /// `resolve` was called for a key never inserted as pending
    #[error("obligation {key} resolved without a pending entry")]
    MissingPending { key: String },
}
