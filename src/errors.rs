//! Typed error hierarchy for isofilter.
//!
//! Three enums cover the three subsystems:
//! - `FilterError`: anything that aborts a run
//! - `CanonError`: canonicalizer failures such as capacity
//! - `OracleFailure`: the sort subprocess misbehaving
//!
//! There is no per-record recovery: every variant is fatal for the run.

use thiserror::Error;

/// A malformed input graph.
#[derive(Debug, Error)]
#[error("input graph {index}: {message}")]
pub struct DecodeError {
    /// 1-based sequence index of the offending graph (0 for the header).
    pub index: u64,
    pub message: String,
}

impl DecodeError {
    pub fn new(index: u64, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

/// Errors from the canonicalizer.
#[derive(Debug, Error)]
pub enum CanonError {
    #[error("graph has {order} vertices, more than the capacity of {capacity}")]
    GraphTooLarge { order: usize, capacity: usize },

    #[error("invariant '{invariant}' is not available in {mode} mode")]
    UnsupportedInvariant { invariant: String, mode: String },

    #[error("{0}")]
    Unsupported(String),
}

/// Ways the sort subprocess can fail.
#[derive(Debug, Error)]
pub enum OracleFailure {
    #[error("can't start sort process '{command}'")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sort process exited abnormally (code {0})")]
    ExitCode(i32),

    #[error("sort process killed (signal {0})")]
    Signal(i32),

    #[error("sort process returned {received} of {expected} records")]
    PrematureEof { expected: u64, received: u64 },

    #[error("pipe to sort process failed")]
    Pipe(#[source] std::io::Error),
}

/// Errors that abort a filter run.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Canon(#[from] CanonError),

    #[error("input graph {index}")]
    AtGraph {
        index: u64,
        #[source]
        source: CanonError,
    },

    #[error("line protocol violation: {0}")]
    Protocol(String),

    #[error(transparent)]
    OracleFailed(#[from] OracleFailure),

    #[error("run cancelled")]
    Cancelled,

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl FilterError {
    pub fn config(message: impl Into<String>) -> Self {
        FilterError::Configuration(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        FilterError::Io {
            context: context.into(),
            source,
        }
    }

    /// True for `GraphTooLarge`, whether raised eagerly or per graph.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            FilterError::Canon(CanonError::GraphTooLarge { .. })
                | FilterError::AtGraph {
                    source: CanonError::GraphTooLarge { .. },
                    ..
                }
        )
    }
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
