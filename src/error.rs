//! Error types shared by every module of the crate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the correlation and significance pipeline.
///
/// Cancellation is not an error: a cancelled computation is reported
/// through [`crate::monitor::Outcome::Cancelled`], not as a failure.
#[derive(Error, Debug)]
pub enum Error {
    /// A special function was evaluated outside its domain.
    #[error("numeric domain violation in {function}: {reason}")]
    Domain {
        function: &'static str,
        reason: String,
    },

    /// Configuration rejected before any computation started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sequence unusable for the requested operation (empty, NaN samples).
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    /// Sequences of one experiment do not share the same length.
    #[error("sequence '{label}' has {found} samples, expected {expected}")]
    LengthMismatch {
        label: String,
        expected: usize,
        found: usize,
    },

    /// Node labels must be non-empty and alphanumeric.
    #[error("invalid node label '{0}': labels must be non-empty and alphanumeric")]
    InvalidLabel(String),

    /// Node labels must be unique.
    #[error("duplicate node label '{0}'")]
    DuplicateLabel(String),

    /// A label that is not among the nodes of the experiment.
    #[error("unknown node label '{0}'")]
    UnknownLabel(String),

    /// A node pair was requested that the table does not hold.
    #[error("no entry for node pair ({0}, {1})")]
    UnknownPair(String, String),

    /// Grids or curves of inconsistent shape were combined.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Failure of a caller-supplied output sink.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn domain(function: &'static str, reason: impl Into<String>) -> Self {
        Error::Domain {
            function,
            reason: reason.into(),
        }
    }
}
