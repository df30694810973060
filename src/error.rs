//! Error types for topology construction and trace reading.

use thiserror::Error;

/// Errors raised while building a benchmark hierarchy or reading an event trace.
///
/// None of these are retried. Precondition violations inside a transition are
/// not represented here: they panic, since they indicate a broken kernel
/// integration rather than bad user input.
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("malformed trace at line {line}: {reason}")]
    MalformedTrace { line: usize, reason: String },

    #[error("invalid coupling in {model}: {reason}")]
    InvalidCoupling { model: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TopologyError {
    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        TopologyError::InvalidParameter(msg.into())
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        TopologyError::MalformedTrace {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn coupling(model: &str, reason: impl Into<String>) -> Self {
        TopologyError::InvalidCoupling {
            model: model.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;
