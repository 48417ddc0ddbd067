use crate::{phase::Phase, value::Category};
use thiserror::Error;

/// Raised while configuring or resolving a handler.
///
/// Never raised mid-stream for a well-behaved host: once
/// [`configure`](crate::AggregationEvaluator::configure) succeeds every input shape
/// has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Wrong number of arguments for the phase
    #[error("{handler} expects {expected} argument(s) in {phase:?} but got {actual}")]
    Arity {
        /// Handler name
        handler: &'static str,
        /// Phase being configured
        phase: Phase,
        /// Accepted argument count(s)
        expected: &'static str,
        /// Argument count passed
        actual: usize,
    },
    /// An argument has the wrong shape
    #[error("{handler} argument {position} must be {expected} but {actual} was passed")]
    Category {
        /// Handler name
        handler: &'static str,
        /// 1-based argument position
        position: usize,
        /// Accepted shape
        expected: &'static str,
        /// Shape passed
        actual: String,
    },
    /// No handler is registered under the name
    #[error("unknown aggregation handler `{0}`")]
    UnknownHandler(String),
    /// A row or frame reached an evaluator before `configure`
    #[error("evaluator used before configure")]
    Unconfigured,
    /// An accumulator created by a different handler was passed in
    #[error("{handler} was handed an accumulator of another handler")]
    AccumulatorMismatch {
        /// Handler name
        handler: &'static str,
    },
}

/// A paired frame could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameEncodeError {
    /// A sub-buffer does not fit the signed 32-bit length prefix
    #[error("sub-buffer of {0} bytes exceeds the frame length prefix")]
    Oversized(usize),
}

/// A partial frame could not be turned back into an accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameDecodeError {
    /// Frame shorter than its fixed header
    #[error("frame of {len} bytes is shorter than the {min} byte header")]
    Truncated {
        /// Bytes received
        len: usize,
        /// Header size
        min: usize,
    },
    /// A length prefix is negative
    #[error("frame declares negative sub-buffer length {0}")]
    NegativeLength(i32),
    /// Header and body disagree
    #[error("frame is {actual} bytes but its header declares {expected}")]
    LengthMismatch {
        /// Size declared by the header
        expected: u64,
        /// Bytes received
        actual: usize,
    },
    /// Exactly one side of a paired frame is empty
    #[error("paired frame carries only one side of the signature pair")]
    HalfPair,
    /// The payload could not be deserialized
    #[error("malformed payload: {0}")]
    Payload(String),
    /// The payload deserialized but breaks a structural invariant
    #[error("corrupt {sketch}: {reason}")]
    Corrupt {
        /// Summary type
        sketch: &'static str,
        /// Broken invariant
        reason: &'static str,
    },
    /// Two summaries with different parameters cannot be merged
    #[error("cannot merge {sketch} configured with {left} into one configured with {right}")]
    Incompatible {
        /// Summary type
        sketch: &'static str,
        /// Parameters of the incoming summary
        left: String,
        /// Parameters of the target summary
        right: String,
    },
}

impl From<postcard::Error> for FrameDecodeError {
    fn from(err: postcard::Error) -> Self {
        FrameDecodeError::Payload(err.to_string())
    }
}

/// An auxiliary row parameter cannot configure the accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// Value outside the supported range
    #[error("parameter `{name}` must be {expected} but was {actual}")]
    OutOfRange {
        /// Parameter name
        name: &'static str,
        /// Supported range
        expected: &'static str,
        /// Value passed
        actual: String,
    },
    /// Value differs from the one the accumulator was initialized with
    #[error("parameter `{name}` changed from {recorded} to {actual} within one group")]
    Changed {
        /// Parameter name
        name: &'static str,
        /// Recorded value
        recorded: String,
        /// Value passed
        actual: String,
    },
    /// Value of the wrong category
    #[error("parameter `{name}` expects a {expected} value but got {actual}")]
    Type {
        /// Parameter name
        name: &'static str,
        /// Declared category
        expected: Category,
        /// Category passed
        actual: Category,
    },
}

/// Errors surfaced by the row and merge steps of an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// See [`ConfigurationError`]
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// See [`FrameDecodeError`]
    #[error(transparent)]
    Frame(#[from] FrameDecodeError),
    /// See [`ParameterError`]
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}
