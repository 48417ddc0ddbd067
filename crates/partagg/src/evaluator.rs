use crate::{
    error::{AggregateError, ConfigurationError},
    phase::{Phase, Shape},
    value::{Category, Value},
};
use core::fmt::Debug;

/// Per-group state owned by exactly one evaluator instance
pub trait Accumulator: Debug + Send {
    /// Returns `true` while the accumulator holds nothing to report
    fn is_empty(&self) -> bool;
}

/// Four-phase aggregation interface every handler implements
///
/// The host creates one evaluator per aggregation per phase, calls
/// [`configure`](Self::configure) once, then drives one accumulator per group:
///
/// - [`Phase::Partial`]: `consume_input`* → `emit_frame`
/// - [`Phase::PartialMerge`]: `merge_frame`* → `emit_frame`
/// - [`Phase::Final`]: `merge_frame`* → `finalize`
/// - [`Phase::Complete`]: `consume_input`* → `finalize`
///
/// # Example
///
/// ```
/// use partagg::{AggregationEvaluator, HandlerConf, Phase, Shape, Value, Category};
/// use partagg::handler::ApproxDistinct;
///
/// let mut partial = ApproxDistinct::new(HandlerConf::default());
/// partial.configure(Phase::Partial, &[Shape::Primitive(Category::Text)]).unwrap();
/// let mut acc = partial.new_accumulator();
/// for s in ["A", "B", "C", "A"] {
///     partial.consume_input(&mut acc, &[Some(Value::from(s))]).unwrap();
/// }
/// let frame = partial.emit_frame(&acc);
///
/// let mut last = ApproxDistinct::new(HandlerConf::default());
/// last.configure(Phase::Final, &[Shape::BINARY]).unwrap();
/// let mut merged = last.new_accumulator();
/// last.merge_frame(&mut merged, Some(frame.as_slice())).unwrap();
/// assert_eq!(last.finalize(&merged).unwrap().cardinality, 3.0);
/// ```
pub trait AggregationEvaluator: Debug {
    /// Registered function name
    const NAME: &'static str;

    /// Per-group state
    type Accumulator: Accumulator;

    /// Final result of [`Phase::Final`] and [`Phase::Complete`]
    type Output: Debug;

    /// Validates the input shapes for `phase` and returns the shape this instance emits
    fn configure(&mut self, phase: Phase, inputs: &[Shape]) -> Result<Shape, ConfigurationError>;

    /// Returns the configured phase
    fn phase(&self) -> Option<Phase>;

    /// Returns a fresh empty accumulator that shares nothing with earlier ones
    fn new_accumulator(&self) -> Self::Accumulator;

    /// Folds one row into `acc`
    ///
    /// A row missing any required value is a no-op. In merge phases the single value
    /// is treated as a partial frame and handed to [`merge_frame`](Self::merge_frame).
    fn consume_input(
        &self,
        acc: &mut Self::Accumulator,
        values: &[Option<Value>],
    ) -> Result<(), AggregateError>;

    /// Decodes a partial frame and folds it into `acc`
    ///
    /// An absent frame is a no-op. On error `acc` is left untouched.
    fn merge_frame(
        &self,
        acc: &mut Self::Accumulator,
        frame: Option<&[u8]>,
    ) -> Result<(), AggregateError>;

    /// Encodes the current state of `acc` without modifying it
    fn emit_frame(&self, acc: &Self::Accumulator) -> Vec<u8>;

    /// Encodes the current state of `acc` into a caller supplied buffer
    fn emit_frame_into(&self, acc: &Self::Accumulator, out: &mut Vec<u8>) {
        out.clear();
        out.extend_from_slice(&self.emit_frame(acc));
    }

    /// Produces the final result, `None` if the handler has nothing to report
    fn finalize(&self, acc: &Self::Accumulator) -> Option<Self::Output>;

    /// Returns `acc` to the state [`new_accumulator`](Self::new_accumulator) produces,
    /// so the next input or frame configures it again
    fn reset(&self, acc: &mut Self::Accumulator);
}

/// How an evaluator interprets the values handed to `consume_input`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputMode {
    /// Raw items folded with `update`
    Items,
    /// Already encoded summaries folded with `merge`
    Encoded,
    /// Partial frames (merge phases)
    Frames,
}

/// Phase and input interpretation recorded by `configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Setup {
    pub phase: Phase,
    pub mode: InputMode,
}

pub(crate) fn configured(setup: Option<Setup>) -> Result<Setup, AggregateError> {
    setup.ok_or(AggregateError::Configuration(ConfigurationError::Unconfigured))
}

pub(crate) fn check_arity(
    handler: &'static str,
    phase: Phase,
    inputs: &[Shape],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), ConfigurationError> {
    if inputs.len() < min || inputs.len() > max {
        return Err(ConfigurationError::Arity {
            handler,
            phase,
            expected,
            actual: inputs.len(),
        });
    }
    Ok(())
}

/// Requires a primitive shape and returns its category
pub(crate) fn primitive(
    handler: &'static str,
    position: usize,
    shape: &Shape,
) -> Result<Category, ConfigurationError> {
    shape.category().ok_or_else(|| ConfigurationError::Category {
        handler,
        position,
        expected: "a primitive",
        actual: shape.to_string(),
    })
}

/// Requires a primitive shape of exactly `category`
pub(crate) fn expect_category(
    handler: &'static str,
    position: usize,
    shape: &Shape,
    category: Category,
    expected: &'static str,
) -> Result<(), ConfigurationError> {
    match shape.category() {
        Some(c) if c == category => Ok(()),
        _ => Err(ConfigurationError::Category {
            handler,
            position,
            expected,
            actual: shape.to_string(),
        }),
    }
}

/// Validates the single binary input of a merge phase
pub(crate) fn configure_merge(
    handler: &'static str,
    phase: Phase,
    inputs: &[Shape],
) -> Result<Setup, ConfigurationError> {
    check_arity(handler, phase, inputs, 1, 1, "1")?;
    expect_category(handler, 1, &inputs[0], Category::Binary, "a binary partial frame")?;
    Ok(Setup {
        phase,
        mode: InputMode::Frames,
    })
}

/// Returns the frame carried by a merge-phase row, if any
pub(crate) fn frame_of(values: &[Option<Value>]) -> Result<Option<&[u8]>, AggregateError> {
    match values.first() {
        None | Some(None) => Ok(None),
        Some(Some(Value::Binary(bytes))) => Ok(Some(bytes.as_slice())),
        Some(Some(other)) => Err(AggregateError::Parameter(
            crate::error::ParameterError::Type {
                name: "frame",
                expected: Category::Binary,
                actual: other.category(),
            },
        )),
    }
}
