use crate::{
    conf::{HandlerConf, ParameterPolicy},
    error::{AggregateError, ConfigurationError, FrameDecodeError, ParameterError},
    evaluator::{
        self, Accumulator, AggregationEvaluator, InputMode, Setup, check_arity, configure_merge,
        configured, frame_of,
    },
    phase::{Phase, Shape},
    sketch::{Item, Sketch},
    value::{Category, Value},
};
use core::{fmt::Debug, marker::PhantomData};
use log::{debug, trace, warn};

#[cfg(feature = "profiler")]
use super::stats::Stats;
#[cfg(feature = "profiler")]
use partagg_stats::profile_scope;

/// Binds a [`Sketch`] to a registered handler
///
/// Implementors describe the handler's arguments and final result; the protocol itself
/// lives in [`SketchEvaluator`].
pub trait SketchHandler: Debug + Send + 'static {
    /// Registered function name
    const NAME: &'static str;
    /// Accepted argument counts in raw phases
    const ARITY: (usize, usize);
    /// Accepted argument counts, as printed in errors
    const ARITY_TEXT: &'static str;
    /// Names of the auxiliary parameters, as printed in errors
    const PARAMETERS: &'static str;

    /// Summary held by the accumulator
    type Sketch: Sketch + Send;
    /// Final result
    type Output: Debug;

    /// Resolves the sketch configuration from the auxiliary row parameters
    ///
    /// `params` holds every value after the item; absent values fall back to `conf`.
    fn parameters(
        conf: &HandlerConf,
        params: &[Option<Value>],
    ) -> Result<<Self::Sketch as Sketch>::Config, ParameterError>;

    /// Shape of the final result
    fn output_shape() -> Shape;

    /// Turns a non-empty sketch into the final result
    fn finish(sketch: &Self::Sketch) -> Self::Output;
}

/// Accumulator holding an optional sketch
///
/// The sketch is created by the first row or non-empty frame, so its configuration
/// can come from the data. Frames holding an empty sketch are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchAccumulator<S> {
    sketch: Option<S>,
}

impl<S> Default for SketchAccumulator<S> {
    fn default() -> Self {
        Self { sketch: None }
    }
}

impl<S: Sketch> SketchAccumulator<S> {
    /// Returns the sketch once initialized
    pub fn sketch(&self) -> Option<&S> {
        self.sketch.as_ref()
    }

    fn absorb(&mut self, peer: S) -> Result<(), FrameDecodeError> {
        if peer.is_empty() {
            trace!("{} skipping an empty peer summary", S::NAME);
            return Ok(());
        }
        match &mut self.sketch {
            Some(sketch) => sketch.merge(&peer),
            None => {
                debug!("initialized {} from a peer summary", S::NAME);
                self.sketch = Some(peer);
                Ok(())
            }
        }
    }

    pub(crate) fn frame(&self) -> Vec<u8> {
        self.sketch.as_ref().map(Sketch::to_bytes).unwrap_or_default()
    }
}

impl<S: Sketch + Send> Accumulator for SketchAccumulator<S> {
    fn is_empty(&self) -> bool {
        self.sketch.as_ref().is_none_or(Sketch::is_empty)
    }
}

/// Evaluator driving a single mergeable sketch through the four phases
///
/// An uninitialized accumulator emits a zero-length frame, which merges as a no-op.
#[derive(Debug)]
pub struct SketchEvaluator<H: SketchHandler> {
    conf: HandlerConf,
    setup: Option<Setup>,
    #[cfg(feature = "profiler")]
    stats: Stats,
    _handler: PhantomData<H>,
}

impl<H: SketchHandler> SketchEvaluator<H> {
    /// Creates an unconfigured evaluator
    pub fn new(conf: HandlerConf) -> Self {
        Self {
            conf,
            setup: None,
            #[cfg(feature = "profiler")]
            stats: Stats::default(),
            _handler: PhantomData,
        }
    }

    /// Returns the latency stats of this evaluator
    #[cfg(feature = "profiler")]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    fn merge_bytes(
        &self,
        acc: &mut SketchAccumulator<H::Sketch>,
        bytes: &[u8],
    ) -> Result<(), FrameDecodeError> {
        if bytes.is_empty() {
            return Ok(());
        }
        trace!("{} merging {} byte frame", H::NAME, bytes.len());
        let peer = H::Sketch::from_bytes(bytes)?;
        acc.absorb(peer)
    }

    fn update(
        &self,
        acc: &mut SketchAccumulator<H::Sketch>,
        item: &Value,
        params: &[Option<Value>],
    ) -> Result<(), ParameterError> {
        match &mut acc.sketch {
            Some(sketch) if params.iter().all(Option::is_none) => {
                sketch.update(Item::from_value(item));
            }
            Some(sketch) => {
                let recorded = sketch.config();
                match (H::parameters(&self.conf, params), self.conf.parameter_policy()) {
                    (Ok(config), _) if config == recorded => {}
                    (Ok(config), ParameterPolicy::Reject) => {
                        return Err(ParameterError::Changed {
                            name: H::PARAMETERS,
                            recorded: format!("{recorded:?}"),
                            actual: format!("{config:?}"),
                        });
                    }
                    (Err(err), ParameterPolicy::Reject) => return Err(err),
                    (Ok(config), ParameterPolicy::Ignore) => {
                        warn!(
                            "{} ignoring {} {:?}, accumulator uses {:?}",
                            H::NAME,
                            H::PARAMETERS,
                            config,
                            recorded
                        );
                    }
                    (Err(err), ParameterPolicy::Ignore) => {
                        warn!("{} ignoring parameter: {err}", H::NAME);
                    }
                }
                sketch.update(Item::from_value(item));
            }
            None => {
                let config = H::parameters(&self.conf, params)?;
                debug!("initialized {} with {:?}", H::NAME, config);
                let mut sketch = H::Sketch::with_config(config);
                sketch.update(Item::from_value(item));
                acc.sketch = Some(sketch);
            }
        }
        Ok(())
    }
}

impl<H: SketchHandler> AggregationEvaluator for SketchEvaluator<H> {
    const NAME: &'static str = H::NAME;
    type Accumulator = SketchAccumulator<H::Sketch>;
    type Output = H::Output;

    fn configure(&mut self, phase: Phase, inputs: &[Shape]) -> Result<Shape, ConfigurationError> {
        let setup = if phase.consumes_raw() {
            let (min, max) = H::ARITY;
            check_arity(H::NAME, phase, inputs, min, max, H::ARITY_TEXT)?;
            let category = evaluator::primitive(H::NAME, 1, &inputs[0])?;
            for (i, shape) in inputs.iter().enumerate().skip(1) {
                evaluator::expect_category(
                    H::NAME,
                    i + 1,
                    shape,
                    Category::Integral,
                    "an integral parameter",
                )?;
            }
            let mode = if category == Category::Binary {
                InputMode::Encoded
            } else {
                InputMode::Items
            };
            Setup { phase, mode }
        } else {
            configure_merge(H::NAME, phase, inputs)?
        };
        debug!("configured {} for {:?} with {:?} input", H::NAME, phase, setup.mode);
        self.setup = Some(setup);
        Ok(if phase.emits_frame() {
            Shape::BINARY
        } else {
            H::output_shape()
        })
    }

    fn phase(&self) -> Option<Phase> {
        self.setup.map(|s| s.phase)
    }

    fn new_accumulator(&self) -> Self::Accumulator {
        SketchAccumulator::default()
    }

    fn consume_input(
        &self,
        acc: &mut Self::Accumulator,
        values: &[Option<Value>],
    ) -> Result<(), AggregateError> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.consume);

        let setup = configured(self.setup)?;
        match setup.mode {
            InputMode::Frames => self.merge_frame(acc, frame_of(values)?),
            InputMode::Encoded => match frame_of(values)? {
                Some(bytes) => Ok(self.merge_bytes(acc, bytes)?),
                None => Ok(()),
            },
            InputMode::Items => match values.split_first() {
                Some((Some(item), params)) => Ok(self.update(acc, item, params)?),
                _ => Ok(()),
            },
        }
    }

    fn merge_frame(
        &self,
        acc: &mut Self::Accumulator,
        frame: Option<&[u8]>,
    ) -> Result<(), AggregateError> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.merge);

        match frame {
            Some(bytes) => Ok(self.merge_bytes(acc, bytes)?),
            None => Ok(()),
        }
    }

    fn emit_frame(&self, acc: &Self::Accumulator) -> Vec<u8> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.emit);

        let frame = acc.frame();
        trace!("{} emitting {} byte frame", H::NAME, frame.len());
        frame
    }

    fn finalize(&self, acc: &Self::Accumulator) -> Option<Self::Output> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.finalize);

        acc.sketch.as_ref().filter(|s| !s.is_empty()).map(H::finish)
    }

    fn reset(&self, acc: &mut Self::Accumulator) {
        acc.sketch = None;
    }
}

/// Reads an optional integral parameter at `index`
pub(crate) fn integral(
    name: &'static str,
    params: &[Option<Value>],
    index: usize,
) -> Result<Option<i64>, ParameterError> {
    match params.get(index) {
        None | Some(None) => Ok(None),
        Some(Some(Value::Int(v))) => Ok(Some(*v)),
        Some(Some(other)) => Err(ParameterError::Type {
            name,
            expected: Category::Integral,
            actual: other.category(),
        }),
    }
}
