//! Registered aggregation handlers and the [`Handler`] enum dispatching over them.

use crate::{
    conf::HandlerConf,
    error::{AggregateError, ConfigurationError},
    evaluator::{Accumulator, AggregationEvaluator},
    multiset::MultisetTable,
    phase::{Phase, Shape},
    sketch::{CountSketch, MinHashSignature, ModHashSignature},
    value::Value,
};
use core::{fmt, str::FromStr};
use log::warn;

mod distinct;
mod segment;
mod signature;
mod similarity;
mod single;
#[cfg(feature = "profiler")]
mod stats;

pub use distinct::{ApproxDistinct, DistinctCount, DistinctSummary};
pub use segment::{Segment, SegmentAccumulator};
pub use signature::{MAX_MINHASH_BUCKETS, MinHash, MinHashSet, ModHash, ModHashSet};
pub use similarity::{SignaturePair, Similarity};
pub use single::{SketchAccumulator, SketchEvaluator, SketchHandler};
#[cfg(feature = "profiler")]
pub use stats::Stats;

/// Names a registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// `approx_distinct(x)`
    ApproxDistinct,
    /// `minhash(x [, k [, n]])`
    MinHash,
    /// `modhash(x [, k])`
    ModHash,
    /// `segment(key, member)`
    Segment,
    /// `similarity(x, y)`
    Similarity,
}

impl HandlerKind {
    /// Every registered handler
    pub const ALL: [HandlerKind; 5] = [
        HandlerKind::ApproxDistinct,
        HandlerKind::MinHash,
        HandlerKind::ModHash,
        HandlerKind::Segment,
        HandlerKind::Similarity,
    ];

    /// Registered function name
    pub const fn name(self) -> &'static str {
        match self {
            HandlerKind::ApproxDistinct => DistinctCount::NAME,
            HandlerKind::MinHash => MinHashSet::NAME,
            HandlerKind::ModHash => ModHashSet::NAME,
            HandlerKind::Segment => <Segment as AggregationEvaluator>::NAME,
            HandlerKind::Similarity => <Similarity as AggregationEvaluator>::NAME,
        }
    }

    /// Usage text shown by the host
    pub const fn description(self) -> &'static str {
        match self {
            HandlerKind::ApproxDistinct => {
                "approx_distinct(x) - x is either an item to be distinct counted or an encoded \
                 sketch, returns a struct (cardinality, error, sketch)"
            }
            HandlerKind::MinHash => {
                "minhash(x [, k [, n]]) - computes the minhash signature of a set with k buckets \
                 over a universe of size n (0 for the full hash space), returns a binary"
            }
            HandlerKind::ModHash => {
                "modhash(x [, k]) - computes the signature of a set sampled by the modulus 2^k, \
                 returns a binary"
            }
            HandlerKind::Segment => {
                "segment(key, member) - collects members into a map of the form \
                 [key, multiset(members)]"
            }
            HandlerKind::Similarity => {
                "similarity(x, y) - estimates the Jaccard index of two sets from their minhash \
                 signatures, returns a double"
            }
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HandlerKind {
    type Err = ConfigurationError;

    /// Resolves a registered function name, ignoring ASCII case
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        // `overlap` is the name the similarity handler was historically called by
        if name.eq_ignore_ascii_case("overlap") {
            return Ok(HandlerKind::Similarity);
        }
        HandlerKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigurationError::UnknownHandler(name.to_owned()))
    }
}

/// Accumulator of any [`Handler`]
#[derive(Debug, Clone, PartialEq)]
pub enum AnyAccumulator {
    /// State of [`HandlerKind::ApproxDistinct`]
    Distinct(SketchAccumulator<CountSketch>),
    /// State of [`HandlerKind::MinHash`]
    MinHash(SketchAccumulator<MinHashSignature>),
    /// State of [`HandlerKind::ModHash`]
    ModHash(SketchAccumulator<ModHashSignature>),
    /// State of [`HandlerKind::Segment`]
    Segment(SegmentAccumulator),
    /// State of [`HandlerKind::Similarity`]
    Similarity(SignaturePair),
}

impl AnyAccumulator {
    fn frame(&self) -> Vec<u8> {
        match self {
            AnyAccumulator::Distinct(acc) => acc.frame(),
            AnyAccumulator::MinHash(acc) => acc.frame(),
            AnyAccumulator::ModHash(acc) => acc.frame(),
            AnyAccumulator::Segment(acc) => acc.frame(),
            AnyAccumulator::Similarity(acc) => acc.frame(),
        }
    }
}

impl Accumulator for AnyAccumulator {
    fn is_empty(&self) -> bool {
        match self {
            AnyAccumulator::Distinct(acc) => acc.is_empty(),
            AnyAccumulator::MinHash(acc) => acc.is_empty(),
            AnyAccumulator::ModHash(acc) => acc.is_empty(),
            AnyAccumulator::Segment(acc) => acc.is_empty(),
            AnyAccumulator::Similarity(acc) => acc.is_empty(),
        }
    }
}

/// Final result of any [`Handler`]
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Result of [`HandlerKind::ApproxDistinct`]
    Distinct(DistinctSummary),
    /// Encoded signature of [`HandlerKind::MinHash`] and [`HandlerKind::ModHash`]
    Binary(Vec<u8>),
    /// Histogram of [`HandlerKind::Segment`]
    Segment(MultisetTable),
    /// Jaccard estimate of [`HandlerKind::Similarity`]
    Double(f64),
}

/// One of the registered handlers, chosen by name at configuration time
///
/// # Example
///
/// ```
/// use partagg::{AggregationEvaluator, Category, Handler, HandlerConf, Phase, Shape, Value};
/// use partagg::handler::Output;
///
/// let mut handler = Handler::resolve("segment", HandlerConf::default()).unwrap();
/// let inputs = [Shape::Primitive(Category::Text), Shape::Primitive(Category::Integral)];
/// handler.configure(Phase::Complete, &inputs).unwrap();
///
/// let mut acc = handler.new_accumulator();
/// handler.consume_input(&mut acc, &[Some(Value::from("foo")), Some(Value::Int(1))]).unwrap();
/// let Some(Output::Segment(table)) = handler.finalize(&acc) else { unreachable!() };
/// assert_eq!(table.count(&Value::from("foo"), &Value::Int(1)), 1);
/// ```
#[derive(Debug)]
pub enum Handler {
    /// `approx_distinct`
    ApproxDistinct(ApproxDistinct),
    /// `minhash`
    MinHash(MinHash),
    /// `modhash`
    ModHash(ModHash),
    /// `segment`
    Segment(Segment),
    /// `similarity`
    Similarity(Similarity),
}

impl Handler {
    /// Creates an unconfigured handler of the given kind
    pub fn new(kind: HandlerKind, conf: HandlerConf) -> Self {
        match kind {
            HandlerKind::ApproxDistinct => Handler::ApproxDistinct(ApproxDistinct::new(conf)),
            HandlerKind::MinHash => Handler::MinHash(MinHash::new(conf)),
            HandlerKind::ModHash => Handler::ModHash(ModHash::new(conf)),
            HandlerKind::Segment => Handler::Segment(Segment::new(conf)),
            HandlerKind::Similarity => Handler::Similarity(Similarity::new(conf)),
        }
    }

    /// Creates an unconfigured handler from its registered function name
    pub fn resolve(name: &str, conf: HandlerConf) -> Result<Self, ConfigurationError> {
        Ok(Self::new(name.parse()?, conf))
    }

    /// Returns the kind of this handler
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::ApproxDistinct(_) => HandlerKind::ApproxDistinct,
            Handler::MinHash(_) => HandlerKind::MinHash,
            Handler::ModHash(_) => HandlerKind::ModHash,
            Handler::Segment(_) => HandlerKind::Segment,
            Handler::Similarity(_) => HandlerKind::Similarity,
        }
    }

    fn mismatch(&self) -> AggregateError {
        AggregateError::Configuration(ConfigurationError::AccumulatorMismatch {
            handler: self.kind().name(),
        })
    }

    /// Returns the latency stats of the underlying evaluator
    #[cfg(feature = "profiler")]
    pub fn stats(&self) -> &Stats {
        match self {
            Handler::ApproxDistinct(e) => e.stats(),
            Handler::MinHash(e) => e.stats(),
            Handler::ModHash(e) => e.stats(),
            Handler::Segment(e) => e.stats(),
            Handler::Similarity(e) => e.stats(),
        }
    }

    /// Prints the latency stats of the underlying evaluator
    #[cfg(feature = "profiler")]
    pub fn print_stats(&self) {
        self.stats().print(self.kind().name());
    }
}

/// An accumulator created by another kind of handler is never touched: `consume_input`
/// and `merge_frame` fail with [`ConfigurationError::AccumulatorMismatch`]. `emit_frame`
/// and `finalize` cannot fail, so they log a warning instead; the frame is the one the
/// accumulator's own handler would emit and the result is `None`.
impl AggregationEvaluator for Handler {
    const NAME: &'static str = "handler";
    type Accumulator = AnyAccumulator;
    type Output = Output;

    fn configure(&mut self, phase: Phase, inputs: &[Shape]) -> Result<Shape, ConfigurationError> {
        match self {
            Handler::ApproxDistinct(e) => e.configure(phase, inputs),
            Handler::MinHash(e) => e.configure(phase, inputs),
            Handler::ModHash(e) => e.configure(phase, inputs),
            Handler::Segment(e) => e.configure(phase, inputs),
            Handler::Similarity(e) => e.configure(phase, inputs),
        }
    }

    fn phase(&self) -> Option<Phase> {
        match self {
            Handler::ApproxDistinct(e) => e.phase(),
            Handler::MinHash(e) => e.phase(),
            Handler::ModHash(e) => e.phase(),
            Handler::Segment(e) => e.phase(),
            Handler::Similarity(e) => e.phase(),
        }
    }

    fn new_accumulator(&self) -> AnyAccumulator {
        match self {
            Handler::ApproxDistinct(e) => AnyAccumulator::Distinct(e.new_accumulator()),
            Handler::MinHash(e) => AnyAccumulator::MinHash(e.new_accumulator()),
            Handler::ModHash(e) => AnyAccumulator::ModHash(e.new_accumulator()),
            Handler::Segment(e) => AnyAccumulator::Segment(e.new_accumulator()),
            Handler::Similarity(e) => AnyAccumulator::Similarity(e.new_accumulator()),
        }
    }

    fn consume_input(
        &self,
        acc: &mut AnyAccumulator,
        values: &[Option<Value>],
    ) -> Result<(), AggregateError> {
        match (self, acc) {
            (Handler::ApproxDistinct(e), AnyAccumulator::Distinct(a)) => e.consume_input(a, values),
            (Handler::MinHash(e), AnyAccumulator::MinHash(a)) => e.consume_input(a, values),
            (Handler::ModHash(e), AnyAccumulator::ModHash(a)) => e.consume_input(a, values),
            (Handler::Segment(e), AnyAccumulator::Segment(a)) => e.consume_input(a, values),
            (Handler::Similarity(e), AnyAccumulator::Similarity(a)) => e.consume_input(a, values),
            _ => Err(self.mismatch()),
        }
    }

    fn merge_frame(
        &self,
        acc: &mut AnyAccumulator,
        frame: Option<&[u8]>,
    ) -> Result<(), AggregateError> {
        match (self, acc) {
            (Handler::ApproxDistinct(e), AnyAccumulator::Distinct(a)) => e.merge_frame(a, frame),
            (Handler::MinHash(e), AnyAccumulator::MinHash(a)) => e.merge_frame(a, frame),
            (Handler::ModHash(e), AnyAccumulator::ModHash(a)) => e.merge_frame(a, frame),
            (Handler::Segment(e), AnyAccumulator::Segment(a)) => e.merge_frame(a, frame),
            (Handler::Similarity(e), AnyAccumulator::Similarity(a)) => e.merge_frame(a, frame),
            _ => Err(self.mismatch()),
        }
    }

    fn emit_frame(&self, acc: &AnyAccumulator) -> Vec<u8> {
        match (self, acc) {
            (Handler::ApproxDistinct(e), AnyAccumulator::Distinct(a)) => e.emit_frame(a),
            (Handler::MinHash(e), AnyAccumulator::MinHash(a)) => e.emit_frame(a),
            (Handler::ModHash(e), AnyAccumulator::ModHash(a)) => e.emit_frame(a),
            (Handler::Segment(e), AnyAccumulator::Segment(a)) => e.emit_frame(a),
            (Handler::Similarity(e), AnyAccumulator::Similarity(a)) => e.emit_frame(a),
            // a frame only depends on the accumulator
            (_, acc) => {
                warn!("{} emitting a frame for a foreign accumulator", self.kind());
                acc.frame()
            }
        }
    }

    fn finalize(&self, acc: &AnyAccumulator) -> Option<Output> {
        match (self, acc) {
            (Handler::ApproxDistinct(e), AnyAccumulator::Distinct(a)) => {
                e.finalize(a).map(Output::Distinct)
            }
            (Handler::MinHash(e), AnyAccumulator::MinHash(a)) => e.finalize(a).map(Output::Binary),
            (Handler::ModHash(e), AnyAccumulator::ModHash(a)) => e.finalize(a).map(Output::Binary),
            (Handler::Segment(e), AnyAccumulator::Segment(a)) => e.finalize(a).map(Output::Segment),
            (Handler::Similarity(e), AnyAccumulator::Similarity(a)) => {
                e.finalize(a).map(Output::Double)
            }
            _ => {
                warn!("{} asked to finalize a foreign accumulator", self.kind());
                None
            }
        }
    }

    fn reset(&self, acc: &mut AnyAccumulator) {
        *acc = self.new_accumulator();
    }
}
