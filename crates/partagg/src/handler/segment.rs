use crate::{
    conf::HandlerConf,
    error::{AggregateError, ConfigurationError, FrameDecodeError},
    evaluator::{
        Accumulator, AggregationEvaluator, InputMode, Setup, check_arity, configure_merge,
        configured, frame_of, primitive,
    },
    multiset::MultisetTable,
    phase::{Phase, Shape},
    value::{Category, Value},
};
use log::{debug, trace};

#[cfg(feature = "profiler")]
use super::stats::Stats;
#[cfg(feature = "profiler")]
use partagg_stats::profile_scope;

const NAME: &str = "segment";

/// Accumulator of `segment`: key → member → count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentAccumulator {
    table: MultisetTable,
}

impl SegmentAccumulator {
    /// Returns the accumulated table
    pub fn table(&self) -> &MultisetTable {
        &self.table
    }

    pub(crate) fn frame(&self) -> Vec<u8> {
        self.table.to_bytes()
    }

    fn merge_bytes(&mut self, bytes: &[u8]) -> Result<(), FrameDecodeError> {
        if bytes.is_empty() {
            return Ok(());
        }
        trace!("{NAME} merging {} byte frame", bytes.len());
        let peer = MultisetTable::from_bytes(bytes)?;
        self.table.absorb(peer);
        Ok(())
    }
}

impl Accumulator for SegmentAccumulator {
    fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Groups `member` occurrences by `key`: `segment(key, member)`
///
/// The final result is the full histogram, empty when nothing was observed.
#[derive(Debug)]
pub struct Segment {
    setup: Option<Setup>,
    #[cfg(feature = "profiler")]
    stats: Stats,
}

impl Segment {
    /// Creates an unconfigured evaluator
    ///
    /// `segment` has no tunables; the configuration is accepted for symmetry with
    /// the other handlers.
    pub fn new(_conf: HandlerConf) -> Self {
        Self {
            setup: None,
            #[cfg(feature = "profiler")]
            stats: Stats::default(),
        }
    }

    /// Returns the latency stats of this evaluator
    #[cfg(feature = "profiler")]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

impl AggregationEvaluator for Segment {
    const NAME: &'static str = NAME;
    type Accumulator = SegmentAccumulator;
    type Output = MultisetTable;

    fn configure(&mut self, phase: Phase, inputs: &[Shape]) -> Result<Shape, ConfigurationError> {
        let (setup, output) = if phase.consumes_raw() {
            check_arity(NAME, phase, inputs, 2, 2, "2")?;
            let key = primitive(NAME, 1, &inputs[0])?;
            let member = primitive(NAME, 2, &inputs[1])?;
            let setup = Setup {
                phase,
                mode: InputMode::Items,
            };
            (setup, histogram(Shape::Primitive(key), Shape::Primitive(member)))
        } else {
            let setup = configure_merge(NAME, phase, inputs)?;
            (setup, histogram(Shape::Any, Shape::Any))
        };
        debug!("configured {NAME} for {phase:?}");
        self.setup = Some(setup);
        Ok(if phase.emits_frame() { Shape::BINARY } else { output })
    }

    fn phase(&self) -> Option<Phase> {
        self.setup.map(|s| s.phase)
    }

    fn new_accumulator(&self) -> SegmentAccumulator {
        SegmentAccumulator::default()
    }

    fn consume_input(
        &self,
        acc: &mut SegmentAccumulator,
        values: &[Option<Value>],
    ) -> Result<(), AggregateError> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.consume);

        match configured(self.setup)?.mode {
            InputMode::Items => {
                if let [Some(key), Some(member), ..] = values {
                    acc.table.observe(key, member);
                }
                Ok(())
            }
            _ => self.merge_frame(acc, frame_of(values)?),
        }
    }

    fn merge_frame(
        &self,
        acc: &mut SegmentAccumulator,
        frame: Option<&[u8]>,
    ) -> Result<(), AggregateError> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.merge);

        match frame {
            Some(bytes) => Ok(acc.merge_bytes(bytes)?),
            None => Ok(()),
        }
    }

    fn emit_frame(&self, acc: &SegmentAccumulator) -> Vec<u8> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.emit);

        let frame = acc.frame();
        trace!("{NAME} emitting {} byte frame for {} keys", frame.len(), acc.table.len());
        frame
    }

    fn finalize(&self, acc: &SegmentAccumulator) -> Option<MultisetTable> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.finalize);

        Some(acc.table.clone())
    }

    fn reset(&self, acc: &mut SegmentAccumulator) {
        acc.table = MultisetTable::new();
    }
}

fn histogram(key: Shape, member: Shape) -> Shape {
    Shape::Map(
        Box::new(key),
        Box::new(Shape::Map(
            Box::new(member),
            Box::new(Shape::Primitive(Category::Integral)),
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(phase: Phase, inputs: &[Shape]) -> Segment {
        let mut evaluator = Segment::new(HandlerConf::default());
        evaluator.configure(phase, inputs).unwrap();
        evaluator
    }

    const ROW: [Shape; 2] = [
        Shape::Primitive(Category::Text),
        Shape::Primitive(Category::Integral),
    ];

    #[test]
    fn output_shape_follows_inputs() {
        let mut evaluator = Segment::new(HandlerConf::default());
        assert_eq!(
            evaluator.configure(Phase::Complete, &ROW).unwrap().to_string(),
            "map<text,map<integral,integral>>"
        );
        assert_eq!(evaluator.configure(Phase::Partial, &ROW), Ok(Shape::BINARY));
        assert_eq!(
            evaluator.configure(Phase::Final, &[Shape::BINARY]).unwrap().to_string(),
            "map<any,map<any,integral>>"
        );
        assert!(matches!(
            evaluator.configure(Phase::Complete, &ROW[..1]),
            Err(ConfigurationError::Arity { expected: "2", actual: 1, .. })
        ));
        let nested = [
            Shape::Primitive(Category::Text),
            Shape::Map(Box::new(Shape::BINARY), Box::new(Shape::BINARY)),
        ];
        assert!(matches!(
            evaluator.configure(Phase::Complete, &nested),
            Err(ConfigurationError::Category { position: 2, .. })
        ));
    }

    #[test]
    fn twenty_occurrences_across_two_partials() {
        let partial = segment(Phase::Partial, &ROW);
        let frames: Vec<Vec<u8>> = (0..2)
            .map(|_| {
                let mut acc = partial.new_accumulator();
                for _ in 0..10 {
                    partial
                        .consume_input(&mut acc, &[Some(Value::from("foo")), Some(Value::Int(1))])
                        .unwrap();
                }
                partial.emit_frame(&acc)
            })
            .collect();

        let last = segment(Phase::Final, &[Shape::BINARY]);
        let mut acc = last.new_accumulator();
        for frame in &frames {
            last.consume_input(&mut acc, &[Some(Value::Binary(frame.clone()))]).unwrap();
        }
        let table = last.finalize(&acc).unwrap();
        assert_eq!(table.count(&Value::from("foo"), &Value::Int(1)), 20);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn null_key_or_member_is_skipped() {
        let evaluator = segment(Phase::Complete, &ROW);
        let mut acc = evaluator.new_accumulator();
        evaluator.consume_input(&mut acc, &[None, Some(Value::Int(1))]).unwrap();
        evaluator.consume_input(&mut acc, &[Some(Value::from("k")), None]).unwrap();
        assert!(acc.is_empty());
        assert_eq!(evaluator.finalize(&acc), Some(MultisetTable::new()));
    }

    #[test]
    fn corrupt_frame_leaves_table_untouched() {
        let evaluator = segment(Phase::PartialMerge, &[Shape::BINARY]);
        let mut acc = evaluator.new_accumulator();
        let mut other = SegmentAccumulator::default();
        other.table.observe(&Value::Int(1), &Value::Int(2));
        evaluator.merge_frame(&mut acc, Some(other.frame().as_slice())).unwrap();
        let before = acc.clone();

        let mut frame = other.frame();
        frame.push(0);
        assert!(evaluator.merge_frame(&mut acc, Some(frame.as_slice())).is_err());
        assert!(evaluator.merge_frame(&mut acc, Some(&[0xffu8; 3][..])).is_err());
        assert_eq!(acc, before);

        evaluator.reset(&mut acc);
        assert!(acc.is_empty());
    }
}
