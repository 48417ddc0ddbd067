use crate::{
    conf::HandlerConf,
    error::{AggregateError, ConfigurationError, FrameDecodeError},
    evaluator::{
        Accumulator, AggregationEvaluator, InputMode, Setup, check_arity, configure_merge,
        configured, expect_category, frame_of,
    },
    frame,
    phase::{Phase, Shape},
    sketch::{MinHashSignature, Sketch},
    value::{Category, Value},
};
use log::{debug, trace};

#[cfg(feature = "profiler")]
use super::stats::Stats;
#[cfg(feature = "profiler")]
use partagg_stats::profile_scope;

const NAME: &str = "similarity";

/// Accumulator of `similarity`: the unions of the `x` and `y` signatures
///
/// Both sides share one configuration, taken from the first `x` signature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignaturePair {
    pair: Option<(MinHashSignature, MinHashSignature)>,
}

impl SignaturePair {
    /// Returns the `x` and `y` signatures once initialized
    pub fn signatures(&self) -> Option<(&MinHashSignature, &MinHashSignature)> {
        self.pair.as_ref().map(|(x, y)| (x, y))
    }

    /// Estimated Jaccard similarity of the two sides
    pub fn jaccard(&self) -> Option<f64> {
        self.pair.as_ref().and_then(|(x, y)| x.jaccard(y).ok())
    }

    /// Folds one `x` and one `y` signature in, all or nothing
    fn absorb(
        &mut self,
        x: MinHashSignature,
        y: MinHashSignature,
    ) -> Result<(), FrameDecodeError> {
        x.check_compatible(&y)?;
        match &mut self.pair {
            Some((left, right)) => {
                // both sides share a config, so only the first non-empty side can fail
                left.merge(&x)?;
                right.merge(&y)
            }
            None => {
                debug!("initialized {NAME} with {:?}", x.config());
                self.pair = Some((x, y));
                Ok(())
            }
        }
    }

    fn absorb_bytes(&mut self, x: &[u8], y: &[u8]) -> Result<(), FrameDecodeError> {
        let x = MinHashSignature::from_bytes(x)?;
        let y = MinHashSignature::from_bytes(y)?;
        self.absorb(x, y)
    }

    fn merge_frame(&mut self, bytes: &[u8]) -> Result<(), FrameDecodeError> {
        trace!("{NAME} merging {} byte frame", bytes.len());
        match frame::split(bytes)? {
            ([], []) => Ok(()),
            ([], _) | (_, []) => Err(FrameDecodeError::HalfPair),
            (x, y) => self.absorb_bytes(x, y),
        }
    }

    pub(crate) fn frame_into(&self, out: &mut Vec<u8>) {
        let written = match &self.pair {
            Some((x, y)) => frame::encode_into(&x.to_bytes(), &y.to_bytes(), out),
            None => frame::encode_into(&[], &[], out),
        };
        // decoded signatures hold at most 65536 buckets
        if let Err(err) = written {
            unreachable!("signature pair does not fit a paired frame: {err}");
        }
    }

    pub(crate) fn frame(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.frame_into(&mut out);
        out
    }
}

impl Accumulator for SignaturePair {
    fn is_empty(&self) -> bool {
        self.pair.is_none()
    }
}

/// Estimated Jaccard similarity of two columns of MinHash signatures: `similarity(x, y)`
///
/// Rows carry encoded signatures as produced by `minhash`. Partial frames are paired
/// frames holding the `x` union and the `y` union.
#[derive(Debug)]
pub struct Similarity {
    setup: Option<Setup>,
    #[cfg(feature = "profiler")]
    stats: Stats,
}

impl Similarity {
    /// Creates an unconfigured evaluator
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

impl AggregationEvaluator for Similarity {
    const NAME: &'static str = NAME;
    type Accumulator = SignaturePair;
    type Output = f64;

    fn configure(&mut self, phase: Phase, inputs: &[Shape]) -> Result<Shape, ConfigurationError> {
        let setup = if phase.consumes_raw() {
            check_arity(NAME, phase, inputs, 2, 2, "2")?;
            for (i, shape) in inputs.iter().enumerate() {
                let expected = "a binary minhash signature";
                expect_category(NAME, i + 1, shape, Category::Binary, expected)?;
            }
            Setup {
                phase,
                mode: InputMode::Encoded,
            }
        } else {
            configure_merge(NAME, phase, inputs)?
        };
        debug!("configured {NAME} for {phase:?}");
        self.setup = Some(setup);
        Ok(if phase.emits_frame() {
            Shape::BINARY
        } else {
            Shape::DOUBLE
        })
    }

    fn phase(&self) -> Option<Phase> {
        self.setup.map(|s| s.phase)
    }

    fn new_accumulator(&self) -> SignaturePair {
        SignaturePair::default()
    }

    fn consume_input(
        &self,
        acc: &mut SignaturePair,
        values: &[Option<Value>],
    ) -> Result<(), AggregateError> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.consume);

        match configured(self.setup)?.mode {
            InputMode::Frames => self.merge_frame(acc, frame_of(values)?),
            _ => match values {
                [Some(x), Some(y), ..] => {
                    let (Some(x), Some(y)) = (x.as_bytes(), y.as_bytes()) else {
                        return Ok(());
                    };
                    Ok(acc.absorb_bytes(x, y)?)
                }
                _ => Ok(()),
            },
        }
    }

    fn merge_frame(
        &self,
        acc: &mut SignaturePair,
        frame: Option<&[u8]>,
    ) -> Result<(), AggregateError> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.merge);

        match frame {
            Some(bytes) => Ok(acc.merge_frame(bytes)?),
            None => Ok(()),
        }
    }

    fn emit_frame(&self, acc: &SignaturePair) -> Vec<u8> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.emit);

        acc.frame()
    }

    fn emit_frame_into(&self, acc: &SignaturePair, out: &mut Vec<u8>) {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.emit);

        acc.frame_into(out);
    }

    fn finalize(&self, acc: &SignaturePair) -> Option<f64> {
        #[cfg(feature = "profiler")]
        profile_scope!(&self.stats.finalize);

        acc.jaccard()
    }

    fn reset(&self, acc: &mut SignaturePair) {
        acc.pair = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::{Item, MinHashConfig};

    fn signature(config: MinHashConfig, range: core::ops::Range<i64>) -> Vec<u8> {
        let mut sig = MinHashSignature::with_config(config);
        for i in range {
            sig.update(Item::Int(i));
        }
        sig.to_bytes()
    }

    fn similarity(phase: Phase) -> Similarity {
        let mut evaluator = Similarity::new(HandlerConf::default());
        let inputs = [Shape::BINARY, Shape::BINARY];
        let arity = if phase.consumes_raw() { 2 } else { 1 };
        evaluator.configure(phase, &inputs[..arity]).unwrap();
        evaluator
    }

    fn row(x: Vec<u8>, y: Vec<u8>) -> [Option<Value>; 2] {
        [Some(Value::Binary(x)), Some(Value::Binary(y))]
    }

    #[test]
    fn identical_columns_are_fully_similar() {
        let config = MinHashConfig::new(32, 0);
        let evaluator = similarity(Phase::Complete);
        let mut acc = evaluator.new_accumulator();
        for chunk in 0..4 {
            let range = chunk * 10..(chunk + 1) * 10;
            let row = row(signature(config, range.clone()), signature(config, range));
            evaluator.consume_input(&mut acc, &row).unwrap();
        }
        assert_eq!(evaluator.finalize(&acc), Some(1.0));
    }

    #[test]
    fn empty_pair() {
        let evaluator = similarity(Phase::Partial);
        let acc = evaluator.new_accumulator();
        assert_eq!(evaluator.finalize(&acc), None);
        let frame = evaluator.emit_frame(&acc);
        assert_eq!(frame, [0u8; 8]);

        let last = similarity(Phase::Final);
        let mut merged = last.new_accumulator();
        last.merge_frame(&mut merged, Some(frame.as_slice())).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn half_pair_is_rejected() {
        let last = similarity(Phase::PartialMerge);
        let mut acc = last.new_accumulator();
        let x = signature(MinHashConfig::new(8, 0), 0..4);
        let frame = frame::encode(&x, &[]).unwrap();
        assert_eq!(
            last.merge_frame(&mut acc, Some(frame.as_slice())),
            Err(AggregateError::Frame(FrameDecodeError::HalfPair))
        );
        assert!(acc.is_empty());
    }

    #[test]
    fn mismatched_sides_leave_accumulator_untouched() {
        let evaluator = similarity(Phase::Complete);
        let mut acc = evaluator.new_accumulator();
        let small = MinHashConfig::new(8, 0);
        evaluator
            .consume_input(&mut acc, &row(signature(small, 0..5), signature(small, 3..9)))
            .unwrap();
        let before = acc.clone();

        let large = MinHashConfig::new(16, 0);
        let mixed = row(signature(small, 0..5), signature(large, 0..5));
        assert!(evaluator.consume_input(&mut acc, &mixed).is_err());
        let foreign = row(signature(large, 0..5), signature(large, 0..5));
        assert!(evaluator.consume_input(&mut acc, &foreign).is_err());
        assert_eq!(acc, before);

        evaluator.consume_input(&mut acc, &[None, None]).unwrap();
        assert_eq!(acc, before);
    }

    #[test]
    fn scratch_frame_matches_fresh_frame() {
        let evaluator = similarity(Phase::Partial);
        let mut acc = evaluator.new_accumulator();
        let config = MinHashConfig::new(16, 1 << 16);
        evaluator
            .consume_input(&mut acc, &row(signature(config, 0..50), signature(config, 25..75)))
            .unwrap();
        let mut scratch = vec![1, 2, 3];
        evaluator.emit_frame_into(&acc, &mut scratch);
        assert_eq!(scratch, evaluator.emit_frame(&acc));
    }
}
