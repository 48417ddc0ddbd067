use super::single::{SketchEvaluator, SketchHandler, integral};
use crate::{
    conf::HandlerConf,
    error::ParameterError,
    phase::Shape,
    sketch::{
        MinHashConfig, MinHashSignature, ModHashSignature, Sketch, minhash::MAX_BUCKETS,
        modhash::MAX_EXPONENT,
    },
    value::Value,
};

/// Largest bucket count a `minhash` row may request
pub const MAX_MINHASH_BUCKETS: u32 = MAX_BUCKETS;

/// Handler binding for `minhash(x [, k [, n]])`
#[derive(Debug)]
pub struct MinHashSet;

impl SketchHandler for MinHashSet {
    const NAME: &'static str = "minhash";
    const ARITY: (usize, usize) = (1, 3);
    const ARITY_TEXT: &'static str = "1 to 3";
    const PARAMETERS: &'static str = "k, n";

    type Sketch = MinHashSignature;
    type Output = Vec<u8>;

    fn parameters(
        conf: &HandlerConf,
        params: &[Option<Value>],
    ) -> Result<MinHashConfig, ParameterError> {
        let buckets = match integral("k", params, 0)? {
            None => conf.minhash_buckets(),
            Some(k) => u32::try_from(k)
                .ok()
                .filter(|k| (1..=MAX_MINHASH_BUCKETS).contains(k))
                .ok_or_else(|| ParameterError::OutOfRange {
                    name: "k",
                    expected: "between 1 and 65536",
                    actual: k.to_string(),
                })?,
        };
        let universe = match integral("n", params, 1)? {
            None => conf.minhash_universe(),
            Some(n) => u64::try_from(n).map_err(|_| ParameterError::OutOfRange {
                name: "n",
                expected: "non-negative",
                actual: n.to_string(),
            })?,
        };
        Ok(MinHashConfig::new(buckets, universe))
    }

    fn output_shape() -> Shape {
        Shape::BINARY
    }

    fn finish(sketch: &MinHashSignature) -> Vec<u8> {
        sketch.to_bytes()
    }
}

/// Handler binding for `modhash(x [, k])`
#[derive(Debug)]
pub struct ModHashSet;

impl SketchHandler for ModHashSet {
    const NAME: &'static str = "modhash";
    const ARITY: (usize, usize) = (1, 2);
    const ARITY_TEXT: &'static str = "1 or 2";
    const PARAMETERS: &'static str = "k";

    type Sketch = ModHashSignature;
    type Output = Vec<u8>;

    fn parameters(conf: &HandlerConf, params: &[Option<Value>]) -> Result<u8, ParameterError> {
        match integral("k", params, 0)? {
            None => Ok(conf.modhash_exponent()),
            Some(k) => u8::try_from(k)
                .ok()
                .filter(|k| *k <= MAX_EXPONENT)
                .ok_or_else(|| ParameterError::OutOfRange {
                    name: "k",
                    expected: "between 0 and 63",
                    actual: k.to_string(),
                }),
        }
    }

    fn output_shape() -> Shape {
        Shape::BINARY
    }

    fn finish(sketch: &ModHashSignature) -> Vec<u8> {
        sketch.to_bytes()
    }
}

/// MinHash signature of a column, or union of encoded signatures
pub type MinHash = SketchEvaluator<MinHashSet>;

/// Mod-m sampled signature of a column, or union of encoded signatures
pub type ModHash = SketchEvaluator<ModHashSet>;
