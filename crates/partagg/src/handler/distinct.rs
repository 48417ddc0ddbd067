use super::single::{SketchEvaluator, SketchHandler};
use crate::{
    conf::HandlerConf,
    error::ParameterError,
    phase::Shape,
    sketch::{CountSketch, Sketch},
    value::Value,
};

/// Final result of `approx_distinct`
#[derive(Debug, Clone, PartialEq)]
pub struct DistinctSummary {
    /// Estimated number of distinct items
    pub cardinality: f64,
    /// Variance of the estimate, 0 while it is exact
    pub error: f64,
    /// The encoded sketch, mergeable into later `approx_distinct` calls
    pub sketch: Vec<u8>,
}

/// Handler binding for `approx_distinct`
#[derive(Debug)]
pub struct DistinctCount;

impl SketchHandler for DistinctCount {
    const NAME: &'static str = "approx_distinct";
    const ARITY: (usize, usize) = (1, 1);
    const ARITY_TEXT: &'static str = "1";
    const PARAMETERS: &'static str = "";

    type Sketch = CountSketch;
    type Output = DistinctSummary;

    fn parameters(conf: &HandlerConf, _params: &[Option<Value>]) -> Result<u32, ParameterError> {
        Ok(conf.count_nominal_entries())
    }

    fn output_shape() -> Shape {
        Shape::Struct(vec![
            ("cardinality", Shape::DOUBLE),
            ("error", Shape::DOUBLE),
            ("sketch", Shape::BINARY),
        ])
    }

    fn finish(sketch: &CountSketch) -> DistinctSummary {
        DistinctSummary {
            cardinality: sketch.estimate(),
            error: sketch.variance(),
            sketch: sketch.to_bytes(),
        }
    }
}

/// Approximate distinct count over a column, or union of encoded count sketches
pub type ApproxDistinct = SketchEvaluator<DistinctCount>;
