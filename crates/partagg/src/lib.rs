//! partagg provides mergeable aggregation handlers for partitioned query execution.
//!
//! Every handler implements [`AggregationEvaluator`]: raw rows are folded into a per-group
//! accumulator, accumulators travel between workers as binary partial frames, and frames
//! merge in any order and grouping before the final result is produced.
//!
//! | handler | result |
//! |---------|--------|
//! | `approx_distinct(x)` | approximate distinct count with its error and sketch |
//! | `minhash(x [, k [, n]])` | MinHash set signature |
//! | `modhash(x [, k])` | mod-m sampled set signature |
//! | `segment(key, member)` | key → member → count histogram |
//! | `similarity(x, y)` | Jaccard estimate from two signature columns |
//!
//! ## Feature Flags
//! - `profiler`: records latencies of every evaluator operation
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod evaluator;

/// Handler configuration
pub mod conf;
/// Error types
pub mod error;
/// Length-prefixed paired frame codec
pub mod frame;
/// Registered handlers
pub mod handler;
/// Key → multiset accumulation
pub mod multiset;
/// Execution phases and value shapes
pub mod phase;
/// Mergeable set summaries
pub mod sketch;
/// Row values
pub mod value;

pub use conf::{HandlerConf, ParameterPolicy};
pub use error::{
    AggregateError, ConfigurationError, FrameDecodeError, FrameEncodeError, ParameterError,
};
pub use evaluator::{Accumulator, AggregationEvaluator};
pub use handler::{Handler, HandlerKind};
pub use phase::{Phase, Shape};
pub use value::{Category, Value};
