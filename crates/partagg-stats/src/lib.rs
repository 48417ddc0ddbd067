//! Latency profiling for partagg evaluators.
//!
//! A [`Sketch`] records operation latencies (in nanoseconds) into a DDSketch and
//! [`profile_scope!`] times the rest of the enclosing scope into one.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

use core::cell::RefCell;
use minstant::Instant;
use prettytable::{Table, row};
use sketches_ddsketch::{Config, DDSketch};
use std::rc::Rc;

/// Records the latency of the remaining scope into the given [`Sketch`].
///
/// ```
/// let sketch = partagg_stats::Sketch::default();
/// {
///     partagg_stats::profile_scope!(&sketch);
/// }
/// assert_eq!(sketch.percentiles().count, 1);
/// ```
#[macro_export]
macro_rules! profile_scope {
    ($sketch:expr) => {
        let _measure = $crate::Measure::new($sketch);
    };
}

fn quantile(sketch: &DDSketch, q: f64) -> f64 {
    sketch.quantile(q).ok().flatten().unwrap_or(0.0)
}

/// Extracts the reported percentiles of a DDSketch
pub fn sketch_percentiles(sketch: &DDSketch) -> Percentiles {
    Percentiles {
        count: sketch.count(),
        min: sketch.min().unwrap_or(0.0),
        p50: quantile(sketch, 0.5),
        p99: quantile(sketch, 0.99),
        p99_9: quantile(sketch, 0.999),
        p99_99: quantile(sketch, 0.9999),
        max: sketch.max().unwrap_or(0.0),
    }
}

/// Latency percentiles in nanoseconds
#[derive(Default, Clone, Copy)]
pub struct Percentiles {
    /// Number of recorded samples
    pub count: usize,
    /// Smallest recorded sample
    pub min: f64,
    /// Median
    pub p50: f64,
    /// 99th percentile
    pub p99: f64,
    /// 99.9th percentile
    pub p99_9: f64,
    /// 99.99th percentile
    pub p99_99: f64,
    /// Largest recorded sample
    pub max: f64,
}

impl std::fmt::Debug for Percentiles {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Percentiles")
            .field("count", &self.count)
            .field("min", &format_args!("{:.2}ns", self.min))
            .field("p50", &format_args!("{:.2}ns", self.p50))
            .field("p99", &format_args!("{:.2}ns", self.p99))
            .field("p99.9", &format_args!("{:.2}ns", self.p99_9))
            .field("p99.99", &format_args!("{:.2}ns", self.p99_99))
            .field("max", &format_args!("{:.2}ns", self.max))
            .finish()
    }
}

/// A shared latency sketch
///
/// Cloning is cheap and clones record into the same underlying DDSketch.
#[derive(Clone)]
pub struct Sketch {
    inner: Rc<RefCell<DDSketch>>,
}

impl Default for Sketch {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(DDSketch::new(Config::new(0.01, 2048, 1.0e-9)))),
        }
    }
}

impl Sketch {
    /// Records a single sample
    #[inline]
    pub fn add(&self, data: f64) {
        self.inner.borrow_mut().add(data)
    }
    /// Returns the current percentiles of the sketch
    pub fn percentiles(&self) -> Percentiles {
        sketch_percentiles(&self.inner.borrow())
    }
}

/// Scope guard that records its lifetime into a [`Sketch`] on drop
pub struct Measure {
    start: Instant,
    sketch: Sketch,
}

impl Measure {
    /// Starts a new measurement
    #[inline]
    pub fn new(sketch: &Sketch) -> Measure {
        Measure {
            sketch: sketch.clone(),
            start: Instant::now(),
        }
    }
}

impl Drop for Measure {
    #[inline]
    fn drop(&mut self) {
        self.sketch.add(self.start.elapsed().as_nanos() as f64);
    }
}

/// Builds a percentile table with one row per named sketch
pub fn percentile_table(rows: &[(&str, &Sketch)]) -> Table {
    let mut table = Table::new();
    table.add_row(row![
        "name", "count", "min", "p50", "p99", "p99.9", "p99.99", "max",
    ]);
    let fmt = |p: f64| -> String { format!("{:.2}ns", p) };
    for (id, sketch) in rows {
        let p = sketch.percentiles();
        table.add_row(row![
            id,
            p.count,
            fmt(p.min),
            fmt(p.p50),
            fmt(p.p99),
            fmt(p.p99_9),
            fmt(p.p99_99),
            fmt(p.max),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_records_on_drop() {
        let sketch = Sketch::default();
        for _ in 0..3 {
            profile_scope!(&sketch);
        }
        let p = sketch.percentiles();
        assert_eq!(p.count, 3);
        assert!(p.max >= p.min);
    }

    #[test]
    fn empty_sketch_reports_zeroes() {
        let p = Sketch::default().percentiles();
        assert_eq!(p.count, 0);
        assert_eq!(p.p50, 0.0);
    }

    #[test]
    fn table_has_header_and_rows() {
        let a = Sketch::default();
        a.add(10.0);
        let b = Sketch::default();
        let table = percentile_table(&[("a", &a), ("b", &b)]);
        assert_eq!(table.len(), 3);
    }
}
