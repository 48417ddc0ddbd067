use super::{Item, Sketch};
use crate::error::FrameDecodeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const COUNT_SEED: u64 = 0x9e37_79b9_7f4a_7c15;
// 2^64 as a float, maps a hash onto (0, 1]
const HASH_SPACE: f64 = 18_446_744_073_709_551_616.0;

/// Approximate distinct counter keeping the `k` smallest item hashes
///
/// Below `k` distinct items the estimate is exact. Past that the `k`-th smallest
/// hash `θ` (normalized to the unit interval) gives the estimate `(k - 1) / θ`.
///
/// # Example
///
/// ```
/// use partagg::sketch::{CountSketch, Item, Sketch};
///
/// let mut sketch = CountSketch::with_config(64);
/// for item in ["a", "b", "a"] {
///     sketch.update(Item::Text(item));
/// }
/// assert_eq!(sketch.estimate(), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountSketch {
    k: u32,
    hashes: BTreeSet<u64>,
}

impl CountSketch {
    /// Number of retained hashes
    pub fn retained(&self) -> usize {
        self.hashes.len()
    }

    fn saturated(&self) -> bool {
        self.hashes.len() >= self.k as usize
    }

    fn theta(&self) -> f64 {
        match self.hashes.last() {
            Some(max) if self.saturated() => (*max as f64 + 1.0) / HASH_SPACE,
            _ => 1.0,
        }
    }

    /// Estimated number of distinct items
    pub fn estimate(&self) -> f64 {
        if self.saturated() {
            (f64::from(self.k) - 1.0) / self.theta()
        } else {
            self.hashes.len() as f64
        }
    }

    /// Variance of [`CountSketch::estimate`]
    ///
    /// Zero while the sketch is exact.
    pub fn variance(&self) -> f64 {
        if self.saturated() && self.k > 2 {
            let estimate = self.estimate();
            estimate * estimate / (f64::from(self.k) - 2.0)
        } else {
            0.0
        }
    }

    fn truncate(&mut self) {
        while self.hashes.len() > self.k as usize {
            self.hashes.pop_last();
        }
    }
}

impl Sketch for CountSketch {
    const NAME: &'static str = "count sketch";
    type Config = u32;

    fn with_config(k: u32) -> Self {
        Self {
            k: k.max(2),
            hashes: BTreeSet::new(),
        }
    }

    fn config(&self) -> u32 {
        self.k
    }

    #[inline]
    fn update(&mut self, item: Item<'_>) {
        let hash = item.hash(COUNT_SEED);
        if self.saturated() && self.hashes.last().is_some_and(|max| hash >= *max) {
            return;
        }
        if self.hashes.insert(hash) {
            self.truncate();
        }
    }

    // differing sizes merge down to the smaller one, which never fails
    fn merge(&mut self, other: &Self) -> Result<(), FrameDecodeError> {
        if other.is_empty() {
            return Ok(());
        }
        self.k = self.k.min(other.k);
        self.hashes.extend(other.hashes.iter().copied());
        self.truncate();
        Ok(())
    }

    fn validate(&self) -> Result<(), FrameDecodeError> {
        if self.k < 2 {
            return Err(FrameDecodeError::Corrupt {
                sketch: Self::NAME,
                reason: "nominal entries below 2",
            });
        }
        if self.hashes.len() > self.k as usize {
            return Err(FrameDecodeError::Corrupt {
                sketch: Self::NAME,
                reason: "more hashes retained than nominal entries",
            });
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sketch_of(k: u32, range: core::ops::Range<i64>) -> CountSketch {
        let mut sketch = CountSketch::with_config(k);
        for i in range {
            sketch.update(Item::Int(i));
        }
        sketch
    }

    #[test]
    fn exact_below_nominal_entries() {
        let mut sketch = CountSketch::with_config(16);
        for s in ["A", "B", "C", "A", "B", "A"] {
            sketch.update(Item::Text(s));
        }
        assert_eq!(sketch.estimate(), 3.0);
        assert_eq!(sketch.variance(), 0.0);
    }

    #[test]
    fn estimate_within_error_bound() {
        let sketch = sketch_of(1024, 0..100_000);
        let estimate = sketch.estimate();
        let rel = (estimate - 100_000.0).abs() / 100_000.0;
        // 1/sqrt(1022) ~ 3.1%, allow four standard errors
        assert!(rel < 0.13, "estimate {estimate} too far off");
        assert!(sketch.variance() > 0.0);
    }

    #[test]
    fn merge_matches_single_pass() {
        let mut left = sketch_of(256, 0..5_000);
        let right = sketch_of(256, 2_500..10_000);
        left.merge(&right).unwrap();
        assert_eq!(left, sketch_of(256, 0..10_000));
    }

    #[test]
    fn merge_with_smaller_k_shrinks() {
        let mut left = sketch_of(256, 0..1_000);
        let right = sketch_of(64, 0..10);
        left.merge(&right).unwrap();
        assert_eq!(left.config(), 64);
        assert_eq!(left.retained(), 64);
    }

    #[test]
    fn merging_an_empty_sketch_is_a_noop() {
        let mut sketch = sketch_of(256, 0..1_000);
        let before = sketch.clone();
        sketch.merge(&CountSketch::with_config(16)).unwrap();
        assert_eq!(sketch, before);
        assert_eq!(sketch.config(), 256);
    }

    #[test]
    fn empty_keeps_config() {
        let sketch = sketch_of(32, 0..100);
        let empty = sketch.empty();
        assert!(empty.is_empty());
        assert_eq!(empty.config(), 32);
    }

    #[test]
    fn bytes_round_trip_and_validation() {
        let sketch = sketch_of(32, 0..10);
        let decoded = CountSketch::from_bytes(&sketch.to_bytes()).unwrap();
        assert_eq!(decoded, sketch);

        let mut bytes = sketch.to_bytes();
        bytes.push(0);
        assert!(CountSketch::from_bytes(&bytes).is_err());

        let overfull = CountSketch {
            k: 2,
            hashes: [1, 2, 3].into_iter().collect(),
        };
        assert!(matches!(
            CountSketch::from_bytes(&overfull.to_bytes()),
            Err(FrameDecodeError::Corrupt { .. })
        ));
    }
}
