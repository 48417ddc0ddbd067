use super::{Item, Sketch};
use crate::error::FrameDecodeError;
use serde::{Deserialize, Serialize};

const SEED_A: u64 = 0x51_7c_c1_b7_27_22_0a_95;
const SEED_B: u64 = 0x2545_f491_4f6c_dd1d;
const EMPTY_BUCKET: u64 = u64::MAX;

/// Largest bucket count a decoded signature may carry
pub const MAX_BUCKETS: u32 = 1 << 16;

#[inline]
fn bucket_seed(bucket: usize) -> u64 {
    SEED_A.wrapping_add((bucket as u64).wrapping_mul(SEED_B))
}

/// Parameters of a [`MinHashSignature`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinHashConfig {
    /// Number of hash functions / buckets (`k`)
    pub buckets: u32,
    /// Size of the hash universe (`n`); 0 keeps the full 64-bit space
    pub universe: u64,
}

impl MinHashConfig {
    /// Creates a new config
    pub const fn new(buckets: u32, universe: u64) -> Self {
        Self { buckets, universe }
    }
}

/// MinHash set signature
///
/// Bucket `i` holds the minimum over all items seen of an xxh3 hash seeded for that
/// bucket (optionally reduced modulo the universe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinHashSignature {
    config: MinHashConfig,
    mins: Vec<u64>,
}

impl MinHashSignature {
    /// Returns the bucket minima
    pub fn buckets(&self) -> &[u64] {
        &self.mins
    }

    /// Estimated Jaccard similarity between the sets behind two signatures
    ///
    /// Buckets empty on both sides are skipped; two empty signatures have similarity 0.
    pub fn jaccard(&self, other: &Self) -> Result<f64, FrameDecodeError> {
        self.check_compatible(other)?;
        let (mut filled, mut matching) = (0usize, 0usize);
        for (a, b) in self.mins.iter().zip(other.mins.iter()) {
            if *a == EMPTY_BUCKET && *b == EMPTY_BUCKET {
                continue;
            }
            filled += 1;
            if a == b {
                matching += 1;
            }
        }
        if filled == 0 {
            return Ok(0.0);
        }
        Ok(matching as f64 / filled as f64)
    }

    pub(crate) fn check_compatible(&self, other: &Self) -> Result<(), FrameDecodeError> {
        if self.config != other.config {
            return Err(FrameDecodeError::Incompatible {
                sketch: Self::NAME,
                left: format!("{:?}", other.config),
                right: format!("{:?}", self.config),
            });
        }
        Ok(())
    }
}

impl Sketch for MinHashSignature {
    const NAME: &'static str = "minhash signature";
    type Config = MinHashConfig;

    fn with_config(config: MinHashConfig) -> Self {
        Self {
            config,
            mins: vec![EMPTY_BUCKET; config.buckets as usize],
        }
    }

    fn config(&self) -> MinHashConfig {
        self.config
    }

    #[inline]
    fn update(&mut self, item: Item<'_>) {
        let universe = self.config.universe;
        for (i, slot) in self.mins.iter_mut().enumerate() {
            let mut h = item.hash(bucket_seed(i));
            if universe > 0 {
                h %= universe;
            }
            if h < *slot {
                *slot = h;
            }
        }
    }

    fn merge(&mut self, other: &Self) -> Result<(), FrameDecodeError> {
        if other.is_empty() {
            return Ok(());
        }
        self.check_compatible(other)?;
        for (slot, theirs) in self.mins.iter_mut().zip(other.mins.iter()) {
            *slot = (*slot).min(*theirs);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), FrameDecodeError> {
        let corrupt = |reason| FrameDecodeError::Corrupt {
            sketch: Self::NAME,
            reason,
        };
        if self.config.buckets == 0 {
            return Err(corrupt("zero buckets"));
        }
        if self.config.buckets > MAX_BUCKETS {
            return Err(corrupt("more than 65536 buckets"));
        }
        if self.mins.len() != self.config.buckets as usize {
            return Err(corrupt("bucket count does not match configuration"));
        }
        let universe = self.config.universe;
        if universe > 0
            && self
                .mins
                .iter()
                .any(|m| *m != EMPTY_BUCKET && *m >= universe)
        {
            return Err(corrupt("bucket value outside the universe"));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.mins.iter().all(|m| *m == EMPTY_BUCKET)
    }
}
