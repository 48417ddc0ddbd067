use super::{Item, Sketch};
use crate::error::FrameDecodeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const MODHASH_SEED: u64 = 0x6a09_e667_f3bc_c908;

/// Largest supported modulus exponent
pub const MAX_EXPONENT: u8 = 63;

/// Mod-m sampled set signature with `m = 2^k`
///
/// Keeps every item hash divisible by `m`, so the union of two signatures is the
/// signature of the union and resemblance is the ratio of shared to total samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModHashSignature {
    exponent: u8,
    hashes: BTreeSet<u64>,
}

impl ModHashSignature {
    #[inline]
    fn mask(&self) -> u64 {
        (1u64 << self.exponent) - 1
    }

    /// Number of sampled hashes
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Estimated number of distinct items: samples times the modulus
    pub fn estimate(&self) -> f64 {
        self.hashes.len() as f64 * (1u64 << self.exponent) as f64
    }

    /// Estimated resemblance `|A ∩ B| / |A ∪ B|`
    ///
    /// Returns 0 when neither signature holds a sample.
    pub fn resemblance(&self, other: &Self) -> Result<f64, FrameDecodeError> {
        self.check_compatible(other)?;
        let shared = self.hashes.intersection(&other.hashes).count();
        let total = self.hashes.union(&other.hashes).count();
        if total == 0 {
            return Ok(0.0);
        }
        Ok(shared as f64 / total as f64)
    }

    fn check_compatible(&self, other: &Self) -> Result<(), FrameDecodeError> {
        if self.exponent != other.exponent {
            return Err(FrameDecodeError::Incompatible {
                sketch: Self::NAME,
                left: format!("k={}", other.exponent),
                right: format!("k={}", self.exponent),
            });
        }
        Ok(())
    }
}

impl Sketch for ModHashSignature {
    const NAME: &'static str = "modhash signature";
    type Config = u8;

    fn with_config(exponent: u8) -> Self {
        Self {
            exponent: exponent.min(MAX_EXPONENT),
            hashes: BTreeSet::new(),
        }
    }

    fn config(&self) -> u8 {
        self.exponent
    }

    #[inline]
    fn update(&mut self, item: Item<'_>) {
        let hash = item.hash(MODHASH_SEED);
        if hash & self.mask() == 0 {
            self.hashes.insert(hash);
        }
    }

    fn merge(&mut self, other: &Self) -> Result<(), FrameDecodeError> {
        if other.is_empty() {
            return Ok(());
        }
        self.check_compatible(other)?;
        self.hashes.extend(other.hashes.iter().copied());
        Ok(())
    }

    fn validate(&self) -> Result<(), FrameDecodeError> {
        if self.exponent > MAX_EXPONENT {
            return Err(FrameDecodeError::Corrupt {
                sketch: Self::NAME,
                reason: "modulus exponent above 63",
            });
        }
        let mask = self.mask();
        if self.hashes.iter().any(|h| h & mask != 0) {
            return Err(FrameDecodeError::Corrupt {
                sketch: Self::NAME,
                reason: "sample not divisible by the modulus",
            });
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
