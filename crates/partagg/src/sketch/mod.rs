//! Mergeable set summaries used as opaque accumulator payloads.
//!
//! The protocol core only talks to a summary through [`Sketch`]; the estimators
//! (cardinality, Jaccard, resemblance) are inherent methods of each type.

use crate::{
    error::FrameDecodeError,
    value::{Value, canonical_double},
};
use core::fmt::Debug;
use serde::{Serialize, de::DeserializeOwned};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// K-minimum-values distinct count sketch
pub mod count;
/// Seeded MinHash set signature
pub mod minhash;
/// Mod-m sampled set signature
pub mod modhash;

pub use count::CountSketch;
pub use minhash::{MinHashConfig, MinHashSignature};
pub use modhash::ModHashSignature;

/// A raw item folded into a sketch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'a> {
    /// Integral item, hashed as its 8 little-endian bytes
    Int(i64),
    /// Double item, hashed as the bits of its canonical form
    Double(f64),
    /// Text item, hashed as its UTF-8 bytes
    Text(&'a str),
    /// Binary item, hashed as is
    Bytes(&'a [u8]),
}

impl<'a> Item<'a> {
    /// Borrows a row value as a sketch item
    pub fn from_value(value: &'a Value) -> Self {
        match value {
            Value::Int(v) => Item::Int(*v),
            Value::Double(d) => Item::Double(*d),
            Value::Bool(b) => Item::Int(i64::from(*b)),
            Value::Text(s) => Item::Text(s),
            Value::Binary(b) => Item::Bytes(b),
        }
    }

    /// 64-bit seeded hash of the item
    #[inline]
    pub fn hash(&self, seed: u64) -> u64 {
        match self {
            Item::Int(v) => xxh3_64_with_seed(&v.to_le_bytes(), seed),
            Item::Double(d) => xxh3_64_with_seed(&canonical_double(*d).to_bits().to_le_bytes(), seed),
            Item::Text(s) => xxh3_64_with_seed(s.as_bytes(), seed),
            Item::Bytes(b) => xxh3_64_with_seed(b, seed),
        }
    }
}

/// Interface every accumulator summary exposes to the protocol core
///
/// Implementations must keep `merge` commutative and associative, and merging an
/// [`empty`](Sketch::empty) summary must leave the target unchanged.
pub trait Sketch: Clone + Debug + Serialize + DeserializeOwned {
    /// Name used in error messages
    const NAME: &'static str;

    /// Parameters fixed at initialization (bucket count, modulus exponent, ...)
    type Config: Copy + Debug + PartialEq;

    /// Creates an empty summary with the given configuration
    fn with_config(config: Self::Config) -> Self;

    /// Returns the configuration of this summary
    fn config(&self) -> Self::Config;

    /// Folds a raw item into the summary
    fn update(&mut self, item: Item<'_>);

    /// Folds `other` into `self`
    ///
    /// Compatibility is checked before any write, so on error `self` is untouched.
    fn merge(&mut self, other: &Self) -> Result<(), FrameDecodeError>;

    /// Checks structural invariants of a freshly decoded summary
    fn validate(&self) -> Result<(), FrameDecodeError>;

    /// Returns `true` if no item has been folded in
    fn is_empty(&self) -> bool;

    /// Returns an empty summary sharing this summary's configuration
    fn empty(&self) -> Self {
        Self::with_config(self.config())
    }

    /// Encodes the summary
    fn to_bytes(&self) -> Vec<u8> {
        encode(self)
    }

    /// Decodes and validates a summary produced by [`Sketch::to_bytes`]
    fn from_bytes(bytes: &[u8]) -> Result<Self, FrameDecodeError> {
        let (sketch, rest): (Self, _) = postcard::take_from_bytes(bytes)?;
        if !rest.is_empty() {
            return Err(FrameDecodeError::Corrupt {
                sketch: Self::NAME,
                reason: "trailing bytes after payload",
            });
        }
        sketch.validate()?;
        Ok(sketch)
    }
}

/// Encodes a value with postcard into a fresh buffer
pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    // a Vec-backed postcard flavor only fails for types serde cannot describe
    match postcard::to_allocvec(value) {
        Ok(bytes) => bytes,
        Err(err) => unreachable!("postcard encoding into a Vec failed: {err}"),
    }
}
