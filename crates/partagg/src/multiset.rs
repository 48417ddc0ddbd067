//! Key → multiset accumulation.
//!
//! A [`MultisetTable`] maps a canonical key to the multiset of members observed
//! alongside it. Partial tables merge by adding member counts per key, which is
//! commutative and associative, so any partition of the observations folds to the
//! same final table.

use crate::{error::FrameDecodeError, sketch::encode, value::Value};
use hashbrown::{HashMap, hash_map::Entry};
use serde::{Deserialize, Serialize};

/// Member → occurrence count
pub type Multiset = HashMap<Value, u64>;

#[inline]
fn bump(multiset: &mut Multiset, member: &Value, by: u64) {
    let (_, count) = multiset
        .raw_entry_mut()
        .from_key(member)
        .or_insert_with(|| (member.canonical(), 0));
    *count = count.saturating_add(by);
}

/// Canonical key → [`Multiset`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisetTable {
    entries: HashMap<Value, Multiset>,
}

impl MultisetTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `member` under `key`
    ///
    /// Both values are copied into canonical form; the first occurrence counts as 1.
    #[inline]
    pub fn observe(&mut self, key: &Value, member: &Value) {
        bump(self.multiset_mut(key), member, 1);
    }

    /// Adds every count of `source` into `self`
    pub fn merge_into(&mut self, source: &MultisetTable) {
        for (key, members) in source.entries.iter() {
            let target = self.multiset_mut(key);
            for (member, count) in members.iter() {
                bump(target, member, *count);
            }
        }
    }

    /// Same as [`MultisetTable::merge_into`] but moves the source entries
    pub fn absorb(&mut self, source: MultisetTable) {
        if self.entries.is_empty() {
            *self = source;
            return;
        }
        for (key, members) in source.entries {
            match self.entries.entry(key) {
                Entry::Vacant(vacant) => {
                    vacant.insert(members);
                }
                Entry::Occupied(mut occupied) => {
                    let target = occupied.get_mut();
                    for (member, count) in members {
                        let slot = target.entry(member).or_insert(0);
                        *slot = slot.saturating_add(count);
                    }
                }
            }
        }
    }

    // keys are only copied when first inserted
    fn multiset_mut(&mut self, key: &Value) -> &mut Multiset {
        let (_, multiset) = self
            .entries
            .raw_entry_mut()
            .from_key(key)
            .or_insert_with(|| (key.canonical(), Multiset::new()));
        multiset
    }

    /// Returns the count of `member` under `key` (0 when absent)
    pub fn count(&self, key: &Value, member: &Value) -> u64 {
        self.entries
            .get(key)
            .and_then(|members| members.get(member))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the multiset recorded under `key`
    pub fn get(&self, key: &Value) -> Option<&Multiset> {
        self.entries.get(key)
    }

    /// Iterates over every key and its multiset
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Multiset)> {
        self.entries.iter()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been observed or merged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of observations across all keys
    pub fn total(&self) -> u64 {
        self.entries
            .values()
            .flat_map(|members| members.values())
            .fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Encodes the table as a partial frame
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self)
    }

    /// Decodes a table produced by [`MultisetTable::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameDecodeError> {
        let (table, rest): (Self, _) = postcard::take_from_bytes(bytes)?;
        if !rest.is_empty() {
            return Err(FrameDecodeError::Corrupt {
                sketch: "multiset table",
                reason: "trailing bytes after payload",
            });
        }
        Ok(table)
    }
}
