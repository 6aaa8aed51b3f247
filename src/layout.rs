//! Layer size table and the flat-index → layer mapping.
//!
//! A weight vector on its own is just numbers. The [`LayerSizeTable`] that was
//! produced alongside it is the only record of which block of positions
//! belongs to which named layer:
//!
//! ```text
//! table:   [("a.weight", 4), ("b.weight", 3)]
//! vector:  [ w0 w1 w2 w3 | w4 w5 w6 ]
//! index:   [ 0  0  0  0  | 1  1  1  ]
//! ```

use crate::error::{Result, TrajectoryError};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One `(layer_name, element_count)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub name: String,
    pub count: usize,
}

impl LayerEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Ordered layer sizes describing one weight vector.
///
/// Serialized as a JSON array of `[name, count]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSizeTable {
    entries: Vec<LayerEntry>,
}

impl LayerSizeTable {
    #[must_use]
    pub fn new(entries: Vec<LayerEntry>) -> Self {
        Self { entries }
    }

    /// Build a table from raw, possibly signed counts (as read back from disk).
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any count is negative or the counts add up
    /// to more positions than a vector can address.
    pub fn from_raw<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        let mut total = 0_usize;
        for (name, count) in pairs {
            let name = name.into();
            if count < 0 {
                return Err(TrajectoryError::invalid_input(format!(
                    "layer '{name}' has negative element count {count}"
                )));
            }
            let count = usize::try_from(count)
                .ok()
                .filter(|&c| c <= isize::MAX as usize)
                .ok_or_else(|| {
                    TrajectoryError::invalid_input(format!(
                        "layer '{name}' element count {count} is too large"
                    ))
                })?;
            total = total
                .checked_add(count)
                .filter(|&t| t <= isize::MAX as usize)
                .ok_or_else(|| {
                    TrajectoryError::invalid_input(format!(
                        "layer sizes overflow at '{name}' (running total {total} + {count})"
                    ))
                })?;
            entries.push(LayerEntry { name, count });
        }
        Ok(Self { entries })
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, count: usize) {
        self.entries.push(LayerEntry::new(name, count));
    }

    #[must_use]
    pub fn entries(&self) -> &[LayerEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LayerEntry> {
        self.entries.iter()
    }

    /// Number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the weight vector this table describes.
    ///
    /// Saturates instead of wrapping, so an oversized table never matches a
    /// real vector length.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.entries
            .iter()
            .fold(0_usize, |acc, e| acc.saturating_add(e.count))
    }

    /// Start offset of every layer, in table order.
    #[must_use]
    pub fn offsets(&self) -> Vec<usize> {
        let mut offset: usize = 0;
        self.entries
            .iter()
            .map(|e| {
                let start = offset;
                offset = offset.saturating_add(e.count);
                start
            })
            .collect()
    }

    /// Flat range covered by layer `ordinal`.
    #[must_use]
    pub fn range(&self, ordinal: usize) -> Option<Range<usize>> {
        let entry = self.entries.get(ordinal)?;
        let start = self.entries[..ordinal]
            .iter()
            .fold(0_usize, |acc, e| acc.saturating_add(e.count));
        Some(start..start.saturating_add(entry.count))
    }

    /// Ordinal of the layer named `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Ordinal of the layer that owns flat position `index`.
    ///
    /// Zero-sized layers never own a position.
    #[must_use]
    pub fn layer_of(&self, index: usize) -> Option<usize> {
        if index >= self.total_len() {
            return None;
        }
        // Exclusive end offsets are non-decreasing; the owner is the first
        // layer whose end lies past `index`.
        let ends: Vec<usize> = self
            .entries
            .iter()
            .scan(0usize, |acc, e| {
                *acc = acc.saturating_add(e.count);
                Some(*acc)
            })
            .collect();
        Some(ends.partition_point(|&end| end <= index))
    }

    /// Whether both tables name the same layers with the same sizes in the same order.
    #[must_use]
    pub fn same_layout(&self, other: &Self) -> bool {
        self == other
    }
}

impl<'a> IntoIterator for &'a LayerSizeTable {
    type Item = &'a LayerEntry;
    type IntoIter = std::slice::Iter<'a, LayerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for LayerSizeTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for entry in &self.entries {
            seq.serialize_element(&(&entry.name, entry.count))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for LayerSizeTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let pairs = Vec::<(String, i64)>::deserialize(deserializer)?;
        Self::from_raw(pairs).map_err(serde::de::Error::custom)
    }
}

/// Map every flat position to the ordinal of the layer that owns it.
///
/// Positions of layer `k` form one contiguous block of exactly
/// `table[k].count` entries, blocks in table order. O(total_len) time and space.
///
/// # Errors
///
/// Returns `InvalidInput` if the table has more layers than fit in a `u32`
/// ordinal, or if its counts add up to more positions than a vector can hold.
///
/// # Examples
///
/// ```
/// use weight_trajectory::layout::{build_index_map, LayerEntry, LayerSizeTable};
///
/// let table = LayerSizeTable::new(vec![LayerEntry::new("a", 2), LayerEntry::new("b", 3)]);
/// let map = build_index_map(&table).expect("valid table");
/// assert_eq!(map, vec![0, 0, 1, 1, 1]);
/// ```
pub fn build_index_map(table: &LayerSizeTable) -> Result<Vec<u32>> {
    if u32::try_from(table.len()).is_err() {
        return Err(TrajectoryError::invalid_input(format!(
            "{} layers exceed the index map's u32 ordinal range",
            table.len()
        )));
    }

    let total = table
        .iter()
        .try_fold(0_usize, |acc, e| acc.checked_add(e.count))
        .filter(|&t| t <= isize::MAX as usize)
        .ok_or_else(|| TrajectoryError::invalid_input("layer sizes overflow the index range"))?;

    let mut map = vec![0u32; total];
    let mut offset = 0;
    for (ordinal, entry) in table.iter().enumerate() {
        map[offset..offset + entry.count].fill(ordinal as u32);
        offset += entry.count;
    }
    Ok(map)
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
