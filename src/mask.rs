//! Index subsets used to subsample weights for visualization.

use crate::error::{Result, TrajectoryError};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// How many weights a random subset should keep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsetSize {
    /// Keep every weight.
    All,
    /// Keep this fraction of the vector, in (0, 1].
    Fraction(f64),
    /// Keep exactly this many weights (capped at the vector length).
    Count(usize),
}

impl Default for SubsetSize {
    fn default() -> Self {
        Self::All
    }
}

impl SubsetSize {
    /// Interpret a command-line style value: `None` keeps everything, a value
    /// above 1 is a count (truncated), anything else is a fraction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for non-finite, zero or negative values.
    pub fn from_arg(value: Option<f64>) -> Result<Self> {
        let Some(value) = value else {
            return Ok(Self::All);
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(TrajectoryError::invalid_input(format!(
                "random weight subset must be a positive number, got {value}"
            )));
        }
        if value > 1.0 {
            Ok(Self::Count(value as usize))
        } else if value == 1.0 {
            Ok(Self::All)
        } else {
            Ok(Self::Fraction(value))
        }
    }

    /// Number of indices to keep out of `len`.
    #[must_use]
    pub fn resolve(self, len: usize) -> usize {
        match self {
            Self::All => len,
            Self::Fraction(f) => ((f * len as f64) as usize).min(len),
            Self::Count(n) => n.min(len),
        }
    }
}

/// Selected flat-vector indices, kept sorted ascending and free of duplicates.
///
/// Sorting makes masked sub-vectors keep the relative order of the full
/// vector, so per-layer groups concatenated in table order reproduce the
/// masked vector exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeightMask {
    indices: Vec<usize>,
}

impl WeightMask {
    /// Build a mask from arbitrary indices (sorted and de-duplicated).
    #[must_use]
    pub fn new(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    /// Uniformly sample `amount` distinct indices from `0..len`, reproducibly.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `amount > len`.
    pub fn random(len: usize, amount: usize, seed: u64) -> Result<Self> {
        if amount > len {
            return Err(TrajectoryError::invalid_input(format!(
                "cannot sample {amount} weights from a vector of length {len}"
            )));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        Ok(Self::new(index::sample(&mut rng, len, amount).into_vec()))
    }

    /// Mask for a [`SubsetSize`], or `None` when the whole vector is kept.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`WeightMask::random`].
    pub fn for_subset(subset: SubsetSize, len: usize, seed: u64) -> Result<Option<Self>> {
        let amount = subset.resolve(len);
        if amount == len {
            return Ok(None);
        }
        Self::random(len, amount, seed).map(Some)
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Check every index against a vector of length `len`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for the first index ≥ `len`.
    pub fn check_bounds(&self, len: usize) -> Result<()> {
        // Sorted, so the last index is the largest.
        match self.indices.last() {
            Some(&index) if index >= len => Err(TrajectoryError::IndexOutOfRange { index, len }),
            _ => Ok(()),
        }
    }

    /// Values of `weights` at the masked positions.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if the mask does not fit `weights`.
    pub fn select(&self, weights: &[f32]) -> Result<Vec<f32>> {
        self.check_bounds(weights.len())?;
        Ok(self.indices.iter().map(|&i| weights[i]).collect())
    }
}

impl FromIterator<usize> for WeightMask {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
