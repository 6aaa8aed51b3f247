//! Regroup a flat weight vector into its named layers.

use crate::error::{Result, TrajectoryError};
use crate::layout::{build_index_map, LayerSizeTable};
use crate::mask::WeightMask;
use serde::Serialize;

/// Per-layer slices of one (possibly masked) weight vector, in table order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerGroup {
    layers: Vec<(String, Vec<f32>)>,
}

impl LayerGroup {
    /// Values of the layer named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.layers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// `(name, values)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.layers.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|(n, _)| n.as_str())
    }

    /// Number of layers (including empty ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total number of values across all layers.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.layers.iter().map(|(_, v)| v.len()).sum()
    }

    /// Concatenate the layers back in table order.
    #[must_use]
    pub fn flatten(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.total_len());
        for (_, values) in &self.layers {
            out.extend_from_slice(values);
        }
        out
    }

    /// Summary statistics of every layer.
    #[must_use]
    pub fn stats(&self) -> Vec<LayerStats> {
        self.layers
            .iter()
            .map(|(name, values)| LayerStats::from_slice(name, values))
            .collect()
    }

    pub fn into_inner(self) -> Vec<(String, Vec<f32>)> {
        self.layers
    }
}

/// Count, mean, population std and range of one layer's values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f32,
    pub max: f32,
}

impl LayerStats {
    #[must_use]
    pub fn from_slice(name: &str, values: &[f32]) -> Self {
        if values.is_empty() {
            return Self {
                name: name.to_string(),
                count: 0,
                mean: 0.0,
                std: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let var = values
            .iter()
            .map(|&v| (f64::from(v) - mean).powi(2))
            .sum::<f64>()
            / n;
        let (min, max) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        Self {
            name: name.to_string(),
            count: values.len(),
            mean,
            std: var.sqrt(),
            min,
            max,
        }
    }
}

/// Split `weights` into per-layer vectors described by `table`.
///
/// With a mask, only the masked positions are kept; each layer receives its
/// masked values in their original relative order, and a layer with no masked
/// positions maps to an empty vector. The result is a partition: every kept
/// weight lands in exactly one layer.
///
/// # Errors
///
/// - `InvalidInput` if `weights.len()` differs from `table.total_len()`
/// - `IndexOutOfRange` if a mask index is not below `weights.len()`
///
/// # Examples
///
/// ```
/// use weight_trajectory::group::group_by_layer;
/// use weight_trajectory::layout::{LayerEntry, LayerSizeTable};
/// use weight_trajectory::mask::WeightMask;
///
/// let weights = [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
/// let table = LayerSizeTable::new(vec![
///     LayerEntry::new("a.weight", 4),
///     LayerEntry::new("b.weight", 3),
/// ]);
/// let mask = WeightMask::new(vec![0, 4]);
///
/// let groups = group_by_layer(&weights, &table, Some(&mask)).expect("consistent input");
/// assert_eq!(groups.get("a.weight"), Some(&[1.0][..]));
/// assert_eq!(groups.get("b.weight"), Some(&[0.0][..]));
/// ```
pub fn group_by_layer(
    weights: &[f32],
    table: &LayerSizeTable,
    mask: Option<&WeightMask>,
) -> Result<LayerGroup> {
    let expected = table.total_len();
    if weights.len() != expected {
        return Err(TrajectoryError::invalid_input(format!(
            "weight vector has {} values but layer table describes {expected}",
            weights.len()
        )));
    }

    let Some(mask) = mask else {
        return Ok(group_contiguous(weights, table));
    };
    mask.check_bounds(weights.len())?;

    let index_map = build_index_map(table)?;
    let mut layers: Vec<(String, Vec<f32>)> = table
        .iter()
        .map(|e| (e.name.clone(), Vec::new()))
        .collect();
    for &i in mask.indices() {
        layers[index_map[i] as usize].1.push(weights[i]);
    }

    Ok(LayerGroup { layers })
}

fn group_contiguous(weights: &[f32], table: &LayerSizeTable) -> LayerGroup {
    let mut offset = 0;
    let layers = table
        .iter()
        .map(|entry| {
            let block = weights[offset..offset + entry.count].to_vec();
            offset += entry.count;
            (entry.name.clone(), block)
        })
        .collect();
    LayerGroup { layers }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
