//! Pearson correlation between weight vectors.
//!
//! ```text
//! ρ(X, Y) = Σ (x_i - x̄)(y_i - ȳ) / sqrt(Σ (x_i - x̄)² · Σ (y_i - ȳ)²)
//! ```
//!
//! Sums are accumulated in `f64`; checkpoints have millions to billions of
//! weights and `f32` accumulation drifts noticeably at that size.

use crate::error::{Result, TrajectoryError};
use crate::group::{group_by_layer, LayerGroup};
use crate::layout::LayerSizeTable;
use crate::mask::WeightMask;
use crate::palette::Palette;
use serde::{Deserialize, Serialize};

/// Outcome of a correlation computation.
///
/// A constant input has zero variance and no defined correlation. That case is
/// reported as [`Correlation::Degenerate`] instead of being folded into 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    /// Pearson coefficient in [-1, 1].
    Defined(f64),
    /// At least one side has zero variance.
    Degenerate {
        /// First vector is constant
        left_constant: bool,
        /// Second vector is constant
        right_constant: bool,
    },
}

impl Correlation {
    /// The coefficient, or NaN when degenerate.
    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            Self::Defined(r) => *r,
            Self::Degenerate { .. } => f64::NAN,
        }
    }

    /// The coefficient, if defined.
    #[must_use]
    pub fn defined(&self) -> Option<f64> {
        match self {
            Self::Defined(r) => Some(*r),
            Self::Degenerate { .. } => None,
        }
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Degenerate { .. })
    }
}

impl Serialize for Correlation {
    /// Written as `{"value": r | null, "degenerate": bool}`; JSON has no NaN.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Correlation", 2)?;
        state.serialize_field("value", &self.defined())?;
        state.serialize_field("degenerate", &self.is_degenerate())?;
        state.end()
    }
}

/// Computes the Pearson correlation coefficient of two equal-length vectors.
///
/// The computation is symmetric and does not modify either input.
///
/// # Errors
///
/// Returns `InvalidInput` if the vectors differ in length, are empty, or
/// contain NaN or infinite values.
///
/// # Examples
///
/// ```
/// use weight_trajectory::stats::correlate;
///
/// let x = [1.0, 2.0, 3.0, 4.0];
/// let y = [8.0, 6.0, 4.0, 2.0];
/// let r = correlate(&x, &y).expect("same length").value();
/// assert!((r + 1.0).abs() < 1e-9);
/// ```
pub fn correlate(a: &[f32], b: &[f32]) -> Result<Correlation> {
    let n = a.len();
    if n != b.len() {
        return Err(TrajectoryError::invalid_input(format!(
            "cannot correlate vectors of length {n} and {}",
            b.len()
        )));
    }
    if n == 0 {
        return Err(TrajectoryError::invalid_input(
            "cannot correlate empty vectors",
        ));
    }

    let a_mean = a.iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64;
    let b_mean = b.iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64;
    // f32 sums cannot overflow in f64, so a non-finite mean means a NaN or
    // infinite input.
    if !a_mean.is_finite() || !b_mean.is_finite() {
        return Err(TrajectoryError::invalid_input(
            "cannot correlate vectors containing NaN or infinite values",
        ));
    }

    let mut cov_sum = 0.0_f64;
    let mut a_var_sum = 0.0_f64;
    let mut b_var_sum = 0.0_f64;
    for (&ai, &bi) in a.iter().zip(b) {
        let a_diff = f64::from(ai) - a_mean;
        let b_diff = f64::from(bi) - b_mean;
        cov_sum += a_diff * b_diff;
        a_var_sum += a_diff * a_diff;
        b_var_sum += b_diff * b_diff;
    }

    let left_constant = a_var_sum == 0.0 || is_constant(a);
    let right_constant = b_var_sum == 0.0 || is_constant(b);
    if left_constant || right_constant {
        return Ok(Correlation::Degenerate {
            left_constant,
            right_constant,
        });
    }

    let r = cov_sum / (a_var_sum.sqrt() * b_var_sum.sqrt());
    Ok(Correlation::Defined(r.clamp(-1.0, 1.0)))
}

fn is_constant(values: &[f32]) -> bool {
    values.iter().all(|&v| v == values[0])
}

/// Correlation restricted to the masked positions of both vectors.
///
/// # Errors
///
/// - `InvalidInput` on length mismatch or an empty mask
/// - `IndexOutOfRange` if the mask does not fit the vectors
pub fn correlate_masked(a: &[f32], b: &[f32], mask: &WeightMask) -> Result<Correlation> {
    if a.len() != b.len() {
        return Err(TrajectoryError::invalid_input(format!(
            "cannot correlate vectors of length {} and {}",
            a.len(),
            b.len()
        )));
    }
    correlate(&mask.select(a)?, &mask.select(b)?)
}

fn check_same_table(a: &[f32], b: &[f32], table: &LayerSizeTable) -> Result<()> {
    if a.len() != b.len() {
        return Err(TrajectoryError::invalid_input(format!(
            "checkpoints disagree in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let expected = table.total_len();
    if a.len() != expected {
        return Err(TrajectoryError::invalid_input(format!(
            "weight vectors have {} values but layer table describes {expected}",
            a.len()
        )));
    }
    Ok(())
}

/// Group both vectors by layer with the same mask.
///
/// Layer `k` of the first group and layer `k` of the second hold the same flat
/// positions, so zipping them gives one `(x, y)` point per kept weight.
///
/// # Errors
///
/// Same as [`group_by_layer`], plus `InvalidInput` if the vectors differ in length.
pub fn per_layer_points(
    a: &[f32],
    b: &[f32],
    table: &LayerSizeTable,
    mask: Option<&WeightMask>,
) -> Result<(LayerGroup, LayerGroup)> {
    check_same_table(a, b, table)?;
    Ok((
        group_by_layer(a, table, mask)?,
        group_by_layer(b, table, mask)?,
    ))
}

/// Scatter coordinates of one layer, colored by layer name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterSeries {
    pub layer: String,
    pub color: String,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
}

impl ScatterSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Per-layer scatter series in table order, `x` from `a` and `y` from `b`.
///
/// # Errors
///
/// Same as [`per_layer_points`].
pub fn scatter_series(
    a: &[f32],
    b: &[f32],
    table: &LayerSizeTable,
    mask: Option<&WeightMask>,
    palette: &Palette,
) -> Result<Vec<ScatterSeries>> {
    let (xs, ys) = per_layer_points(a, b, table, mask)?;
    series_from_groups(xs, &ys, palette)
}

/// Pair two groups built from the same table and mask into scatter series.
///
/// # Errors
///
/// Returns `InvalidInput` if the groups disagree in layer names or sizes.
pub fn series_from_groups(
    xs: LayerGroup,
    ys: &LayerGroup,
    palette: &Palette,
) -> Result<Vec<ScatterSeries>> {
    if xs.len() != ys.len() {
        return Err(TrajectoryError::invalid_input(format!(
            "layer groups disagree: {} vs {} layers",
            xs.len(),
            ys.len()
        )));
    }
    xs.into_inner()
        .into_iter()
        .zip(ys.iter())
        .map(|((layer, x), (y_name, y))| {
            if layer != y_name || x.len() != y.len() {
                return Err(TrajectoryError::invalid_input(format!(
                    "layer '{layer}' ({} points) does not match '{y_name}' ({} points)",
                    x.len(),
                    y.len()
                )));
            }
            Ok(ScatterSeries {
                color: palette.color_for(&layer).to_string(),
                layer,
                x,
                y: y.to_vec(),
            })
        })
        .collect()
}

/// Correlation of every layer taken on its own.
///
/// Layers with no (masked) values are skipped.
///
/// # Errors
///
/// Same as [`per_layer_points`].
pub fn per_layer_correlation(
    a: &[f32],
    b: &[f32],
    table: &LayerSizeTable,
    mask: Option<&WeightMask>,
) -> Result<Vec<(String, Correlation)>> {
    let (xs, ys) = per_layer_points(a, b, table, mask)?;
    let mut out = Vec::with_capacity(xs.len());
    for ((name, x), (_, y)) in xs.iter().zip(ys.iter()) {
        if x.is_empty() {
            continue;
        }
        out.push((name.to_string(), correlate(x, y)?));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "correlation_tests.rs"]
mod tests;
