//! Trajectory statistics.
//!
//! - [`correlate`]: Pearson correlation between two checkpoints' weight vectors
//! - [`per_layer_points`]: per-layer `(x, y)` scatter coordinates for one frame
//!
//! # Examples
//!
//! ```
//! use weight_trajectory::stats::{correlate, Correlation};
//!
//! let a = [0.1, 0.4, -0.3, 0.9, 0.0];
//! let r = correlate(&a, &a).expect("equal-length vectors");
//! assert!((r.value() - 1.0).abs() < 1e-9);
//!
//! let flat = [0.0; 5];
//! assert!(correlate(&a, &flat).expect("equal-length vectors").is_degenerate());
//! ```

mod correlation;

pub use correlation::{
    correlate, correlate_masked, per_layer_correlation, per_layer_points, scatter_series,
    series_from_groups, Correlation, ScatterSeries,
};
