//! Weight trajectories of checkpointed language models.
//!
//! Every checkpoint of a training run is flattened into a single weight
//! vector (layers concatenated in sorted-name order) and persisted together
//! with the layer table that gives the vector meaning. Frames then compare
//! each checkpoint's weights to the final checkpoint's, per layer, with the
//! Pearson correlation between the two.
//!
//! # Quick Start
//!
//! ```
//! use weight_trajectory::prelude::*;
//!
//! let mut params = ParameterSet::new();
//! params.insert("b.weight", Tensor::from_vec(vec![1.0, 2.0, 3.0]));
//! params.insert("a.bias", Tensor::from_vec(vec![0.5, 0.25]));
//!
//! let (weights, table) = vectorize(&params).unwrap();
//! assert_eq!(weights, vec![0.5, 0.25, 1.0, 2.0, 3.0]);
//!
//! let groups = group_by_layer(&weights, &table, None).unwrap();
//! assert_eq!(groups.get("b.weight"), Some(&[1.0, 2.0, 3.0][..]));
//!
//! let r = correlate(&weights, &weights).unwrap();
//! assert!((r.value() - 1.0).abs() < 1e-12);
//! ```
//!
//! # Modules
//!
//! - [`mod@vectorize`]: flatten a parameter set into one vector and its layer table
//! - [`layout`]: layer size tables and the position → layer index map
//! - [`mask`]: weight subsets
//! - [`group`]: split a vector back into per-layer groups
//! - [`stats`]: correlation and scatter series
//! - [`checkpoint`]: steps, step schedules and numeric ordering
//! - [`family`]: model families and variants
//! - [`source`]: where checkpoint parameters are loaded from
//! - [`store`]: persisted weight vectors
//! - [`collect`]: walk a variant's checkpoints and persist each vector
//! - [`frames`]: per-step comparison against the final checkpoint
//! - [`sink`]: frame consumers
//! - [`serialization`]: SafeTensors container reading and writing
//! - [`palette`]: layer colors
//! - [`config`]: run configuration

pub mod checkpoint;
pub mod collect;
pub mod config;
pub mod error;
pub mod family;
pub mod frames;
pub mod group;
pub mod layout;
pub mod mask;
pub mod palette;
pub mod prelude;
pub mod serialization;
pub mod sink;
pub mod source;
pub mod stats;
pub mod store;
pub mod tensor;
pub mod vectorize;

pub use error::{Result, TrajectoryError};
pub use vectorize::vectorize;
