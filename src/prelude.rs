//! Convenience re-exports.
//!
//! ```
//! use weight_trajectory::prelude::*;
//! ```

pub use crate::checkpoint::{Step, StepSchedule};
pub use crate::collect::{CollectSummary, StepOutcome, StepStatus, TrajectoryCollector};
pub use crate::config::TrajectoryConfig;
pub use crate::error::{Result, TrajectoryError};
pub use crate::family::{ModelFamily, Variant};
pub use crate::frames::{CorrelationScope, Frame, FrameBuilder, FrameOptions, RecordSource};
pub use crate::group::{group_by_layer, LayerGroup, LayerStats};
pub use crate::layout::{build_index_map, LayerEntry, LayerSizeTable};
pub use crate::mask::{SubsetSize, WeightMask};
pub use crate::palette::Palette;
pub use crate::sink::{FrameSink, JsonLinesSink};
pub use crate::source::{InMemorySource, ParameterSource, SafeTensorsDirSource};
pub use crate::stats::{correlate, correlate_masked, Correlation, ScatterSeries};
pub use crate::store::{AggregateTrajectory, CheckpointRecord, TrajectoryStore};
pub use crate::tensor::{ParameterSet, Tensor};
pub use crate::vectorize::vectorize;
