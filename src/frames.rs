//! Per-step animation frames comparing every checkpoint to the final one.
//!
//! The final (numerically latest) checkpoint is the baseline. Every frame
//! pairs one step's weights (x) with the baseline's (y) over the same random
//! subset of positions, plus the correlation between the two vectors.

use crate::checkpoint::Step;
use crate::error::{Result, TrajectoryError};
use crate::group::{group_by_layer, LayerGroup};
use crate::mask::{SubsetSize, WeightMask};
use crate::palette::Palette;
use crate::stats::{correlate, correlate_masked, series_from_groups, Correlation, ScatterSeries};
use crate::store::{AggregateTrajectory, CheckpointRecord, TrajectoryStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which positions the per-frame correlation is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationScope {
    /// Every weight, regardless of the plotted subset.
    #[default]
    Full,
    /// Only the plotted subset.
    Masked,
}

/// Knobs of a frame-building pass.
#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub subset: SubsetSize,
    pub seed: u64,
    /// Stop after this many frames.
    pub num_steps: Option<usize>,
    pub scope: CorrelationScope,
    pub palette: Palette,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            subset: SubsetSize::All,
            seed: 0,
            num_steps: None,
            scope: CorrelationScope::Full,
            palette: Palette::default(),
        }
    }
}

/// Data for one animation frame.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub step: Step,
    /// Correlation between this step's and the baseline's weights.
    pub correlation: Correlation,
    /// One scatter series per layer, in layer-table order.
    pub layers: Vec<ScatterSeries>,
}

impl Frame {
    /// Legend text, e.g. `Step 1000\nCorrelation: 0.42`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.correlation.defined() {
            Some(r) => format!("Step {}\nCorrelation: {r:.2}", self.step),
            None => format!("Step {}\nCorrelation: undefined", self.step),
        }
    }

    /// Number of plotted points.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.layers.iter().map(ScatterSeries::len).sum()
    }
}

/// Where persisted checkpoints are read from.
#[derive(Debug)]
pub enum RecordSource {
    /// One `<step>.safetensors` file per step.
    Directory {
        store: TrajectoryStore,
        repo_name: String,
    },
    /// A single aggregate trajectory file.
    Aggregate(AggregateTrajectory),
}

impl RecordSource {
    /// Steps available, ordered numerically.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the trajectory does not exist.
    pub fn steps(&self) -> Result<Vec<Step>> {
        match self {
            Self::Directory { store, repo_name } => Ok(store
                .list(repo_name)?
                .into_iter()
                .map(|(step, _)| step)
                .collect()),
            Self::Aggregate(agg) => Ok(agg.steps().to_vec()),
        }
    }

    /// Load one step.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the step is not (or no longer) present.
    pub fn load(&self, step: Step) -> Result<CheckpointRecord> {
        match self {
            Self::Directory { store, repo_name } => store.load(repo_name, step),
            Self::Aggregate(agg) => agg.get(step),
        }
    }

    fn describe(&self) -> PathBuf {
        match self {
            Self::Directory { store, repo_name } => store.variant_dir(repo_name),
            Self::Aggregate(_) => PathBuf::from("<aggregate>"),
        }
    }
}

/// Lazy iterator of frames, one per persisted step in numeric order.
///
/// Holds the baseline checkpoint and its grouping; each frame loads and
/// drops one more checkpoint.
#[derive(Debug)]
pub struct FrameBuilder {
    source: RecordSource,
    baseline: CheckpointRecord,
    baseline_groups: LayerGroup,
    mask: Option<WeightMask>,
    options: FrameOptions,
    steps: std::vec::IntoIter<Step>,
}

impl FrameBuilder {
    /// Load the baseline and prepare the step list.
    ///
    /// # Errors
    ///
    /// - `MissingArtifact` if no checkpoint has been persisted
    /// - any error from loading the baseline or drawing the mask
    pub fn open(source: RecordSource, options: FrameOptions) -> Result<Self> {
        let mut steps = source.steps()?;
        let Some(&final_step) = steps.last() else {
            return Err(TrajectoryError::missing(None, source.describe()));
        };
        tracing::info!(step = %final_step, "loading final weights");
        let baseline = source.load(final_step)?;

        let mask = WeightMask::for_subset(options.subset, baseline.weights.len(), options.seed)?;
        let baseline_groups = group_by_layer(&baseline.weights, &baseline.table, mask.as_ref())?;

        if let Some(n) = options.num_steps {
            steps.truncate(n);
        }

        Ok(Self {
            source,
            baseline,
            baseline_groups,
            mask,
            options,
            steps: steps.into_iter(),
        })
    }

    /// Step of the baseline checkpoint.
    #[must_use]
    pub fn baseline_step(&self) -> Step {
        self.baseline.step
    }

    /// The subset mask, if the frames are subsampled.
    #[must_use]
    pub fn mask(&self) -> Option<&WeightMask> {
        self.mask.as_ref()
    }

    /// Steps not yet turned into frames.
    #[must_use]
    pub fn pending(&self) -> &[Step] {
        self.steps.as_slice()
    }

    /// Iterate frames paired with their step, so a failed step can be named.
    pub fn with_steps(mut self) -> impl Iterator<Item = (Step, Result<Frame>)> {
        std::iter::from_fn(move || {
            let step = self.steps.next()?;
            Some((step, self.build(step)))
        })
    }

    fn build(&self, step: Step) -> Result<Frame> {
        let record = self.source.load(step)?;
        if !record.table.same_layout(&self.baseline.table) {
            return Err(TrajectoryError::invalid_input(format!(
                "step {step} has a different layer layout than the final checkpoint {}",
                self.baseline.step
            )));
        }

        let correlation = match (self.options.scope, &self.mask) {
            (CorrelationScope::Masked, Some(mask)) => {
                correlate_masked(&record.weights, &self.baseline.weights, mask)?
            }
            _ => correlate(&record.weights, &self.baseline.weights)?,
        };
        let groups = group_by_layer(&record.weights, &record.table, self.mask.as_ref())?;
        let layers = series_from_groups(groups, &self.baseline_groups, &self.options.palette)?;

        Ok(Frame {
            step,
            correlation,
            layers,
        })
    }
}

impl Iterator for FrameBuilder {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.steps.next()?;
        Some(self.build(step))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.steps.size_hint()
    }
}

impl ExactSizeIterator for FrameBuilder {}

#[cfg(test)]
#[path = "frames_tests.rs"]
mod tests;
