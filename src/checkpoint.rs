//! Training-step identifiers and their ordering.
//!
//! Steps are always compared as numbers. Sorting checkpoint file names as
//! strings puts `1000.safetensors` before `512.safetensors` and scrambles the
//! trajectory.

use crate::error::{Result, TrajectoryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A training step. Step 0 is the randomly initialized model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Step(pub u64);

impl Step {
    /// The pre-training (random initialization) checkpoint.
    pub const INIT: Step = Step(0);

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Revision label used by the checkpoint hub, e.g. `step1000`.
    #[must_use]
    pub fn revision(self) -> String {
        format!("step{}", self.0)
    }

    /// File name of this step's persisted vector, e.g. `1000.safetensors`.
    #[must_use]
    pub fn file_name(self, extension: &str) -> String {
        format!("{}.{extension}", self.0)
    }

    /// Parse the step out of a `<step>.<ext>` file name.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.split('.').next()?;
        if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        stem.parse().ok().map(Step)
    }

    /// Parse the step out of a path's file name.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::from_file_name)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Step {
    type Err = TrajectoryError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("step").unwrap_or(s);
        s.parse::<u64>()
            .map(Step)
            .map_err(|e| TrajectoryError::invalid_input(format!("invalid step '{s}': {e}")))
    }
}

/// Step budget of the Pythia training runs.
pub const PYTHIA_BUDGET: u64 = 143_000;

/// Largest power-of-two step in the log-spaced prefix.
pub const LOG_SPACED_MAX: u64 = 512;

/// Interval of the linearly spaced checkpoints.
pub const LINEAR_INTERVAL: u64 = 1000;

/// Ordered, de-duplicated list of checkpoint steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepSchedule {
    steps: Vec<Step>,
}

impl StepSchedule {
    /// Schedule from arbitrary steps (sorted numerically, duplicates dropped).
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let mut steps: Vec<Step> = steps.into_iter().collect();
        steps.sort_unstable();
        steps.dedup();
        Self { steps }
    }

    /// `0`, powers of two `1..=512`, then multiples of 1000 up to `budget`.
    ///
    /// # Examples
    ///
    /// ```
    /// use weight_trajectory::checkpoint::{Step, StepSchedule};
    ///
    /// let schedule = StepSchedule::pythia(3000);
    /// let raw: Vec<u64> = schedule.iter().map(|s| s.get()).collect();
    /// assert_eq!(raw, vec![0, 1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1000, 2000, 3000]);
    /// ```
    #[must_use]
    pub fn pythia(budget: u64) -> Self {
        let log_spaced = std::iter::successors(Some(1u64), |s| Some(s * 2))
            .take_while(|&s| s <= LOG_SPACED_MAX.min(budget));
        let linear = (1..)
            .map(|i| i * LINEAR_INTERVAL)
            .take_while(|&s| s <= budget);
        Self::new(
            std::iter::once(0)
                .chain(log_spaced)
                .chain(linear)
                .map(Step),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = Step> + '_ {
        self.steps.iter().copied()
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Last (largest) step.
    #[must_use]
    pub fn latest(&self) -> Option<Step> {
        self.steps.last().copied()
    }

    /// First `n` steps.
    #[must_use]
    pub fn truncated(&self, n: usize) -> Self {
        Self {
            steps: self.steps.iter().take(n).copied().collect(),
        }
    }
}

impl Default for StepSchedule {
    fn default() -> Self {
        Self::pythia(PYTHIA_BUDGET)
    }
}

/// Sort `(step, path)` pairs by numeric step.
pub fn sort_by_step(files: &mut [(Step, PathBuf)]) {
    files.sort_by_key(|(step, _)| *step);
}

/// Keep the paths that name a checkpoint and order them by numeric step.
///
/// Paths whose file name does not start with a step number are dropped.
#[must_use]
pub fn sort_checkpoint_files(paths: impl IntoIterator<Item = PathBuf>) -> Vec<(Step, PathBuf)> {
    let mut files: Vec<(Step, PathBuf)> = paths
        .into_iter()
        .filter_map(|path| match Step::from_path(&path) {
            Some(step) => Some((step, path)),
            None => {
                tracing::debug!(path = %path.display(), "ignoring non-checkpoint file");
                None
            }
        })
        .collect();
    sort_by_step(&mut files);
    files
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
