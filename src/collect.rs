//! Walk a variant's checkpoints in step order and persist each one's vector.
//!
//! [`TrajectoryCollector`] is a lazy, finite iterator. Each `next()` handles
//! exactly one step (load, vectorize, save, drop), so at most one checkpoint's
//! parameters are alive at a time. Steps already on disk are skipped, which
//! makes an interrupted run safe to restart. A failing step is reported and
//! the walk moves on to the next one.

use crate::checkpoint::{Step, StepSchedule};
use crate::error::TrajectoryError;
use crate::family::{ModelFamily, Variant};
use crate::source::ParameterSource;
use crate::store::{CheckpointRecord, TrajectoryStore};
use crate::vectorize::vectorize;
use std::path::PathBuf;

/// What happened to one step.
#[derive(Debug)]
pub enum StepStatus {
    /// Vectorized and written to `path`.
    Saved {
        path: PathBuf,
        /// Length of the weight vector
        n_weights: usize,
        /// Number of layers in the table
        n_layers: usize,
    },
    /// Already persisted at `path`; nothing was loaded.
    Skipped { path: PathBuf },
    /// Loading, vectorizing or saving failed.
    Failed(TrajectoryError),
}

/// Outcome of one step of a collection run.
#[derive(Debug)]
pub struct StepOutcome {
    pub step: Step,
    pub status: StepStatus,
}

impl StepOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }
}

/// Lazy per-step collection of one variant's trajectory.
pub struct TrajectoryCollector<'a, S: ParameterSource + ?Sized> {
    source: &'a S,
    store: &'a TrajectoryStore,
    variant: Variant,
    repo_name: String,
    steps: std::vec::IntoIter<Step>,
}

impl<'a, S: ParameterSource + ?Sized> TrajectoryCollector<'a, S> {
    /// Collector over `family.schedule` for `variant`.
    #[must_use]
    pub fn new(
        source: &'a S,
        store: &'a TrajectoryStore,
        family: &ModelFamily,
        variant: &Variant,
    ) -> Self {
        Self::with_schedule(source, store, family, variant, &family.schedule)
    }

    /// Collector over an explicit schedule.
    #[must_use]
    pub fn with_schedule(
        source: &'a S,
        store: &'a TrajectoryStore,
        family: &ModelFamily,
        variant: &Variant,
        schedule: &StepSchedule,
    ) -> Self {
        Self {
            source,
            store,
            variant: variant.clone(),
            repo_name: family.repo_name(variant),
            steps: schedule.steps().to_vec().into_iter(),
        }
    }

    /// Repository name the results are stored under.
    #[must_use]
    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    /// Steps not yet visited.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    fn process(&self, step: Step) -> StepStatus {
        let path = self.store.step_path(&self.repo_name, step);
        if path.is_file() {
            tracing::info!(variant = %self.repo_name, %step, "already saved");
            return StepStatus::Skipped { path };
        }

        tracing::info!(variant = %self.repo_name, %step, "loading checkpoint");
        let result = self
            .source
            .load(&self.variant, step)
            .and_then(|params| vectorize(&params))
            .and_then(|(weights, table)| CheckpointRecord::new(step, weights, table))
            .and_then(|record| {
                let n_weights = record.weights.len();
                let n_layers = record.table.len();
                let path = self.store.save(&self.repo_name, &record)?;
                Ok((path, n_weights, n_layers))
            });

        match result {
            Ok((path, n_weights, n_layers)) => StepStatus::Saved {
                path,
                n_weights,
                n_layers,
            },
            Err(e) => {
                tracing::warn!(variant = %self.repo_name, %step, error = %e, "checkpoint failed");
                StepStatus::Failed(e)
            }
        }
    }
}

impl<S: ParameterSource + ?Sized> Iterator for TrajectoryCollector<'_, S> {
    type Item = StepOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.steps.next()?;
        Some(StepOutcome {
            step,
            status: self.process(step),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.steps.size_hint()
    }
}

impl<S: ParameterSource + ?Sized> ExactSizeIterator for TrajectoryCollector<'_, S> {}

/// Tally of a finished collection run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectSummary {
    pub saved: usize,
    pub skipped: usize,
    pub failed: Vec<Step>,
}

impl CollectSummary {
    pub fn record(&mut self, outcome: &StepOutcome) {
        match outcome.status {
            StepStatus::Saved { .. } => self.saved += 1,
            StepStatus::Skipped { .. } => self.skipped += 1,
            StepStatus::Failed(_) => self.failed.push(outcome.step),
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
#[path = "collect_tests.rs"]
mod tests;
