//! Collect command implementation
//!
//! Walks every scheduled checkpoint of the selected variants, vectorizes it
//! and writes `<output-dir>/<repo>/<step>.safetensors`. Steps already on disk
//! are skipped, so an interrupted run can simply be started again.

use crate::error::{CliError, Result};
use crate::output;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use weight_trajectory::checkpoint::{Step, StepSchedule};
use weight_trajectory::collect::{CollectSummary, StepOutcome, StepStatus, TrajectoryCollector};
use weight_trajectory::config::TrajectoryConfig;
use weight_trajectory::source::SafeTensorsDirSource;

#[derive(Args, Debug)]
pub(crate) struct CollectArgs {
    /// Variant ids, comma-separated (default: every variant)
    #[arg(long, value_delimiter = ',')]
    variants: Vec<String>,

    /// Downloaded checkpoints, laid out as `<DIR>/<repo>/step<N>/*.safetensors`
    #[arg(long, value_name = "DIR")]
    source_dir: Option<PathBuf>,

    /// Where weight vectors are written
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Also write one aggregate trajectory file per variant
    #[arg(long)]
    aggregate: bool,

    /// Last training step of the schedule
    #[arg(long)]
    budget: Option<u64>,

    /// Explicit steps instead of the schedule, comma-separated
    #[arg(long, value_delimiter = ',', conflicts_with = "budget")]
    steps: Vec<u64>,
}

impl CollectArgs {
    fn apply(&self, mut config: TrajectoryConfig) -> TrajectoryConfig {
        if !self.variants.is_empty() {
            config = config.with_variants(self.variants.iter().cloned());
        }
        if let Some(dir) = &self.source_dir {
            config = config.with_source_dir(dir);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_trajectory_dir(dir);
        }
        if self.aggregate {
            config = config.with_aggregate(true);
        }
        if let Some(budget) = self.budget {
            config.family.schedule = StepSchedule::pythia(budget);
        }
        if !self.steps.is_empty() {
            config.family.schedule = StepSchedule::new(self.steps.iter().copied().map(Step));
        }
        config
    }
}

/// Per-variant result for display/JSON
#[derive(Serialize)]
struct VariantReport {
    repo: String,
    saved: usize,
    skipped: usize,
    failed: Vec<Step>,
    aggregate: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run the collect command
pub(crate) fn run(
    config: TrajectoryConfig,
    args: &CollectArgs,
    json_output: bool,
    quiet: bool,
) -> Result<()> {
    let config = args.apply(config);
    config.validate()?;
    let source_dir = config.source_dir.clone().ok_or_else(|| {
        CliError::InvalidArgument("--source-dir is required (or source_dir in --config)".into())
    })?;
    if !source_dir.is_dir() {
        return Err(CliError::NotFound(source_dir));
    }

    let store = config.store();
    let source = SafeTensorsDirSource::new(source_dir, config.family.clone());
    let show = !json_output && !quiet;

    let mut reports = Vec::new();
    for variant in config.selected_variants()? {
        let mut collector = TrajectoryCollector::new(&source, &store, &config.family, &variant);
        let repo = collector.repo_name().to_string();
        if show {
            output::section(&repo);
        }

        let mut summary = CollectSummary::default();
        for outcome in collector.by_ref() {
            if show {
                print_outcome(&outcome);
            }
            summary.record(&outcome);
        }

        let mut error = None;
        let aggregate = if config.aggregate && summary.saved + summary.skipped > 0 {
            match store.write_aggregate(&repo) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(variant = %repo, error = %e, "aggregate write failed");
                    if show {
                        output::fail(&format!("aggregate: {e}"));
                    }
                    error = Some(e.to_string());
                    None
                }
            }
        } else {
            None
        };

        if show {
            output::kv("Saved", summary.saved);
            output::kv("Skipped", summary.skipped);
            output::kv("Failed", summary.failed.len());
            if let Some(path) = &aggregate {
                output::kv("Aggregate", path.display());
            }
        }
        reports.push(VariantReport {
            repo,
            saved: summary.saved,
            skipped: summary.skipped,
            failed: summary.failed,
            aggregate,
            error,
        });
    }

    if json_output {
        output::json(&reports)?;
    }

    let broken = reports.iter().filter(|r| r.error.is_some()).count();
    if broken > 0 {
        return Err(CliError::VariantsFailed {
            failed: broken,
            total: reports.len(),
        });
    }

    let failed: usize = reports.iter().map(|r| r.failed.len()).sum();
    let total: usize = reports
        .iter()
        .map(|r| r.saved + r.skipped + r.failed.len())
        .sum();
    if failed > 0 {
        return Err(CliError::Incomplete { failed, total });
    }
    Ok(())
}

fn print_outcome(outcome: &StepOutcome) {
    let step = outcome.step;
    match &outcome.status {
        StepStatus::Saved {
            n_weights,
            n_layers,
            ..
        } => output::success(&format!(
            "step {step}: {} weights in {n_layers} layers",
            output::count(*n_weights)
        )),
        StepStatus::Skipped { path } => {
            output::skipped(&format!("step {step}: {}", path.display()));
        }
        StepStatus::Failed(e) => output::fail(&format!("step {step}: {e}")),
    }
}
