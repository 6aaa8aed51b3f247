//! Visualize command implementation
//!
//! Builds one frame per persisted checkpoint (scatter of this step's weights
//! against the final step's, per layer, plus their correlation) and writes
//! them to `<output-dir>/<repo>.frames.jsonl` for a renderer to draw.

use crate::error::{CliError, Result};
use crate::output;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use weight_trajectory::checkpoint::Step;
use weight_trajectory::config::TrajectoryConfig;
use weight_trajectory::frames::{CorrelationScope, FrameBuilder, RecordSource};
use weight_trajectory::mask::SubsetSize;
use weight_trajectory::sink::{FrameSink, JsonLinesSink};
use weight_trajectory::store::AggregateTrajectory;

#[derive(Args, Debug)]
pub(crate) struct VisualizeArgs {
    /// Variant ids, comma-separated (default: every variant)
    #[arg(long, value_delimiter = ',')]
    variants: Vec<String>,

    /// Where `collect` wrote the weight vectors
    #[arg(long, value_name = "DIR")]
    trajectory_dir: Option<PathBuf>,

    /// Where frame files are written
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Plot a random subset: a fraction in (0, 1] or a count above 1
    #[arg(long, value_name = "N")]
    random_weight_subset: Option<f64>,

    /// Only the first N steps
    #[arg(long)]
    num_steps: Option<usize>,

    /// Seed of the random subset
    #[arg(long)]
    seed: Option<u64>,

    /// Correlate only the plotted subset instead of every weight
    #[arg(long)]
    masked_correlation: bool,

    /// Read the aggregate trajectory file instead of per-step files
    #[arg(long)]
    aggregate: bool,
}

impl VisualizeArgs {
    fn apply(&self, mut config: TrajectoryConfig) -> Result<TrajectoryConfig> {
        if !self.variants.is_empty() {
            config = config.with_variants(self.variants.iter().cloned());
        }
        if let Some(dir) = &self.trajectory_dir {
            config = config.with_trajectory_dir(dir);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        if self.random_weight_subset.is_some() {
            config = config.with_subset(SubsetSize::from_arg(self.random_weight_subset)?);
        }
        if let Some(n) = self.num_steps {
            config = config.with_num_steps(n);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if self.masked_correlation {
            config = config.with_scope(CorrelationScope::Masked);
        }
        if self.aggregate {
            config = config.with_aggregate(true);
        }
        Ok(config)
    }
}

/// Per-variant result for display/JSON
#[derive(Serialize)]
struct FramesReport {
    repo: String,
    baseline: Step,
    points: Option<usize>,
    frames: usize,
    failed: Vec<Step>,
    output: PathBuf,
}

/// A variant whose trajectory could not be opened or written
#[derive(Serialize)]
struct VariantFailure {
    repo: String,
    error: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum VariantReport {
    Rendered(FramesReport),
    Failed(VariantFailure),
}

/// Run the visualize command
pub(crate) fn run(
    config: TrajectoryConfig,
    args: &VisualizeArgs,
    json_output: bool,
    quiet: bool,
) -> Result<()> {
    let config = args.apply(config)?;
    config.validate()?;
    let show = !json_output && !quiet;

    let mut reports = Vec::new();
    let mut first_error = None;
    let mut total = 0;
    for variant in config.selected_variants()? {
        let repo = config.family.repo_name(&variant);
        match render_variant(&config, &repo, show) {
            Ok((report, steps)) => {
                total += steps;
                reports.push(VariantReport::Rendered(report));
            }
            Err(e) => {
                tracing::warn!(variant = %repo, error = %e, "variant skipped");
                if show {
                    output::section(&repo);
                    output::fail(&e.to_string());
                }
                reports.push(VariantReport::Failed(VariantFailure {
                    repo,
                    error: e.to_string(),
                }));
                first_error.get_or_insert(e);
            }
        }
    }

    if json_output {
        output::json(&reports)?;
    }

    let variants = reports.len();
    let rendered: Vec<&FramesReport> = reports
        .iter()
        .filter_map(|r| match r {
            VariantReport::Rendered(report) => Some(report),
            VariantReport::Failed(_) => None,
        })
        .collect();
    if let Some(e) = first_error {
        if rendered.is_empty() {
            return Err(e);
        }
        return Err(CliError::VariantsFailed {
            failed: variants - rendered.len(),
            total: variants,
        });
    }

    let failed: usize = rendered.iter().map(|r| r.failed.len()).sum();
    if failed > 0 {
        return Err(CliError::Incomplete { failed, total });
    }
    Ok(())
}

/// Write the frame file of one variant; returns its report and step count.
fn render_variant(
    config: &TrajectoryConfig,
    repo: &str,
    show: bool,
) -> Result<(FramesReport, usize)> {
    let store = config.store();
    let source = if config.aggregate {
        RecordSource::Aggregate(AggregateTrajectory::open(store.aggregate_path(repo))?)
    } else {
        RecordSource::Directory {
            store,
            repo_name: repo.to_string(),
        }
    };

    let builder = FrameBuilder::open(source, config.frame_options())?;
    let baseline = builder.baseline_step();
    let points = builder.mask().map(|m| m.len());
    let steps = builder.len();
    if show {
        output::section(repo);
        output::kv("Final step", baseline);
        output::kv(
            "Points",
            points.map_or_else(|| "all".to_string(), output::count),
        );
    }

    let mut sink = JsonLinesSink::create(&config.output_dir, repo)?;
    let mut failed = Vec::new();
    for (step, frame) in builder.with_steps() {
        match frame {
            Ok(frame) => {
                if show {
                    println!("  {}", frame.label().replace('\n', "  "));
                }
                sink.push(&frame)?;
            }
            Err(e) => {
                tracing::warn!(variant = %repo, %step, error = %e, "frame failed");
                if show {
                    output::fail(&format!("step {step}: {e}"));
                }
                failed.push(step);
            }
        }
    }
    let frames = sink.frames();
    let path = sink.finish()?;
    if show {
        output::kv("Frames", frames);
        output::kv("Output", path.display());
    }

    let report = FramesReport {
        repo: repo.to_string(),
        baseline,
        points,
        frames,
        failed,
        output: path,
    };
    Ok((report, steps))
}
