//! Inspect command implementation
//!
//! Shows the layer table of a persisted weight vector with per-layer
//! statistics. Aggregate trajectory files list their steps instead.

use crate::error::{CliError, Result};
use crate::output;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use weight_trajectory::checkpoint::Step;
use weight_trajectory::group::{group_by_layer, LayerStats};
use weight_trajectory::store::{read_record, AggregateTrajectory, AGGREGATE_SUFFIX};

/// Checkpoint summary for display/JSON
#[derive(Serialize)]
struct RecordInfo {
    file: String,
    step: Step,
    n_weights: usize,
    layers: Vec<LayerStats>,
}

/// Aggregate summary for display/JSON
#[derive(Serialize)]
struct AggregateInfo {
    file: String,
    steps: Vec<Step>,
}

/// Run the inspect command
pub(crate) fn run(path: &Path, json_output: bool) -> Result<()> {
    if !path.exists() {
        return Err(CliError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(CliError::InvalidArgument(format!(
            "not a file: {}",
            path.display()
        )));
    }

    let is_aggregate = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(AGGREGATE_SUFFIX));
    if is_aggregate {
        return inspect_aggregate(path, json_output);
    }

    let record = read_record(path)?;
    let groups = group_by_layer(&record.weights, &record.table, None)?;
    let info = RecordInfo {
        file: path.display().to_string(),
        step: record.step,
        n_weights: record.weights.len(),
        layers: groups.stats(),
    };

    if json_output {
        return output::json(&info);
    }

    output::section(&info.file);
    output::kv("Step", info.step);
    output::kv("Weights", output::count(info.n_weights));
    output::kv("Layers", info.layers.len());
    println!();
    println!(
        "  {:<56} {:>12} {:>10} {:>10} {:>10} {:>10}",
        "layer".bold(),
        "count".bold(),
        "mean".bold(),
        "std".bold(),
        "min".bold(),
        "max".bold()
    );
    for layer in &info.layers {
        println!(
            "  {:<56} {:>12} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            layer.name,
            output::count(layer.count),
            layer.mean,
            layer.std,
            layer.min,
            layer.max
        );
    }
    Ok(())
}

fn inspect_aggregate(path: &Path, json_output: bool) -> Result<()> {
    let aggregate = AggregateTrajectory::open(path)?;
    let info = AggregateInfo {
        file: path.display().to_string(),
        steps: aggregate.steps().to_vec(),
    };

    if json_output {
        return output::json(&info);
    }

    output::section(&info.file);
    output::kv("Checkpoints", info.steps.len());
    if let (Some(first), Some(last)) = (info.steps.first(), info.steps.last()) {
        output::kv("Steps", format!("{first} .. {last}"));
    }
    Ok(())
}
