//! Steps command implementation

use crate::error::Result;
use crate::output;
use clap::Args;
use weight_trajectory::checkpoint::StepSchedule;
use weight_trajectory::config::TrajectoryConfig;

#[derive(Args, Debug)]
pub(crate) struct StepsArgs {
    /// Last training step (default: the configured family's schedule)
    #[arg(long)]
    budget: Option<u64>,
}

/// Run the steps command
pub(crate) fn run(config: &TrajectoryConfig, args: &StepsArgs, json_output: bool) -> Result<()> {
    let schedule = match args.budget {
        Some(budget) => StepSchedule::pythia(budget),
        None => config.family.schedule.clone(),
    };

    if json_output {
        return output::json(&schedule);
    }

    output::section(&format!("{} checkpoint schedule", config.family.name));
    output::kv("Checkpoints", schedule.len());
    if let Some(latest) = schedule.latest() {
        output::kv("Final step", latest);
    }
    let revisions: Vec<String> = schedule.iter().map(|s| s.revision()).collect();
    for chunk in revisions.chunks(10) {
        println!("  {}", chunk.join(" "));
    }
    Ok(())
}
