//! wtraj - weight trajectories of checkpointed language models
//!
//! Usage:
//!   wtraj steps                                       # Print the checkpoint schedule
//!   wtraj collect --variants 70m --source-dir ./hub   # Vectorize and persist every checkpoint
//!   wtraj visualize --variants 70m --random-weight-subset 0.01
//!   wtraj inspect trajectories/EleutherAI/pythia-70m-deduped/1000.safetensors

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use weight_trajectory::config::TrajectoryConfig;

mod commands;
mod error;
mod output;

use commands::{collect, inspect, steps, visualize};

/// wtraj - weight trajectories of checkpointed language models
///
/// Collects every checkpoint of a model as one flat weight vector and
/// compares each step against the final weights, layer by layer.
#[derive(Parser, Debug)]
#[command(name = "wtraj")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file; flags override its values
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Vectorize every checkpoint of the selected variants and persist it
    Collect(collect::CollectArgs),

    /// Build per-step frames comparing each checkpoint to the final one
    Visualize(visualize::VisualizeArgs),

    /// Print the checkpoint step schedule
    Steps(steps::StepsArgs),

    /// Show the layer table and per-layer statistics of a persisted file
    Inspect {
        /// Persisted `<step>.safetensors` or aggregate trajectory file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> error::Result<TrajectoryConfig> {
    match path {
        Some(path) => Ok(TrajectoryConfig::from_json_file(path)?),
        None => Ok(TrajectoryConfig::default()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Collect(args) => collect::run(config, &args, cli.json, cli.quiet),
        Commands::Visualize(args) => visualize::run(config, &args, cli.json, cli.quiet),
        Commands::Steps(args) => steps::run(&config, &args, cli.json),
        Commands::Inspect { file } => inspect::run(&file, cli.json),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}
