//! # hpp CLI Entry Point
//!
//! Parses arguments, loads the configuration and dispatches to the
//! subcommand handlers. Errors propagate out of `main`, which exits with
//! status 1.

use std::path::PathBuf;

use clap::Parser;
use hpp_cli::data::LoadDataArgs;
use hpp_cli::evaluate::EvaluateArgs;
use hpp_cli::models::ModelsArgs;
use hpp_cli::pipeline::PipelineArgs;
use hpp_cli::train::TrainArgs;

/// California housing price pipeline.
///
/// Prepares the dataset, trains and registers models, and evaluates the
/// serving model.
#[derive(Parser, Debug)]
#[command(name = "hpp", version, about)]
struct Cli {
    /// Pipeline configuration file.
    #[arg(long, short, env = "HPP_CONFIG", default_value = "configs/config.yaml", global = true)]
    config: PathBuf,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download, summarize and split the dataset.
    LoadData(LoadDataArgs),
    /// Search hyperparameters and register the best model.
    Train(TrainArgs),
    /// Score the serving model on the test split.
    Evaluate(EvaluateArgs),
    /// Run load-data, train and evaluate in sequence.
    Pipeline(PipelineArgs),
    /// Inspect and manage registered model versions.
    Models(ModelsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Only the default path may be absent.
    let allow_missing = cli.config == PathBuf::from("configs/config.yaml");
    let mut config = hpp_cli::load_config(&cli.config, allow_missing)?;
    hpp_cli::init_tracing(&config.logging, cli.verbose);
    if !cli.config.exists() {
        tracing::warn!(path = %cli.config.display(), "configuration file not found, using defaults");
    }

    match cli.command {
        Commands::LoadData(args) => {
            args.apply(&mut config);
            hpp_cli::data::run(&args, &config)?;
        }
        Commands::Train(args) => {
            args.apply(&mut config)?;
            hpp_cli::train::run(&config)?;
        }
        Commands::Evaluate(args) => {
            args.apply(&mut config);
            hpp_cli::evaluate::run(&config)?;
        }
        Commands::Pipeline(args) => hpp_cli::pipeline::run(&args, &config)?,
        Commands::Models(args) => hpp_cli::models::run(&args, &config)?,
    }

    Ok(())
}
