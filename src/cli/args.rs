//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sentence-tune: sentence-embedding fine-tuning with resumable checkpoints
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "sentence-tune")]
#[command(version)]
#[command(about = "Fine-tune sentence embedders on NLI/STS with resumable checkpoints")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Download the STS benchmark and AllNLI archives if missing
    Fetch(FetchArgs),

    /// Fine-tune on NLI pairs with a softmax classification head
    TrainNli(TrainNliArgs),

    /// Score a saved model on the STS benchmark
    EvalSts(EvalStsArgs),

    /// Run the save, train, reload, resume round trip
    Scenario(ScenarioArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct FetchArgs {
    /// Directory receiving the archives
    #[arg(long, default_value = "datasets")]
    pub data_dir: PathBuf,
}

/// Arguments for the train-nli command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainNliArgs {
    /// YAML fit configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the benchmark archives
    #[arg(long, default_value = "datasets")]
    pub data_dir: PathBuf,

    /// Start from a saved model or pretrained directory instead of random init
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Embedding width for random init
    #[arg(long, default_value = "64")]
    pub dimension: usize,

    /// Where to save the trained model
    #[arg(short, long, default_value = "output/nli")]
    pub output: PathBuf,

    /// NLI pairs to read
    #[arg(long, default_value = "10000")]
    pub max_examples: usize,

    /// Batch size
    #[arg(short, long, default_value = "16")]
    pub batch_size: usize,

    /// Override number of epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override learning rate
    #[arg(short, long)]
    pub lr: Option<f32>,

    /// Override the checkpoint root
    #[arg(long)]
    pub checkpoint_path: Option<PathBuf>,

    /// Enable mixed-precision emulation
    #[arg(long)]
    pub amp: bool,
}

/// Arguments for the eval-sts command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct EvalStsArgs {
    /// Saved model directory
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Directory holding the benchmark archives
    #[arg(long, default_value = "datasets")]
    pub data_dir: PathBuf,

    /// Evaluate on the dev split instead of test
    #[arg(long)]
    pub dev: bool,

    /// Expected score (x100); fail when the result regresses past it
    #[arg(long)]
    pub expected: Option<f32>,

    /// Append results to a CSV in this directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for the scenario command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ScenarioArgs {
    /// YAML scenario configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Override the data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Use a local pretrained directory as the base model
    #[arg(long)]
    pub pretrained: Option<PathBuf>,

    /// Expected STS test score (x100)
    #[arg(long)]
    pub expected: Option<f32>,

    /// Keep the model and checkpoint directories
    #[arg(long)]
    pub keep: bool,
}

/// Parse CLI arguments from an iterator (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
