//! sentence-tune CLI
//!
//! # Usage
//!
//! ```bash
//! # Download the benchmark archives
//! sentence-tune fetch --data-dir datasets
//!
//! # Fine-tune on NLI, evaluating on STS dev
//! sentence-tune train-nli --config fit.yaml --output output/nli
//!
//! # Score a saved model on STS test
//! sentence-tune eval-sts output/nli --expected 70.0
//!
//! # Save, train, reload, resume
//! sentence-tune scenario --root sample -v
//! ```

use clap::Parser;
use sentence_tune::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
