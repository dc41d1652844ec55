//! CLI command implementations

mod eval_sts;
mod fetch;
mod scenario;
mod train_nli;

use crate::cli::{init_tracing, Cli, Command, LogLevel};

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    init_tracing(LogLevel::from_flags(cli.quiet, cli.verbose));

    match cli.command {
        Command::Fetch(args) => fetch::run_fetch(args),
        Command::TrainNli(args) => train_nli::run_train_nli(args),
        Command::EvalSts(args) => eval_sts::run_eval_sts(args),
        Command::Scenario(args) => scenario::run_scenario(args),
    }
}

/// Format a library error with its code for terminal output
fn report(e: crate::Error) -> String {
    format!("[{}] {e}", e.code())
}
