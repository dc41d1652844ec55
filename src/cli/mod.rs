//! Command-line interface
//!
//! Argument types live in [`args`]; each subcommand has its own handler
//! under `commands`.

mod args;
mod commands;
mod logging;

pub use args::{parse_args, Cli, Command, EvalStsArgs, FetchArgs, ScenarioArgs, TrainNliArgs};
pub use commands::run_command;
pub use logging::{init_tracing, LogLevel};
