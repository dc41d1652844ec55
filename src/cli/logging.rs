//! Subscriber setup for CLI runs

use tracing_subscriber::EnvFilter;

/// Log level for CLI output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    /// Warnings and errors only
    Quiet,
    /// Info
    Normal,
    /// Debug
    Verbose,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Level from the `-q` flag and `-v` count
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            _ => Self::Trace,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Install a fmt subscriber; `RUST_LOG` wins over the flag-derived level
pub fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
