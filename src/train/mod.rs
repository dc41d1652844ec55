//! Training loop
//!
//! - [`FitConfig`] - YAML-loadable run configuration
//! - [`Trainer`] - the `fit` loop over one or more [`TrainObjective`]s
//! - [`checkpoint`] - step checkpoints with retention and resumable state
//! - [`callback`] - hooks into training events

pub mod callback;
pub mod checkpoint;
mod config;
mod trainer;

#[cfg(test)]
mod tests;

pub use callback::{CallbackAction, CallbackContext, CallbackManager, LoggingCallback, TrainerCallback};
pub use checkpoint::{CheckpointManager, ResumeState, TrainerState};
pub use config::{FitConfig, OptimizerConfig, OptimizerKind};
pub use trainer::{FitResult, TrainObjective, Trainer};
