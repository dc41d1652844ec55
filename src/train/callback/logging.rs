//! Structured progress logging

use std::path::Path;

use tracing::{debug, info};

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};

/// Logs training progress through `tracing`
#[derive(Clone, Debug)]
pub struct LoggingCallback {
    /// Log every N global steps
    log_interval: usize,
}

impl LoggingCallback {
    /// Create logging callback
    pub fn new(log_interval: usize) -> Self {
        Self { log_interval: log_interval.max(1) }
    }
}

impl Default for LoggingCallback {
    fn default() -> Self {
        Self { log_interval: 10 }
    }
}

impl TrainerCallback for LoggingCallback {
    fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        info!(
            epochs = ctx.max_epochs,
            steps_per_epoch = ctx.steps_per_epoch,
            start_step = ctx.global_step,
            "training started"
        );
        CallbackAction::Continue
    }

    fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        if ctx.global_step % self.log_interval == 0 {
            info!(
                epoch = ctx.epoch + 1,
                step = ctx.global_step,
                loss = format_args!("{:.4}", ctx.loss),
                lr = format_args!("{:.2e}", ctx.lr),
                "train step"
            );
        } else {
            debug!(step = ctx.global_step, loss = ctx.loss, scale = ctx.loss_scale, "train step");
        }
        CallbackAction::Continue
    }

    fn on_evaluation(&mut self, ctx: &CallbackContext) -> CallbackAction {
        if let Some(score) = ctx.score {
            info!(
                epoch = ctx.epoch + 1,
                step = ctx.global_step,
                score = format_args!("{score:.4}"),
                best = ?ctx.best_score,
                "evaluation"
            );
        }
        CallbackAction::Continue
    }

    fn on_checkpoint(&mut self, ctx: &CallbackContext, path: &Path) {
        info!(step = ctx.global_step, path = %path.display(), "checkpoint saved");
    }

    fn on_train_end(&mut self, ctx: &CallbackContext) {
        info!(
            steps = ctx.global_step,
            loss = format_args!("{:.4}", ctx.loss),
            elapsed_secs = format_args!("{:.1}", ctx.elapsed_secs),
            "training finished"
        );
    }

    fn name(&self) -> &'static str {
        "LoggingCallback"
    }
}
