//! Training result types

use std::path::PathBuf;

/// Result of a `fit` run
#[derive(Debug, Clone, Default)]
pub struct FitResult {
    /// Global steps taken in this run
    pub global_steps: usize,
    /// Epochs fully completed
    pub epochs_completed: usize,
    /// Mean loss of the last step across objectives
    pub final_loss: f32,
    /// Best evaluator score, if an evaluator ran
    pub best_score: Option<f32>,
    /// Steps whose optimizer update was skipped after a gradient overflow
    pub skipped_steps: usize,
    /// Checkpoints written, in order (pruned ones included)
    pub checkpoints: Vec<PathBuf>,
    /// Whether optimizer/scheduler state was restored from the model directory
    pub resumed: bool,
    /// Whether a callback stopped training early
    pub stopped_early: bool,
    /// Total training time in seconds
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_result_default() {
        let result = FitResult::default();
        assert_eq!(result.global_steps, 0);
        assert!(result.best_score.is_none());
        assert!(!result.resumed);
    }
}
