//! Model evaluation
//!
//! An [`Evaluator`] scores a [`SentenceEmbedder`]; higher is better. The
//! trainer calls it during `fit` to track and save the best model.

mod correlation;
pub mod guard;
mod similarity;

use std::path::Path;

use crate::models::SentenceEmbedder;
use crate::Result;

pub use correlation::{pearson, rank_average, spearman};
pub use guard::{passes_regression_guard, ScoreReport, REGRESSION_TOLERANCE};
pub use similarity::{
    Correlations, EmbeddingSimilarityEvaluator, SimilarityFunction, SimilarityScores,
};

/// Scores a model
pub trait Evaluator {
    /// Name used in logs and output files
    fn name(&self) -> &str;

    /// Evaluate `model`, optionally logging results under `output_path`.
    ///
    /// `epoch` and `steps` identify when during training the call happened.
    fn evaluate(
        &self,
        model: &SentenceEmbedder,
        output_path: Option<&Path>,
        epoch: Option<usize>,
        steps: Option<usize>,
    ) -> Result<f32>;
}
