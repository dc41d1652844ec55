//! Loss trait

use crate::data::InputExample;
use crate::models::{Parameter, SentenceEmbedder};
use crate::Result;

/// A differentiable training objective over pair examples.
///
/// `compute` accumulates gradients of `loss * loss_scale` into the model and
/// into the loss's own parameters, and returns the unscaled mean loss.
pub trait Loss: Send {
    /// Objective name, used to key checkpointed optimizer state
    fn name(&self) -> &'static str;

    /// Forward and backward over one batch
    fn compute(
        &mut self,
        model: &mut SentenceEmbedder,
        batch: &[InputExample],
        loss_scale: f32,
    ) -> Result<f32>;

    /// Head parameters owned by the loss
    fn parameters(&self) -> Vec<&Parameter> {
        Vec::new()
    }

    /// Mutable head parameters, same order as [`Loss::parameters`]
    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        Vec::new()
    }
}
