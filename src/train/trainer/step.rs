//! One optimizer step for one objective

use crate::data::DataLoader;
use crate::losses::Loss;
use crate::models::{Parameter, SentenceEmbedder};
use crate::optim::{clip_grad_norm, LRScheduler, Optimizer, WarmupScheduler};
use crate::precision::GradScaler;
use crate::Result;

/// A data loader paired with the loss trained on it
pub struct TrainObjective {
    /// Batches for this objective
    pub loader: DataLoader,
    /// Loss applied to those batches
    pub loss: Box<dyn Loss>,
}

impl TrainObjective {
    /// Pair a loader with a loss
    pub fn new(loader: DataLoader, loss: impl Loss + 'static) -> Self {
        Self { loader, loss: Box::new(loss) }
    }
}

impl std::fmt::Debug for TrainObjective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainObjective")
            .field("loss", &self.loss.name())
            .field("batches", &self.loader.len())
            .finish()
    }
}

/// Optimizer and schedule owned by one objective for the length of a run
pub(crate) struct ObjectiveRun {
    pub(crate) optimizer: Box<dyn Optimizer>,
    pub(crate) scheduler: WarmupScheduler,
}

/// Outcome of one objective's step
pub(crate) struct StepOutcome {
    pub(crate) loss: f32,
    pub(crate) skipped: bool,
}

/// Parameters of the model followed by those of the loss head
pub(crate) fn objective_parameters<'a>(
    model: &'a SentenceEmbedder,
    loss: &'a dyn Loss,
) -> Vec<&'a Parameter> {
    let mut params = model.parameters();
    params.extend(loss.parameters());
    params
}

impl ObjectiveRun {
    /// Forward, backward, unscale, clip and update.
    ///
    /// An overflowing step leaves the weights untouched and does not advance
    /// the schedule.
    pub(crate) fn step(
        &mut self,
        model: &mut SentenceEmbedder,
        objective: &mut TrainObjective,
        scaler: &mut GradScaler,
        max_grad_norm: f32,
    ) -> Result<StepOutcome> {
        let batch = objective.loader.next_batch();

        let mut params = model.parameters_mut();
        params.extend(objective.loss.parameters_mut());
        self.optimizer.zero_grad(&mut params);
        drop(params);

        let loss = objective.loss.compute(model, &batch, scaler.scale())?;

        let mut params = model.parameters_mut();
        params.extend(objective.loss.parameters_mut());

        let mut valid = loss.is_finite();
        for param in params.iter_mut() {
            if let Some(grad) = param.grad_mut().as_slice_mut() {
                valid &= scaler.unscale_and_check(grad);
            }
        }
        let skipped = scaler.update(valid) || !valid;

        if !skipped {
            clip_grad_norm(&mut params, max_grad_norm);
            self.scheduler.apply(self.optimizer.as_mut());
            self.optimizer.step(&mut params);
            self.scheduler.step();
        }
        self.optimizer.zero_grad(&mut params);

        Ok(StepOutcome { loss, skipped })
    }
}
