//! Trainer: the `fit` loop

use std::time::Instant;

use tracing::{debug, info, warn};

use super::result::FitResult;
use super::step::{objective_parameters, ObjectiveRun, StepOutcome, TrainObjective};
use crate::eval::Evaluator;
use crate::models::SentenceEmbedder;
use crate::optim::{LRScheduler, WarmupScheduler};
use crate::precision::{GradScaler, Precision};
use crate::train::callback::{CallbackAction, CallbackContext, CallbackManager, TrainerCallback};
use crate::train::checkpoint::{CheckpointManager, ResumeState, TrainerState};
use crate::train::FitConfig;
use crate::{Error, Result};

/// Runs `fit` over one model and any number of objectives.
///
/// # Example
///
/// ```no_run
/// use sentence_tune::data::{DataLoader, InputExample, Label};
/// use sentence_tune::losses::SoftmaxLoss;
/// use sentence_tune::models::SentenceEmbedder;
/// use sentence_tune::train::{FitConfig, TrainObjective, Trainer};
///
/// let mut model = SentenceEmbedder::load("output/model")?;
/// let examples = vec![InputExample::pair("a dog runs", "an animal moves", Label::Class(1))];
/// let loss = SoftmaxLoss::new(model.embedding_dimension(), 3, 0);
/// let mut objectives = vec![TrainObjective::new(DataLoader::new(examples, 16, true), loss)];
///
/// let config = FitConfig::new().with_steps_per_epoch(5).with_amp(true);
/// let result = Trainer::new(config).fit(&mut model, &mut objectives, None)?;
/// println!("{} steps", result.global_steps);
/// # Ok::<(), sentence_tune::Error>(())
/// ```
#[derive(Debug)]
pub struct Trainer {
    config: FitConfig,
    callbacks: CallbackManager,
}

impl Trainer {
    /// Create a trainer
    pub fn new(config: FitConfig) -> Self {
        Self { config, callbacks: CallbackManager::new() }
    }

    /// Add a callback to the trainer
    pub fn add_callback<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.add(callback);
    }

    /// Training configuration
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Train `model` on every objective in turn each step.
    ///
    /// Each objective's loader is reseeded from `seed` (plus its index)
    /// before the first batch.
    ///
    /// When `save_optimizer_scheduler` is set and the model was loaded from a
    /// directory holding optimizer state, that state is restored first; a
    /// head or model whose parameters do not match it is an error.
    pub fn fit(
        &mut self,
        model: &mut SentenceEmbedder,
        objectives: &mut [TrainObjective],
        evaluator: Option<&dyn Evaluator>,
    ) -> Result<FitResult> {
        self.config.validate()?;
        if objectives.is_empty() {
            return Err(Error::EmptyDataset { context: "fit needs at least one objective".into() });
        }
        if let Some(idx) = objectives.iter().position(|o| o.loader.is_empty()) {
            return Err(Error::EmptyDataset { context: format!("objective {idx} has no examples") });
        }

        let config = self.config.clone();
        for (idx, objective) in objectives.iter_mut().enumerate() {
            objective.loader.reseed(config.seed.wrapping_add(idx as u64));
        }
        let steps_per_epoch = config
            .steps_per_epoch
            .unwrap_or_else(|| objectives.iter().map(|o| o.loader.len()).min().unwrap_or(0));
        let total_steps = steps_per_epoch * config.epochs;

        let mut runs: Vec<ObjectiveRun> = objectives
            .iter()
            .map(|_| ObjectiveRun {
                optimizer: config.optimizer.build(),
                scheduler: WarmupScheduler::new(
                    config.scheduler,
                    config.optimizer.lr,
                    config.warmup_steps,
                    total_steps,
                ),
            })
            .collect();
        let mut scaler = GradScaler::for_amp(config.use_amp);

        let resumed = if config.save_optimizer_scheduler {
            self.restore(model, objectives, &mut runs, &mut scaler)?
        } else {
            false
        };

        let checkpoints = config
            .checkpoint_path
            .as_ref()
            .map(|root| CheckpointManager::new(root, config.checkpoint_save_total_limit));

        let start = Instant::now();
        let mut result = FitResult { resumed, ..FitResult::default() };
        let mut ctx = CallbackContext {
            max_epochs: config.epochs,
            steps_per_epoch,
            lr: runs[0].scheduler.get_lr(),
            loss_scale: scaler.scale(),
            ..CallbackContext::default()
        };
        info!(
            objectives = objectives.len(),
            steps_per_epoch,
            total_steps,
            amp = config.use_amp,
            resumed,
            "starting fit"
        );
        let mut stop = self.callbacks.on_train_begin(&ctx) == CallbackAction::Stop;

        let training_precision = if config.use_amp { Precision::Fp16 } else { Precision::Fp32 };
        let mut global_step = 0;

        'epochs: for epoch in 0..config.epochs {
            if stop {
                break;
            }
            ctx.epoch = epoch;
            for step in 0..steps_per_epoch {
                model.set_precision(training_precision);
                let mut loss_sum = 0.0;
                for (run, objective) in runs.iter_mut().zip(objectives.iter_mut()) {
                    let StepOutcome { loss, skipped } =
                        run.step(model, objective, &mut scaler, config.max_grad_norm)?;
                    if skipped {
                        result.skipped_steps += 1;
                        warn!(step = global_step + 1, scale = scaler.scale(), "gradient overflow, step skipped");
                    }
                    loss_sum += loss;
                }
                model.set_precision(Precision::Fp32);
                global_step += 1;

                ctx.step = step + 1;
                ctx.global_step = global_step;
                ctx.loss = loss_sum / runs.len() as f32;
                ctx.lr = runs[0].scheduler.get_lr();
                ctx.loss_scale = scaler.scale();
                ctx.elapsed_secs = start.elapsed().as_secs_f64();
                result.final_loss = ctx.loss;
                if self.callbacks.on_step_end(&ctx) == CallbackAction::Stop {
                    stop = true;
                }

                if config.evaluation_steps > 0 && global_step % config.evaluation_steps == 0 {
                    if let Some(evaluator) = evaluator {
                        stop |= self.evaluate(model, evaluator, &mut ctx, &mut result, Some(global_step))?;
                    }
                }

                if let Some(manager) = &checkpoints {
                    if global_step % config.checkpoint_save_steps == 0 {
                        let resume = if config.save_optimizer_scheduler {
                            Some(snapshot(model, objectives, &runs, &scaler))
                        } else {
                            None
                        };
                        let state = TrainerState::now(global_step, epoch, result.best_score);
                        let path = manager.save(model, resume.as_ref(), &state)?;
                        for removed in manager.prune()? {
                            debug!(path = %removed.display(), "pruned checkpoint");
                        }
                        self.callbacks.on_checkpoint(&ctx, &path);
                        result.checkpoints.push(path);
                    }
                }

                if stop {
                    result.stopped_early = true;
                    break 'epochs;
                }
            }

            result.epochs_completed = epoch + 1;
            if let Some(evaluator) = evaluator {
                stop |= self.evaluate(model, evaluator, &mut ctx, &mut result, None)?;
            }
        }

        if evaluator.is_none() {
            if let Some(output) = &config.output_path {
                model.save(output)?;
            }
        }

        result.global_steps = global_step;
        result.elapsed_secs = start.elapsed().as_secs_f64();
        ctx.elapsed_secs = result.elapsed_secs;
        self.callbacks.on_train_end(&ctx);
        Ok(result)
    }

    /// Restore optimizer, scheduler and scaler state saved next to the model.
    ///
    /// Returns whether anything was restored.
    fn restore(
        &self,
        model: &SentenceEmbedder,
        objectives: &[TrainObjective],
        runs: &mut [ObjectiveRun],
        scaler: &mut GradScaler,
    ) -> Result<bool> {
        let Some(dir) = model.source_dir() else {
            return Ok(false);
        };
        if !ResumeState::exists(dir) {
            debug!(dir = %dir.display(), "no optimizer state to restore");
            return Ok(false);
        }

        let state = ResumeState::load(dir)?;
        if state.optimizers.len() != runs.len() {
            return Err(Error::StateKeyMismatch {
                message: format!(
                    "{} holds state for {} objectives, fit has {}",
                    dir.display(),
                    state.optimizers.len(),
                    runs.len()
                ),
            });
        }

        for ((run, objective), (optimizer, scheduler)) in runs
            .iter_mut()
            .zip(objectives)
            .zip(state.optimizers.into_iter().zip(&state.schedulers))
        {
            let params = objective_parameters(model, objective.loss.as_ref());
            run.optimizer.load_state_dict(optimizer, &params)?;
            run.scheduler.load_state(scheduler);
        }
        if let Some(scaler_state) = &state.scaler {
            scaler.load_state(scaler_state);
        }
        info!(dir = %dir.display(), "restored optimizer, scheduler and scaler state");
        Ok(true)
    }

    /// Run the evaluator, track the best score and save the best model.
    ///
    /// Returns whether a callback asked to stop.
    fn evaluate(
        &mut self,
        model: &SentenceEmbedder,
        evaluator: &dyn Evaluator,
        ctx: &mut CallbackContext,
        result: &mut FitResult,
        steps: Option<usize>,
    ) -> Result<bool> {
        let output = self.config.output_path.as_deref();
        let score = evaluator.evaluate(model, output, Some(ctx.epoch), steps)?;

        let improved = result.best_score.map_or(true, |best| score > best);
        if improved {
            result.best_score = Some(score);
            if self.config.save_best_model {
                if let Some(path) = output {
                    model.save(path)?;
                }
            }
        }
        ctx.score = Some(score);
        ctx.best_score = result.best_score;
        Ok(self.callbacks.on_evaluation(ctx) == CallbackAction::Stop)
    }
}

fn snapshot(
    model: &SentenceEmbedder,
    objectives: &[TrainObjective],
    runs: &[ObjectiveRun],
    scaler: &GradScaler,
) -> ResumeState {
    ResumeState {
        optimizers: runs
            .iter()
            .zip(objectives)
            .map(|(run, objective)| {
                run.optimizer.state_dict(&objective_parameters(model, objective.loss.as_ref()))
            })
            .collect(),
        schedulers: runs.iter().map(|run| run.scheduler.state()).collect(),
        scaler: scaler.is_enabled().then(|| scaler.state()),
    }
}
