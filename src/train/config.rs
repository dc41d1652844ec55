//! Fit configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::io::load_yaml;
use crate::optim::{AdamW, Optimizer, ScheduleKind, SGD};
use crate::{Error, Result};

/// Which optimizer `fit` builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// AdamW with decoupled weight decay
    #[default]
    AdamW,
    /// Plain or momentum SGD
    Sgd,
}

/// Optimizer hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Optimizer kind
    pub kind: OptimizerKind,
    /// Base learning rate
    pub lr: f32,
    /// AdamW epsilon
    pub eps: f32,
    /// AdamW weight decay
    pub weight_decay: f32,
    /// SGD momentum
    pub momentum: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { kind: OptimizerKind::AdamW, lr: 2e-5, eps: 1e-6, weight_decay: 0.01, momentum: 0.0 }
    }
}

impl OptimizerConfig {
    /// Build the configured optimizer
    pub fn build(&self) -> Box<dyn Optimizer> {
        match self.kind {
            OptimizerKind::AdamW => {
                Box::new(AdamW::new(self.lr, 0.9, 0.999, self.eps, self.weight_decay))
            }
            OptimizerKind::Sgd => Box::new(SGD::new(self.lr, self.momentum)),
        }
    }
}

/// Everything `Trainer::fit` needs besides the model and data.
///
/// Loadable from YAML; every field has a default.
///
/// ```
/// use sentence_tune::train::FitConfig;
///
/// let config: FitConfig = serde_yaml::from_str("steps_per_epoch: 5\nuse_amp: true").unwrap();
/// assert_eq!(config.steps_per_epoch, Some(5));
/// assert_eq!(config.checkpoint_save_steps, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Number of epochs
    pub epochs: usize,
    /// Steps per epoch; defaults to the shortest loader's batch count
    pub steps_per_epoch: Option<usize>,
    /// Learning-rate schedule
    pub scheduler: ScheduleKind,
    /// Warmup steps
    pub warmup_steps: usize,
    /// Optimizer hyperparameters
    pub optimizer: OptimizerConfig,
    /// Evaluate every N steps (0 disables mid-epoch evaluation)
    pub evaluation_steps: usize,
    /// Where to save the best (or final) model
    pub output_path: Option<PathBuf>,
    /// Save to `output_path` whenever the evaluator score improves
    pub save_best_model: bool,
    /// Gradient clipping threshold
    pub max_grad_norm: f32,
    /// Mixed-precision emulation with dynamic loss scaling
    pub use_amp: bool,
    /// Checkpoint root; checkpoints go to `<path>/<global_step>`
    pub checkpoint_path: Option<PathBuf>,
    /// Save a checkpoint every N global steps
    pub checkpoint_save_steps: usize,
    /// Keep at most this many checkpoints
    pub checkpoint_save_total_limit: Option<usize>,
    /// Persist and restore optimizer, scheduler and scaler state
    pub save_optimizer_scheduler: bool,
    /// Shuffle seed; `fit` reseeds each objective's loader from it
    pub seed: u64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 1,
            steps_per_epoch: None,
            scheduler: ScheduleKind::WarmupLinear,
            warmup_steps: 10_000,
            optimizer: OptimizerConfig::default(),
            evaluation_steps: 0,
            output_path: None,
            save_best_model: true,
            max_grad_norm: 1.0,
            use_amp: false,
            checkpoint_path: None,
            checkpoint_save_steps: 500,
            checkpoint_save_total_limit: None,
            save_optimizer_scheduler: false,
            seed: 42,
        }
    }
}

impl FitConfig {
    /// Create default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = load_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot drive a run
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, message: &str| {
            Err(Error::Config { field: field.into(), message: message.into() })
        };
        if self.epochs == 0 {
            return invalid("epochs", "must be at least 1");
        }
        if self.steps_per_epoch == Some(0) {
            return invalid("steps_per_epoch", "must be at least 1");
        }
        if self.checkpoint_save_steps == 0 {
            return invalid("checkpoint_save_steps", "must be at least 1");
        }
        if self.checkpoint_save_total_limit == Some(0) {
            return invalid("checkpoint_save_total_limit", "must be at least 1");
        }
        if !(self.optimizer.lr.is_finite() && self.optimizer.lr >= 0.0) {
            return invalid("optimizer.lr", "must be a non-negative number");
        }
        if self.max_grad_norm.is_nan() || self.max_grad_norm <= 0.0 {
            return invalid("max_grad_norm", "must be positive");
        }
        Ok(())
    }

    /// Set epochs
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set steps per epoch
    #[must_use]
    pub fn with_steps_per_epoch(mut self, steps: usize) -> Self {
        self.steps_per_epoch = Some(steps);
        self
    }

    /// Set scheduler
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: ScheduleKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Set warmup steps
    #[must_use]
    pub fn with_warmup_steps(mut self, steps: usize) -> Self {
        self.warmup_steps = steps;
        self
    }

    /// Set learning rate
    #[must_use]
    pub fn with_lr(mut self, lr: f32) -> Self {
        self.optimizer.lr = lr;
        self
    }

    /// Set evaluation interval
    #[must_use]
    pub fn with_evaluation_steps(mut self, steps: usize) -> Self {
        self.evaluation_steps = steps;
        self
    }

    /// Set output path
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Enable or disable mixed precision
    #[must_use]
    pub fn with_amp(mut self, use_amp: bool) -> Self {
        self.use_amp = use_amp;
        self
    }

    /// Configure checkpointing
    #[must_use]
    pub fn with_checkpoints(
        mut self,
        path: impl Into<PathBuf>,
        save_steps: usize,
        total_limit: Option<usize>,
    ) -> Self {
        self.checkpoint_path = Some(path.into());
        self.checkpoint_save_steps = save_steps;
        self.checkpoint_save_total_limit = total_limit;
        self
    }

    /// Persist optimizer and scheduler state with checkpoints
    #[must_use]
    pub fn with_optimizer_state(mut self, save: bool) -> Self {
        self.save_optimizer_scheduler = save;
        self
    }

    /// Set shuffle seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FitConfig::default();
        assert_eq!(config.warmup_steps, 10_000);
        assert_eq!(config.scheduler, ScheduleKind::WarmupLinear);
        assert_eq!(config.optimizer.lr, 2e-5);
        assert!(config.save_best_model);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = "scheduler: warmupcosine\noptimizer:\n  kind: sgd\n  lr: 0.1\ncheckpoint_save_total_limit: 1\n";
        let config: FitConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.scheduler, ScheduleKind::WarmupCosine);
        assert_eq!(config.optimizer.kind, OptimizerKind::Sgd);
        assert_eq!(config.optimizer.eps, 1e-6);
        assert_eq!(config.checkpoint_save_total_limit, Some(1));
    }

    #[test]
    fn test_from_yaml_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.yaml");
        std::fs::write(&path, "epochs: 0\n").unwrap();
        assert!(matches!(FitConfig::from_yaml(&path), Err(Error::Config { .. })));
    }

    #[test]
    fn test_builders() {
        let config = FitConfig::new()
            .with_steps_per_epoch(5)
            .with_checkpoints("ckpt", 5, Some(1))
            .with_optimizer_state(true)
            .with_amp(true);
        assert_eq!(config.checkpoint_save_steps, 5);
        assert!(config.save_optimizer_scheduler && config.use_amp);
    }

    #[test]
    fn test_optimizer_build() {
        let opt = OptimizerConfig { kind: OptimizerKind::Sgd, lr: 0.5, ..Default::default() }.build();
        assert_eq!(opt.lr(), 0.5);
    }
}
