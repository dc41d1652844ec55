//! Step checkpoints: `<root>/<global_step>` directories with retention
//!
//! A checkpoint is a full model bundle. When optimizer state is requested
//! it also carries `optimizer.safetensors`, `optimizer.json`,
//! `scheduler.json` and `scaler.json`; `trainer_state.json` is always
//! written.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::io::{load_json, save_json};
use crate::models::SentenceEmbedder;
use crate::optim::{
    load_optimizer_states, save_optimizer_states, OptimizerState, SchedulerState,
    OPTIMIZER_STATE_FILE,
};
use crate::optim::scheduler::SCHEDULER_STATE_FILE;
use crate::precision::ScalerState;
use crate::{Error, Result};

/// File holding the loss-scaler state
pub const SCALER_STATE_FILE: &str = "scaler.json";

/// File holding step bookkeeping
pub const TRAINER_STATE_FILE: &str = "trainer_state.json";

/// Step bookkeeping written with every checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerState {
    /// Global step the checkpoint was taken at
    pub global_step: usize,
    /// Epoch in progress (0-indexed)
    pub epoch: usize,
    /// Best evaluator score so far
    pub best_score: Option<f32>,
    /// Wall-clock save time
    pub saved_at: DateTime<Utc>,
    /// Crate version that wrote the checkpoint
    pub version: String,
}

impl TrainerState {
    /// State stamped with the current time
    pub fn now(global_step: usize, epoch: usize, best_score: Option<f32>) -> Self {
        Self {
            global_step,
            epoch,
            best_score,
            saved_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Optimizer, scheduler and scaler state of one run, one entry per objective
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeState {
    /// Optimizer snapshots
    pub optimizers: Vec<OptimizerState>,
    /// Scheduler snapshots
    pub schedulers: Vec<SchedulerState>,
    /// Loss-scaler snapshot, present when mixed precision was on
    pub scaler: Option<ScalerState>,
}

impl ResumeState {
    /// Whether `dir` holds saved optimizer state
    pub fn exists(dir: impl AsRef<Path>) -> bool {
        dir.as_ref().join(OPTIMIZER_STATE_FILE).exists()
    }

    /// Write into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        save_optimizer_states(dir, &self.optimizers)?;
        save_json(dir.join(SCHEDULER_STATE_FILE), &self.schedulers)?;
        if let Some(scaler) = &self.scaler {
            save_json(dir.join(SCALER_STATE_FILE), scaler)?;
        }
        Ok(())
    }

    /// Read from `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let optimizers = load_optimizer_states(dir)?;
        let schedulers: Vec<SchedulerState> = load_json(dir.join(SCHEDULER_STATE_FILE))?;
        if schedulers.len() != optimizers.len() {
            return Err(Error::StateKeyMismatch {
                message: format!(
                    "{} optimizer states but {} scheduler states in {}",
                    optimizers.len(),
                    schedulers.len(),
                    dir.display()
                ),
            });
        }
        let scaler_path = dir.join(SCALER_STATE_FILE);
        let scaler = if scaler_path.exists() { Some(load_json(&scaler_path)?) } else { None };
        Ok(Self { optimizers, schedulers, scaler })
    }
}

/// Writes step checkpoints under one root and enforces the retention limit.
///
/// Only subdirectories whose name parses as a step number are managed;
/// anything else under the root (such as a saved base model) is left alone.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    root: PathBuf,
    total_limit: Option<usize>,
}

impl CheckpointManager {
    /// Manage checkpoints under `root`, keeping at most `total_limit`
    pub fn new(root: impl Into<PathBuf>, total_limit: Option<usize>) -> Self {
        Self { root: root.into(), total_limit }
    }

    /// Checkpoint root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a given step
    pub fn dir_for(&self, global_step: usize) -> PathBuf {
        self.root.join(global_step.to_string())
    }

    /// Save the model (and optional resume state) for `trainer_state.global_step`.
    ///
    /// The checkpoint is assembled in a `<step>.tmp` sibling and then moved
    /// over any existing `<step>` directory, so nothing from an earlier save
    /// of the same step survives.
    pub fn save(
        &self,
        model: &SentenceEmbedder,
        resume: Option<&ResumeState>,
        trainer_state: &TrainerState,
    ) -> Result<PathBuf> {
        let dir = self.dir_for(trainer_state.global_step);
        let staging = self.root.join(format!("{}.tmp", trainer_state.global_step));
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .map_err(|e| Error::io(format!("clearing {}", staging.display()), e))?;
        }

        model.save(&staging)?;
        if let Some(resume) = resume {
            resume.save(&staging)?;
        }
        save_json(staging.join(TRAINER_STATE_FILE), trainer_state)?;

        // A rewritten step replaces the old directory wholesale
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| Error::io(format!("replacing {}", dir.display()), e))?;
        }
        fs::rename(&staging, &dir)
            .map_err(|e| Error::io(format!("moving {} into place", staging.display()), e))?;
        info!(dir = %dir.display(), step = trainer_state.global_step, "checkpoint written");
        Ok(dir)
    }

    /// Numerically named checkpoints, oldest first
    pub fn list_checkpoints(&self) -> Result<Vec<(usize, PathBuf)>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root)
            .map_err(|e| Error::io(format!("listing {}", self.root.display()), e))?;

        let mut checkpoints = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(format!("listing {}", self.root.display()), e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(step) = path.file_name().and_then(|n| n.to_str()).and_then(|n| n.parse().ok()) {
                checkpoints.push((step, path));
            }
        }
        checkpoints.sort_by_key(|(step, _)| *step);
        Ok(checkpoints)
    }

    /// Newest checkpoint, if any
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list_checkpoints()?.pop().map(|(_, path)| path))
    }

    /// Delete the oldest checkpoints beyond the limit; returns what was removed
    pub fn prune(&self) -> Result<Vec<PathBuf>> {
        let Some(limit) = self.total_limit else {
            return Ok(Vec::new());
        };
        let checkpoints = self.list_checkpoints()?;
        let excess = checkpoints.len().saturating_sub(limit);

        let mut removed = Vec::with_capacity(excess);
        for (step, path) in checkpoints.into_iter().take(excess) {
            debug!(step, path = %path.display(), "removing old checkpoint");
            fs::remove_dir_all(&path)
                .map_err(|e| Error::io(format!("removing {}", path.display()), e))?;
            removed.push(path);
        }
        Ok(removed)
    }
}
