//! Warmup-based step scheduler

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use super::{LRScheduler, ScheduleKind};
use crate::optim::Optimizer;

/// File holding the scheduler state inside a checkpoint
pub const SCHEDULER_STATE_FILE: &str = "scheduler.json";

/// Persistable scheduler state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    /// Schedule shape
    pub kind: ScheduleKind,
    /// Learning rate the multiplier applies to
    pub base_lr: f32,
    /// Warmup length
    pub warmup_steps: usize,
    /// Planned total steps
    pub total_steps: usize,
    /// Steps taken
    pub step: usize,
}

/// Multiplier schedule over `base_lr`.
///
/// The rate at step 0 is `base_lr * factor(0)`, so warmup schedules start
/// from zero.
#[derive(Debug, Clone)]
pub struct WarmupScheduler {
    kind: ScheduleKind,
    base_lr: f32,
    warmup_steps: usize,
    total_steps: usize,
    current_step: usize,
}

impl WarmupScheduler {
    /// Create a scheduler
    pub fn new(kind: ScheduleKind, base_lr: f32, warmup_steps: usize, total_steps: usize) -> Self {
        Self { kind, base_lr, warmup_steps, total_steps, current_step: 0 }
    }

    /// Apply the current learning rate to an optimizer
    pub fn apply(&self, optimizer: &mut dyn Optimizer) {
        optimizer.set_lr(self.get_lr());
    }

    /// Steps taken
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Multiplier at the current step
    pub fn factor(&self) -> f32 {
        let step = self.current_step as f32;
        let warmup = self.warmup_steps as f32;
        if self.kind != ScheduleKind::ConstantLr && self.current_step < self.warmup_steps {
            return step / warmup.max(1.0);
        }

        let decay_steps = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f32;
        let progress = (step - warmup) / decay_steps;
        match self.kind {
            ScheduleKind::ConstantLr | ScheduleKind::WarmupConstant => 1.0,
            ScheduleKind::WarmupLinear => {
                (self.total_steps as f32 - step).max(0.0) / decay_steps
            }
            ScheduleKind::WarmupCosine => (0.5 * (1.0 + (PI * progress).cos())).max(0.0),
            ScheduleKind::WarmupCosineWithHardRestarts => {
                if progress >= 1.0 {
                    0.0
                } else {
                    0.5 * (1.0 + (PI * (progress % 1.0)).cos())
                }
            }
        }
    }

    /// Snapshot for checkpointing
    pub fn state(&self) -> SchedulerState {
        SchedulerState {
            kind: self.kind,
            base_lr: self.base_lr,
            warmup_steps: self.warmup_steps,
            total_steps: self.total_steps,
            step: self.current_step,
        }
    }

    /// Restore the step count and base rate of a saved schedule.
    ///
    /// Warmup and total steps stay as configured for the current run, so a
    /// resumed run continues the step counter inside its own schedule.
    pub fn load_state(&mut self, state: &SchedulerState) {
        self.base_lr = state.base_lr;
        self.current_step = state.step;
    }
}

impl LRScheduler for WarmupScheduler {
    fn get_lr(&self) -> f32 {
        self.base_lr * self.factor()
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}
