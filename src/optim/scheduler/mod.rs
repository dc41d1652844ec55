//! Learning rate schedulers
//!
//! Step-based schedules in the Hugging Face style: the learning rate is the
//! base rate times a multiplier of the current step.
//! - `constantlr` - constant multiplier 1
//! - `warmupconstant` - linear warmup, then constant
//! - `warmuplinear` - linear warmup, then linear decay to 0
//! - `warmupcosine` - linear warmup, then half-cosine decay to 0
//! - `warmupcosinewithhardrestarts` - linear warmup, then one cosine cycle

mod warmup;

#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use warmup::{SchedulerState, WarmupScheduler, SCHEDULER_STATE_FILE};

/// Learning rate scheduler trait
pub trait LRScheduler {
    /// Get the current learning rate
    fn get_lr(&self) -> f32;

    /// Step the scheduler (called after each optimizer step)
    fn step(&mut self);
}

/// Schedule shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    /// Constant learning rate
    ConstantLr,
    /// Warmup, then constant
    WarmupConstant,
    /// Warmup, then linear decay
    #[default]
    WarmupLinear,
    /// Warmup, then cosine decay
    WarmupCosine,
    /// Warmup, then cosine with hard restarts
    WarmupCosineWithHardRestarts,
}

impl ScheduleKind {
    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConstantLr => "constantlr",
            Self::WarmupConstant => "warmupconstant",
            Self::WarmupLinear => "warmuplinear",
            Self::WarmupCosine => "warmupcosine",
            Self::WarmupCosineWithHardRestarts => "warmupcosinewithhardrestarts",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScheduleKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "constantlr" => Ok(Self::ConstantLr),
            "warmupconstant" => Ok(Self::WarmupConstant),
            "warmuplinear" => Ok(Self::WarmupLinear),
            "warmupcosine" => Ok(Self::WarmupCosine),
            "warmupcosinewithhardrestarts" => Ok(Self::WarmupCosineWithHardRestarts),
            other => Err(crate::Error::Config {
                field: "scheduler".into(),
                message: format!("unknown scheduler '{other}'"),
            }),
        }
    }
}
