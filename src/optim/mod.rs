//! Optimizers, gradient clipping and learning-rate schedules

mod adamw;
mod clip;
mod optimizer;
pub mod scheduler;
mod sgd;
mod state;

pub use adamw::AdamW;
pub use clip::clip_grad_norm;
pub use optimizer::Optimizer;
pub use scheduler::{LRScheduler, ScheduleKind, SchedulerState, WarmupScheduler};
pub use sgd::SGD;
pub use state::{
    load_optimizer_states, save_optimizer_states, OptimizerState, ParamState,
    OPTIMIZER_STATE_FILE, OPTIMIZER_TENSORS_FILE,
};
