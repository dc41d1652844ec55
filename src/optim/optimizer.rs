//! Optimizer trait

use super::OptimizerState;
use crate::models::Parameter;
use crate::Result;

/// Trait for optimization algorithms over borrowed parameters.
///
/// Parameters are passed in the same order on every call; per-parameter
/// state is keyed by position and checked against names and shapes when
/// restored.
pub trait Optimizer: Send {
    /// Perform a single optimization step
    fn step(&mut self, params: &mut [&mut Parameter]);

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [&mut Parameter]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);

    /// Snapshot of step count and per-parameter buffers
    fn state_dict(&self, params: &[&Parameter]) -> OptimizerState;

    /// Restore a snapshot taken over parameters with the same names and shapes
    fn load_state_dict(&mut self, state: OptimizerState, params: &[&Parameter]) -> Result<()>;
}
