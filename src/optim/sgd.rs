//! Stochastic Gradient Descent optimizer

use std::collections::BTreeMap;

use ndarray::Array1;

use super::{Optimizer, OptimizerState, ParamState};
use crate::models::Parameter;
use crate::Result;

const KIND: &str = "sgd";

/// SGD optimizer with optional momentum
#[derive(Debug, Clone)]
pub struct SGD {
    lr: f32,
    momentum: f32,
    steps: u64,
    velocities: Vec<Array1<f32>>,
}

impl SGD {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self { lr, momentum, steps: 0, velocities: Vec::new() }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [&mut Parameter]) {
        if self.momentum > 0.0 && self.velocities.len() != params.len() {
            self.velocities = params.iter().map(|p| Array1::zeros(p.len())).collect();
        }
        self.steps += 1;

        for (i, param) in params.iter_mut().enumerate() {
            let grad = param.grad().clone();
            if self.momentum > 0.0 {
                // v = momentum * v + g; p -= lr * v
                let velocity = &mut self.velocities[i];
                velocity.zip_mut_with(&grad, |v, &g| *v = self.momentum * *v + g);
                param.data_mut().scaled_add(-self.lr, velocity);
            } else {
                param.data_mut().scaled_add(-self.lr, &grad);
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn state_dict(&self, params: &[&Parameter]) -> OptimizerState {
        let entries = params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut buffers = BTreeMap::new();
                if let Some(v) = self.velocities.get(i) {
                    buffers.insert("momentum_buffer".to_string(), v.to_vec());
                }
                ParamState::new(p, buffers)
            })
            .collect();
        OptimizerState { kind: KIND.into(), step: self.steps, lr: self.lr, params: entries }
    }

    fn load_state_dict(&mut self, state: OptimizerState, params: &[&Parameter]) -> Result<()> {
        state.validate(KIND, params)?;
        self.velocities = state
            .params
            .iter()
            .filter_map(|p| p.buffer("momentum_buffer").map(|b| Array1::from_vec(b.to_vec())))
            .collect();
        if self.velocities.len() != params.len() {
            self.velocities.clear();
        }
        self.steps = state.step;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_plain_sgd() {
        let mut p = Parameter::from_vector("w", arr1(&[1.0, 2.0]));
        p.grad_mut().assign(&arr1(&[1.0, -1.0]));
        SGD::new(0.5, 0.0).step(&mut [&mut p]);
        assert_eq!(p.data(), &arr1(&[0.5, 2.5]));
    }

    #[test]
    fn test_momentum_accumulates_and_persists() {
        let mut p = Parameter::from_vector("w", arr1(&[0.0]));
        p.grad_mut().fill(1.0);
        let mut opt = SGD::new(0.1, 0.9);
        opt.step(&mut [&mut p]);
        opt.step(&mut [&mut p]);
        assert_abs_diff_eq!(p.data()[0], -0.1 - 0.19, epsilon = 1e-6);

        let state = opt.state_dict(&[&p]);
        let mut resumed = SGD::new(0.1, 0.9);
        resumed.load_state_dict(state, &[&p]).unwrap();
        assert_abs_diff_eq!(resumed.velocities[0][0], 1.9, epsilon = 1e-6);
    }
}
