//! AdamW optimizer (Adam with decoupled weight decay)

use std::collections::BTreeMap;

use ndarray::Array1;

use super::{Optimizer, OptimizerState, ParamState};
use crate::models::Parameter;
use crate::Result;

const KIND: &str = "adamw";

/// AdamW optimizer
///
/// AdamW decouples weight decay from the gradient-based update:
///
/// θ_t = (1 - lr * λ) * θ_{t-1} - lr * m̂_t / (√v̂_t + ε)
///
/// Parameters for which [`Parameter::applies_weight_decay`] is false
/// (biases, norms) skip the decay term.
#[derive(Debug, Clone)]
pub struct AdamW {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    t: u64,
    m: Vec<Array1<f32>>,
    v: Vec<Array1<f32>>,
}

impl AdamW {
    /// Create a new AdamW optimizer
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32, weight_decay: f32) -> Self {
        Self { lr, beta1, beta2, epsilon, weight_decay, t: 0, m: Vec::new(), v: Vec::new() }
    }

    /// Sentence-embedding fine-tuning defaults: eps 1e-6, weight decay 0.01
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-6, 0.01)
    }

    /// Steps taken so far
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }

    /// Weight decay coefficient
    #[must_use]
    pub fn weight_decay(&self) -> f32 {
        self.weight_decay
    }

    fn ensure_moments(&mut self, params: &[&mut Parameter]) {
        if self.m.len() != params.len() {
            self.m = params.iter().map(|p| Array1::zeros(p.len())).collect();
            self.v = params.iter().map(|p| Array1::zeros(p.len())).collect();
        }
    }
}

impl Optimizer for AdamW {
    fn step(&mut self, params: &mut [&mut Parameter]) {
        self.ensure_moments(params);
        self.t += 1;

        let bias_c1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_c2 = 1.0 - self.beta2.powi(self.t as i32);
        let step_size = self.lr / bias_c1;
        let bias_c2_sqrt = bias_c2.sqrt();
        let (lr, beta1, beta2, eps) = (self.lr, self.beta1, self.beta2, self.epsilon);

        for (i, param) in params.iter_mut().enumerate() {
            let decay = if param.applies_weight_decay() { self.weight_decay } else { 0.0 };
            let grad = param.grad().clone();

            let m = &mut self.m[i];
            let v = &mut self.v[i];
            m.zip_mut_with(&grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
            v.zip_mut_with(&grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

            let data = param.data_mut();
            if decay > 0.0 {
                *data *= 1.0 - lr * decay;
            }
            ndarray::Zip::from(data).and(&*m).and(&*v).for_each(|p, &m, &v| {
                *p -= step_size * m / (v.sqrt() / bias_c2_sqrt + eps);
            });
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
                if let (Some(m), Some(v)) = (self.m.get(i), self.v.get(i)) {
                    buffers.insert("exp_avg".to_string(), m.to_vec());
                    buffers.insert("exp_avg_sq".to_string(), v.to_vec());
                }
                ParamState::new(p, buffers)
            })
            .collect();
        OptimizerState { kind: KIND.into(), step: self.t, lr: self.lr, params: entries }
    }

    fn load_state_dict(&mut self, state: OptimizerState, params: &[&Parameter]) -> Result<()> {
        state.validate(KIND, params)?;
        let mut m = Vec::with_capacity(params.len());
        let mut v = Vec::with_capacity(params.len());
        for (saved, live) in state.params.iter().zip(params) {
            let zeros = || vec![0.0; live.len()];
            m.push(Array1::from_vec(saved.buffer("exp_avg").map_or_else(zeros, <[f32]>::to_vec)));
            v.push(Array1::from_vec(saved.buffer("exp_avg_sq").map_or_else(zeros, <[f32]>::to_vec)));
        }
        self.m = m;
        self.v = v;
        self.t = state.step;
        Ok(())
    }
}
