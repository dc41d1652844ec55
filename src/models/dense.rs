//! Fully connected projection on top of the pooled vector

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::Parameter;
use crate::io::{load_json, load_tensors, save_json, save_tensors, NamedTensor};
use crate::{Error, Result};

/// Output non-linearity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Hyperbolic tangent
    #[default]
    Tanh,
    /// No activation
    Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseConfig {
    in_features: usize,
    out_features: usize,
    activation_function: Activation,
}

/// Cached activations for [`Dense::backward`]
#[derive(Debug, Clone)]
pub struct DenseTrace {
    input: Array1<f32>,
    output: Array1<f32>,
}

/// `y = act(W x + b)`
#[derive(Debug, Clone)]
pub struct Dense {
    weight: Parameter,
    bias: Parameter,
    activation: Activation,
}

impl Dense {
    /// Uniformly initialized layer in `[-1/sqrt(in), 1/sqrt(in)]`
    pub fn new(in_features: usize, out_features: usize, activation: Activation, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        let weight = Array2::from_shape_fn((out_features, in_features), |_| rng.gen_range(-bound..bound));
        let bias = Array1::from_shape_fn(out_features, |_| rng.gen_range(-bound..bound));
        Self {
            weight: Parameter::from_matrix("linear.weight", weight),
            bias: Parameter::from_vector("linear.bias", bias),
            activation,
        }
    }

    /// Input width
    pub fn in_features(&self) -> usize {
        self.weight.shape()[1]
    }

    /// Output width
    pub fn out_features(&self) -> usize {
        self.weight.shape()[0]
    }

    /// Forward pass
    pub fn forward(&self, input: ArrayView1<'_, f32>) -> (Array1<f32>, DenseTrace) {
        let mut output = self.weight.matrix().dot(&input) + self.bias.data();
        if self.activation == Activation::Tanh {
            output.mapv_inplace(f32::tanh);
        }
        let trace = DenseTrace { input: input.to_owned(), output: output.clone() };
        (output, trace)
    }

    /// Accumulate parameter gradients and return the input gradient
    pub fn backward(&mut self, trace: &DenseTrace, grad: ArrayView1<'_, f32>) -> Array1<f32> {
        let pre = match self.activation {
            Activation::Tanh => &grad * &trace.output.mapv(|y| 1.0 - y * y),
            Activation::Identity => grad.to_owned(),
        };

        {
            let mut wg = self.weight.grad_matrix_mut();
            for (o, mut row) in wg.rows_mut().into_iter().enumerate() {
                row.scaled_add(pre[o], &trace.input);
            }
        }
        *self.bias.grad_mut() += &pre;

        self.weight.matrix().t().dot(&pre)
    }

    /// Weight and bias
    pub fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    /// Mutable weight and bias
    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }

    /// Write `config.json` and `model.safetensors` into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;
        save_json(
            dir.join("config.json"),
            &DenseConfig {
                in_features: self.in_features(),
                out_features: self.out_features(),
                activation_function: self.activation,
            },
        )?;
        let tensors: Vec<NamedTensor> = self
            .parameters()
            .into_iter()
            .map(|p| NamedTensor::new(p.name(), p.shape().to_vec(), p.data().to_vec()))
            .collect();
        save_tensors(dir.join("model.safetensors"), &tensors, HashMap::new())
    }

    /// Load a directory written by [`Dense::save`]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: DenseConfig = load_json(dir.join("config.json"))?;
        let (tensors, _) = load_tensors(dir.join("model.safetensors"))?;
        let mut layer = Self::new(config.in_features, config.out_features, config.activation_function, 0);

        for param in layer.parameters_mut() {
            let stored = tensors.iter().find(|t| t.name == param.name()).ok_or_else(|| {
                Error::StateKeyMismatch { message: format!("{} missing from {}", param.name(), dir.display()) }
            })?;
            if stored.shape != param.shape() {
                return Err(Error::ShapeMismatch {
                    tensor: param.name().to_string(),
                    expected: param.shape().to_vec(),
                    actual: stored.shape.clone(),
                });
            }
            *param.data_mut() = Array1::from_vec(stored.data.clone());
        }
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_tanh_input_gradient_matches_finite_difference() {
        let mut layer = Dense::new(3, 2, Activation::Tanh, 1);
        let x = arr1(&[0.2, -0.4, 0.9]);
        let (_, trace) = layer.forward(x.view());
        let upstream = arr1(&[1.0, 0.0]);
        let grad_x = layer.backward(&trace, upstream.view());

        let eps = 1e-3;
        for i in 0..3 {
            let mut plus = x.clone();
            plus[i] += eps;
            let mut minus = x.clone();
            minus[i] -= eps;
            let numeric = (layer.forward(plus.view()).0[0] - layer.forward(minus.view()).0[0]) / (2.0 * eps);
            assert_abs_diff_eq!(grad_x[i], numeric, epsilon = 1e-3);
        }
        assert_abs_diff_eq!(layer.bias.grad()[1], 0.0);
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let layer = Dense::new(4, 3, Activation::Identity, 9);
        layer.save(dir.path()).unwrap();
        let loaded = Dense::load(dir.path()).unwrap();
        assert_eq!(loaded.out_features(), 3);
        assert_eq!(loaded.weight.data(), layer.weight.data());
        assert_eq!(loaded.activation, Activation::Identity);
    }
}
