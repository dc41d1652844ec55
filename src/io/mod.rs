//! On-disk formats: SafeTensors for weights and optimizer moments, JSON for
//! module configs, YAML for training configs.

mod load;
mod save;

pub use load::{load_json, load_tensor_matching, load_tensors, load_yaml};
pub use save::{save_json, save_tensors};

/// A named fp32 tensor as stored on disk
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTensor {
    /// Tensor name
    pub name: String,
    /// Shape
    pub shape: Vec<usize>,
    /// Row-major values
    pub data: Vec<f32>,
}

impl NamedTensor {
    /// Create a named tensor
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { name: name.into(), shape, data }
    }
}
