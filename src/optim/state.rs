//! Serializable optimizer state
//!
//! Buffers go to `optimizer.safetensors` as `{objective}.{param}.{buffer}`
//! tensors; everything else goes to `optimizer.json`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::{load_json, load_tensors, save_json, save_tensors, NamedTensor};
use crate::models::Parameter;
use crate::{Error, Result};

/// File holding optimizer moment buffers
pub const OPTIMIZER_TENSORS_FILE: &str = "optimizer.safetensors";

/// File holding optimizer scalars and layout
pub const OPTIMIZER_STATE_FILE: &str = "optimizer.json";

/// State of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamState {
    /// Parameter name at save time
    pub name: String,
    /// Parameter shape at save time
    pub shape: Vec<usize>,
    /// Named buffers (`exp_avg`, `exp_avg_sq`, `momentum_buffer`)
    #[serde(skip)]
    pub buffers: BTreeMap<String, Vec<f32>>,
    /// Buffer names, kept in JSON so tensors can be matched on load
    pub buffer_names: Vec<String>,
}

impl ParamState {
    /// State for `param` with the given buffers
    pub fn new(param: &Parameter, buffers: BTreeMap<String, Vec<f32>>) -> Self {
        Self {
            name: param.name().to_string(),
            shape: param.shape().to_vec(),
            buffer_names: buffers.keys().cloned().collect(),
            buffers,
        }
    }

    /// Buffer by name
    pub fn buffer(&self, name: &str) -> Option<&[f32]> {
        self.buffers.get(name).map(Vec::as_slice)
    }
}

/// Full optimizer snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    /// Optimizer kind (`adamw`, `sgd`)
    pub kind: String,
    /// Steps taken
    pub step: u64,
    /// Learning rate at save time
    pub lr: f32,
    /// Per-parameter state in parameter order
    pub params: Vec<ParamState>,
}

impl OptimizerState {
    /// Check this snapshot against the live parameters.
    ///
    /// Count, names and buffer presence mismatches are
    /// [`Error::StateKeyMismatch`]; a differing shape is
    /// [`Error::ShapeMismatch`].
    pub fn validate(&self, kind: &str, params: &[&Parameter]) -> Result<()> {
        if self.kind != kind {
            return Err(Error::StateKeyMismatch {
                message: format!("state was saved by {}, restoring into {kind}", self.kind),
            });
        }
        if self.params.len() != params.len() {
            return Err(Error::StateKeyMismatch {
                message: format!(
                    "state holds {} parameters, model has {}",
                    self.params.len(),
                    params.len()
                ),
            });
        }
        for (idx, (saved, live)) in self.params.iter().zip(params).enumerate() {
            if saved.name != live.name() {
                return Err(Error::StateKeyMismatch {
                    message: format!("parameter {idx}: saved '{}', live '{}'", saved.name, live.name()),
                });
            }
            if saved.shape != live.shape() {
                return Err(Error::ShapeMismatch {
                    tensor: saved.name.clone(),
                    expected: live.shape().to_vec(),
                    actual: saved.shape.clone(),
                });
            }
            for (buffer, values) in &saved.buffers {
                if values.len() != live.len() {
                    return Err(Error::ShapeMismatch {
                        tensor: format!("{}.{buffer}", saved.name),
                        expected: live.shape().to_vec(),
                        actual: vec![values.len()],
                    });
                }
            }
        }
        Ok(())
    }
}

/// Write the optimizer states of all objectives into `dir`
pub fn save_optimizer_states(dir: impl AsRef<Path>, states: &[OptimizerState]) -> Result<()> {
    let dir = dir.as_ref();
    let mut tensors = Vec::new();
    for (objective, state) in states.iter().enumerate() {
        for (idx, param) in state.params.iter().enumerate() {
            for (buffer, values) in &param.buffers {
                tensors.push(NamedTensor::new(
                    format!("{objective}.{idx}.{buffer}"),
                    param.shape.clone(),
                    values.clone(),
                ));
            }
        }
    }
    let mut metadata = HashMap::new();
    metadata.insert("objectives".to_string(), states.len().to_string());
    save_tensors(dir.join(OPTIMIZER_TENSORS_FILE), &tensors, metadata)?;
    save_json(dir.join(OPTIMIZER_STATE_FILE), &states)
}

/// Read what [`save_optimizer_states`] wrote
pub fn load_optimizer_states(dir: impl AsRef<Path>) -> Result<Vec<OptimizerState>> {
    let dir = dir.as_ref();
    let mut states: Vec<OptimizerState> = load_json(dir.join(OPTIMIZER_STATE_FILE))?;
    let (tensors, _) = load_tensors(dir.join(OPTIMIZER_TENSORS_FILE))?;
    let mut by_name: HashMap<String, NamedTensor> =
        tensors.into_iter().map(|t| (t.name.clone(), t)).collect();

    for (objective, state) in states.iter_mut().enumerate() {
        for (idx, param) in state.params.iter_mut().enumerate() {
            for buffer in &param.buffer_names {
                let key = format!("{objective}.{idx}.{buffer}");
                let tensor = by_name.remove(&key).ok_or_else(|| Error::StateKeyMismatch {
                    message: format!("{key} missing from {}", dir.join(OPTIMIZER_TENSORS_FILE).display()),
                })?;
                param.buffers.insert(buffer.clone(), tensor.data);
            }
        }
    }
    Ok(states)
}
