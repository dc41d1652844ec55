//! Saving weights and configs

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use super::NamedTensor;
use crate::{Error, Result};

/// Write tensors to a SafeTensors file with string metadata.
///
/// # Example
///
/// ```no_run
/// use sentence_tune::io::{save_tensors, NamedTensor};
/// use std::collections::HashMap;
///
/// let weight = NamedTensor::new("classifier.weight", vec![1, 2], vec![0.5, -0.5]);
/// save_tensors("model.safetensors", &[weight], HashMap::new()).unwrap();
/// ```
pub fn save_tensors(
    path: impl AsRef<Path>,
    tensors: &[NamedTensor],
    metadata: HashMap<String, String>,
) -> Result<()> {
    let path = path.as_ref();

    let views = tensors
        .iter()
        .map(|t| {
            let bytes: &[u8] = bytemuck::cast_slice(&t.data);
            safetensors::tensor::TensorView::new(safetensors::Dtype::F32, t.shape.clone(), bytes)
                .map(|view| (t.name.as_str(), view))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let metadata = if metadata.is_empty() { None } else { Some(metadata) };
    let bytes = safetensors::serialize(views, metadata)?;
    std::fs::write(path, bytes).map_err(|e| Error::io(format!("writing {}", path.display()), e))
}

/// Write a value as pretty JSON
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| Error::io(format!("writing {}", path.display()), e))
}
