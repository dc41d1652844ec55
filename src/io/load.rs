//! Loading weights and configs

use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;

use super::NamedTensor;
use crate::{Error, Result};

/// Read every tensor of a SafeTensors file together with its metadata.
///
/// All tensors must be F32.
pub fn load_tensors(path: impl AsRef<Path>) -> Result<(Vec<NamedTensor>, HashMap<String, String>)> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;

    let (_, header) = safetensors::SafeTensors::read_metadata(&bytes)?;
    let metadata = header.metadata().clone().unwrap_or_default();

    let tensors = safetensors::SafeTensors::deserialize(&bytes)?;
    let mut names: Vec<String> = tensors.names().iter().map(|s| (*s).to_string()).collect();
    names.sort();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let view = tensors.tensor(&name)?;
        out.push(to_named(&name, &view)?);
    }
    Ok((out, metadata))
}

/// Read the first tensor whose name ends with `suffix`.
///
/// Used to pick the word-embedding matrix out of a full pretrained
/// checkpoint whose prefix depends on the architecture
/// (`bert.embeddings...`, `distilbert.embeddings...`).
pub fn load_tensor_matching(path: impl AsRef<Path>, suffix: &str) -> Result<NamedTensor> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;
    let tensors = safetensors::SafeTensors::deserialize(&bytes)?;

    let mut names: Vec<&str> = tensors.names().into_iter().collect();
    names.sort_unstable();
    let name = names
        .into_iter()
        .find(|n| n.ends_with(suffix))
        .ok_or_else(|| Error::ModelNotFound { path: path.join(suffix) })?;

    let view = tensors.tensor(name)?;
    to_named(name, &view)
}

/// Deserialize a JSON file
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Deserialize a YAML file
pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
    Ok(serde_yaml::from_str(&raw)?)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::ModelNotFound { path: path.to_path_buf() });
    }
    std::fs::read(path).map_err(|e| Error::io(format!("reading {}", path.display()), e))
}

fn to_named(name: &str, view: &safetensors::tensor::TensorView<'_>) -> Result<NamedTensor> {
    if view.dtype() != safetensors::Dtype::F32 {
        return Err(Error::UnsupportedDtype {
            tensor: name.to_string(),
            dtype: format!("{:?}", view.dtype()),
        });
    }
    // Views may be unaligned inside the file buffer, so decode bytewise.
    let data = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(NamedTensor::new(name, view.shape().to_vec(), data))
}
