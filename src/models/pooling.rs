//! Token-to-sentence pooling

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::io::{load_json, save_json};
use crate::{Error, Result};

/// How token vectors are reduced to one sentence vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolingMode {
    /// Average over tokens
    #[default]
    Mean,
    /// Element-wise maximum over tokens
    Max,
    /// First token only
    Cls,
}

/// On-disk pooling config (`config.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolingConfig {
    /// Width of the incoming token vectors
    pub word_embedding_dimension: usize,
    /// Use the first token
    pub pooling_mode_cls_token: bool,
    /// Average tokens
    pub pooling_mode_mean_tokens: bool,
    /// Max over tokens
    pub pooling_mode_max_tokens: bool,
}

/// What [`Pooling::backward`] needs from the forward pass
#[derive(Debug, Clone)]
pub struct PoolingTrace {
    tokens: usize,
    argmax: Vec<usize>,
}

/// Parameter-free pooling head
#[derive(Debug, Clone, PartialEq)]
pub struct Pooling {
    dimension: usize,
    mode: PoolingMode,
}

impl Pooling {
    /// Mean pooling over `dimension`-wide token vectors
    pub fn new(dimension: usize) -> Self {
        Self { dimension, mode: PoolingMode::Mean }
    }

    /// Select the pooling mode
    #[must_use]
    pub fn with_mode(mut self, mode: PoolingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sentence vector width (equal to the token width)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Active mode
    pub fn mode(&self) -> PoolingMode {
        self.mode
    }

    /// Pool `[n_tokens, dim]` into `[dim]`. Zero tokens pool to the zero vector.
    pub fn forward(&self, tokens: ArrayView2<'_, f32>) -> (Array1<f32>, PoolingTrace) {
        let n = tokens.nrows();
        let mut trace = PoolingTrace { tokens: n, argmax: Vec::new() };
        if n == 0 {
            return (Array1::zeros(self.dimension), trace);
        }

        let pooled = match self.mode {
            PoolingMode::Mean => tokens.sum_axis(ndarray::Axis(0)) / n as f32,
            PoolingMode::Cls => tokens.row(0).to_owned(),
            PoolingMode::Max => {
                let mut out = Array1::from_elem(self.dimension, f32::NEG_INFINITY);
                trace.argmax = vec![0; self.dimension];
                for (t, row) in tokens.rows().into_iter().enumerate() {
                    for (d, &v) in row.iter().enumerate() {
                        if v > out[d] {
                            out[d] = v;
                            trace.argmax[d] = t;
                        }
                    }
                }
                out
            }
        };
        (pooled, trace)
    }

    /// Gradient w.r.t. the token vectors
    pub fn backward(&self, trace: &PoolingTrace, grad: ArrayView1<'_, f32>) -> Array2<f32> {
        let n = trace.tokens;
        let mut out = Array2::zeros((n, self.dimension));
        if n == 0 {
            return out;
        }
        match self.mode {
            PoolingMode::Mean => {
                let share = &grad / n as f32;
                for mut row in out.rows_mut() {
                    row.assign(&share);
                }
            }
            PoolingMode::Cls => out.row_mut(0).assign(&grad),
            PoolingMode::Max => {
                for (d, &t) in trace.argmax.iter().enumerate() {
                    out[[t, d]] = grad[d];
                }
            }
        }
        out
    }

    /// Config written to disk
    pub fn config(&self) -> PoolingConfig {
        PoolingConfig {
            word_embedding_dimension: self.dimension,
            pooling_mode_cls_token: self.mode == PoolingMode::Cls,
            pooling_mode_mean_tokens: self.mode == PoolingMode::Mean,
            pooling_mode_max_tokens: self.mode == PoolingMode::Max,
        }
    }

    /// Build from a config; exactly one mode flag must be set
    pub fn from_config(config: &PoolingConfig) -> Result<Self> {
        let mode = match (
            config.pooling_mode_mean_tokens,
            config.pooling_mode_max_tokens,
            config.pooling_mode_cls_token,
        ) {
            (true, false, false) => PoolingMode::Mean,
            (false, true, false) => PoolingMode::Max,
            (false, false, true) => PoolingMode::Cls,
            _ => {
                return Err(Error::Config {
                    field: "pooling".into(),
                    message: "exactly one pooling mode must be enabled".into(),
                })
            }
        };
        Ok(Self { dimension: config.word_embedding_dimension, mode })
    }

    /// Write `config.json` into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;
        save_json(dir.join("config.json"), &self.config())
    }

    /// Read `config.json` from `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let config: PoolingConfig = load_json(dir.as_ref().join("config.json"))?;
        Self::from_config(&config)
    }
}
