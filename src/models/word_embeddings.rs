//! Token-embedding backbone

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Parameter;
use crate::data::ensure_downloaded;
use crate::io::{load_json, load_tensor_matching, save_json, save_tensors, NamedTensor};
use crate::tokenizer::{TokenId, WordPieceTokenizer};
use crate::{Error, Result};

/// Name suffix of the word-embedding matrix in pretrained checkpoints
pub const WORD_EMBEDDINGS_TENSOR: &str = "word_embeddings.weight";

/// Hugging Face hub download root
const HF_HUB_URL: &str = "https://huggingface.co";

/// Files fetched for a hub model
const HUB_FILES: [&str; 2] = ["vocab.txt", "model.safetensors"];

/// Persisted backbone description
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WordEmbeddingsConfig {
    vocab_size: usize,
    embedding_dimension: usize,
    max_seq_length: usize,
}

/// WordPiece tokenizer plus a trainable `[vocab_size, dim]` embedding table.
///
/// Produces one vector per token; a [`super::Pooling`] module reduces them to
/// a single sentence vector.
#[derive(Debug, Clone)]
pub struct WordEmbeddings {
    tokenizer: WordPieceTokenizer,
    weight: Parameter,
}

impl WordEmbeddings {
    /// Randomly initialized table for `tokenizer`'s vocabulary
    pub fn random(tokenizer: WordPieceTokenizer, dimension: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bound = (3.0 / dimension.max(1) as f32).sqrt();
        let table = Array2::from_shape_fn((tokenizer.vocab_size(), dimension), |_| {
            rng.gen_range(-bound..bound)
        });
        Self { tokenizer, weight: Parameter::from_matrix(WORD_EMBEDDINGS_TENSOR, table) }
    }

    /// Load from a directory holding `vocab.txt` and `model.safetensors`.
    ///
    /// Works both for bundles written by [`WordEmbeddings::save`] and for
    /// BERT-family checkpoints, whose embedding matrix is found by its
    /// `word_embeddings.weight` suffix.
    pub fn from_pretrained(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let tokenizer = WordPieceTokenizer::load(dir)?;
        let tensor = load_tensor_matching(dir.join("model.safetensors"), WORD_EMBEDDINGS_TENSOR)?;

        let (rows, cols) = match tensor.shape.as_slice() {
            &[rows, cols] => (rows, cols),
            _ => {
                return Err(Error::ShapeMismatch {
                    tensor: tensor.name.clone(),
                    expected: vec![tokenizer.vocab_size(), 0],
                    actual: tensor.shape.clone(),
                })
            }
        };
        if rows != tokenizer.vocab_size() {
            return Err(Error::ShapeMismatch {
                tensor: tensor.name,
                expected: vec![tokenizer.vocab_size(), cols],
                actual: vec![rows, cols],
            });
        }

        let table = Array2::from_shape_vec((rows, cols), tensor.data)
            .map_err(|e| Error::serialization(format!("word embeddings: {e}")))?;
        info!(dir = %dir.display(), vocab = rows, dim = cols, "loaded word embeddings");
        Ok(Self { tokenizer, weight: Parameter::from_matrix(WORD_EMBEDDINGS_TENSOR, table) })
    }

    /// Download `vocab.txt` and `model.safetensors` for a hub model id
    /// (e.g. `distilbert-base-uncased`) into `cache_dir`, then load it.
    pub fn from_hub(model_id: &str, cache_dir: impl AsRef<Path>) -> Result<Self> {
        let local = hub_cache_dir(cache_dir.as_ref(), model_id);
        for file in HUB_FILES {
            let url = format!("{HF_HUB_URL}/{model_id}/resolve/main/{file}");
            ensure_downloaded(&url, &local.join(file))?;
        }
        Self::from_pretrained(&local)
    }

    /// Write vocabulary, weights and config into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;
        self.tokenizer.save(dir)?;
        let tensor = NamedTensor::new(
            self.weight.name(),
            self.weight.shape().to_vec(),
            self.weight.data().to_vec(),
        );
        save_tensors(dir.join("model.safetensors"), &[tensor], HashMap::new())?;
        save_json(
            dir.join("config.json"),
            &WordEmbeddingsConfig {
                vocab_size: self.tokenizer.vocab_size(),
                embedding_dimension: self.dimension(),
                max_seq_length: self.tokenizer.config().max_seq_length,
            },
        )
    }

    /// Load a directory written by [`WordEmbeddings::save`]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let embeddings = Self::from_pretrained(dir)?;
        let config: WordEmbeddingsConfig = load_json(dir.join("config.json"))?;
        if config.embedding_dimension != embeddings.dimension() {
            return Err(Error::ShapeMismatch {
                tensor: WORD_EMBEDDINGS_TENSOR.into(),
                expected: vec![config.vocab_size, config.embedding_dimension],
                actual: embeddings.weight.shape().to_vec(),
            });
        }
        Ok(embeddings)
    }

    /// Embedding width
    pub fn dimension(&self) -> usize {
        self.weight.shape()[1]
    }

    /// Tokenizer used by this backbone
    pub fn tokenizer(&self) -> &WordPieceTokenizer {
        &self.tokenizer
    }

    /// Change the tokenizer's truncation length
    pub fn set_max_seq_length(&mut self, len: usize) {
        self.tokenizer.set_max_seq_length(len);
    }

    /// Tokenize text
    pub fn tokenize(&self, text: &str) -> Vec<TokenId> {
        self.tokenizer.encode(text)
    }

    /// Token vectors `[n_tokens, dim]`
    pub fn forward(&self, ids: &[TokenId]) -> Array2<f32> {
        let table = self.weight.matrix();
        let mut out = Array2::zeros((ids.len(), self.dimension()));
        for (row, &id) in ids.iter().enumerate() {
            out.row_mut(row).assign(&table.row(id as usize));
        }
        out
    }

    /// Scatter-add token gradients into the table gradient
    pub fn backward(&mut self, ids: &[TokenId], grad: ArrayView2<'_, f32>) {
        let mut table_grad = self.weight.grad_matrix_mut();
        for (row, &id) in ids.iter().enumerate() {
            let mut target = table_grad.row_mut(id as usize);
            target += &grad.row(row);
        }
    }

    /// The embedding table
    pub fn parameter(&self) -> &Parameter {
        &self.weight
    }

    /// Mutable embedding table
    pub fn parameter_mut(&mut self) -> &mut Parameter {
        &mut self.weight
    }
}

fn hub_cache_dir(cache_dir: &Path, model_id: &str) -> PathBuf {
    cache_dir.join(model_id.replace('/', "--"))
}
