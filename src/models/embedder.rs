//! Sentence embedder: backbone, pooling and optional projection

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Dense, DenseTrace, Parameter, Pooling, PoolingTrace, WordEmbeddings};
use crate::eval::Evaluator;
use crate::io::{load_json, save_json};
use crate::precision::Precision;
use crate::tokenizer::{TokenId, WordPieceTokenizer};
use crate::{Error, Result};

const MODULES_FILE: &str = "modules.json";
const EMBEDDER_CONFIG_FILE: &str = "sentence_embedder.json";

const WORD_EMBEDDINGS_TYPE: &str = "WordEmbeddings";
const POOLING_TYPE: &str = "Pooling";
const DENSE_TYPE: &str = "Dense";

/// One entry of `modules.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Position in the stack
    pub idx: usize,
    /// Module name
    pub name: String,
    /// Subdirectory holding the module
    pub path: String,
    /// Module kind
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbedderConfig {
    version: String,
    max_seq_length: usize,
}

/// Intermediate state kept for the backward pass of one sentence
#[derive(Debug, Clone)]
pub struct EncodeTrace {
    ids: Vec<TokenId>,
    pooling: PoolingTrace,
    dense: Option<DenseTrace>,
}

/// Maps a sentence to a fixed-size vector.
///
/// The stack is `WordEmbeddings -> Pooling [-> Dense]`. With a reduced
/// [`Precision`] every activation is rounded through that format while the
/// master weights stay fp32.
#[derive(Debug, Clone)]
pub struct SentenceEmbedder {
    embeddings: WordEmbeddings,
    pooling: Pooling,
    dense: Option<Dense>,
    precision: Precision,
    source_dir: Option<PathBuf>,
}

impl SentenceEmbedder {
    /// Backbone plus mean pooling
    pub fn new(embeddings: WordEmbeddings) -> Self {
        let pooling = Pooling::new(embeddings.dimension());
        Self { embeddings, pooling, dense: None, precision: Precision::Fp32, source_dir: None }
    }

    /// Replace the pooling module
    #[must_use]
    pub fn with_pooling(mut self, pooling: Pooling) -> Self {
        self.pooling = pooling;
        self
    }

    /// Append a projection layer
    #[must_use]
    pub fn with_dense(mut self, dense: Dense) -> Self {
        self.dense = Some(dense);
        self
    }

    /// Build a tokenizer from `corpus` and a random backbone on top of it.
    ///
    /// Offline stand-in for a pretrained model.
    pub fn from_corpus(corpus: &[&str], dimension: usize, seed: u64) -> Result<Self> {
        let tokenizer = WordPieceTokenizer::build(corpus, Default::default())?;
        Ok(Self::new(WordEmbeddings::random(tokenizer, dimension, seed)))
    }

    /// Wrap a pretrained backbone directory with mean pooling
    pub fn from_pretrained(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(WordEmbeddings::from_pretrained(dir)?))
    }

    /// Output width
    pub fn embedding_dimension(&self) -> usize {
        match &self.dense {
            Some(dense) => dense.out_features(),
            None => self.pooling.dimension(),
        }
    }

    /// Activation precision
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Set activation precision
    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    /// Directory this model was loaded from, if any
    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    /// Tokenizer of the backbone
    pub fn tokenizer(&self) -> &WordPieceTokenizer {
        self.embeddings.tokenizer()
    }

    /// Embed one sentence, keeping what the backward pass needs
    pub fn forward(&self, text: &str) -> (Array1<f32>, EncodeTrace) {
        let ids = self.embeddings.tokenize(text);
        let mut tokens = self.embeddings.forward(&ids);
        self.precision.round_array(&mut tokens);

        let (mut pooled, pooling) = self.pooling.forward(tokens.view());
        self.precision.round_array(&mut pooled);

        let dense = match &self.dense {
            Some(layer) => {
                let (mut out, trace) = layer.forward(pooled.view());
                self.precision.round_array(&mut out);
                pooled = out;
                Some(trace)
            }
            None => None,
        };
        (pooled, EncodeTrace { ids, pooling, dense })
    }

    /// Backpropagate `grad` (w.r.t. the sentence vector) into every module
    pub fn backward(&mut self, trace: &EncodeTrace, grad: ArrayView1<'_, f32>) {
        let pooled_grad = match (&mut self.dense, &trace.dense) {
            (Some(layer), Some(dense_trace)) => layer.backward(dense_trace, grad),
            _ => grad.to_owned(),
        };
        let token_grad = self.pooling.backward(&trace.pooling, pooled_grad.view());
        self.embeddings.backward(&trace.ids, token_grad.view());
    }

    /// Embed a batch of sentences into `[n, dim]`
    pub fn encode(&self, sentences: &[&str]) -> Array2<f32> {
        let mut out = Array2::zeros((sentences.len(), self.embedding_dimension()));
        for (row, sentence) in sentences.iter().enumerate() {
            out.row_mut(row).assign(&self.forward(sentence).0);
        }
        out
    }

    /// Trainable parameters in a stable order
    pub fn parameters(&self) -> Vec<&Parameter> {
        let mut params = vec![self.embeddings.parameter()];
        if let Some(dense) = &self.dense {
            params.extend(dense.parameters());
        }
        params
    }

    /// Mutable trainable parameters, same order as [`Self::parameters`]
    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = vec![self.embeddings.parameter_mut()];
        if let Some(dense) = &mut self.dense {
            params.extend(dense.parameters_mut());
        }
        params
    }

    /// Clear all gradients
    pub fn zero_grad(&mut self) {
        for p in self.parameters_mut() {
            p.zero_grad();
        }
    }

    /// Run an evaluator against this model
    pub fn evaluate(&self, evaluator: &dyn Evaluator, output_path: Option<&Path>) -> Result<f32> {
        evaluator.evaluate(self, output_path, None, None)
    }

    /// Write the full bundle into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;

        let mut modules = vec![
            module_entry(0, WORD_EMBEDDINGS_TYPE),
            module_entry(1, POOLING_TYPE),
        ];
        self.embeddings.save(dir.join(&modules[0].path))?;
        self.pooling.save(dir.join(&modules[1].path))?;
        if let Some(dense) = &self.dense {
            let entry = module_entry(2, DENSE_TYPE);
            dense.save(dir.join(&entry.path))?;
            modules.push(entry);
        }

        save_json(dir.join(MODULES_FILE), &modules)?;
        save_json(
            dir.join(EMBEDDER_CONFIG_FILE),
            &EmbedderConfig {
                version: env!("CARGO_PKG_VERSION").to_string(),
                max_seq_length: self.tokenizer().config().max_seq_length,
            },
        )?;
        info!(dir = %dir.display(), modules = modules.len(), "saved sentence embedder");
        Ok(())
    }

    /// Load a bundle written by [`Self::save`]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let modules_path = dir.join(MODULES_FILE);
        if !modules_path.exists() {
            return Err(Error::ModelNotFound { path: dir.to_path_buf() });
        }
        let modules: Vec<ModuleEntry> = load_json(&modules_path)?;

        let mut embeddings = None;
        let mut pooling = None;
        let mut dense = None;
        for entry in &modules {
            let module_dir = dir.join(&entry.path);
            debug!(module = %entry.name, kind = %entry.kind, "loading module");
            match entry.kind.as_str() {
                WORD_EMBEDDINGS_TYPE => embeddings = Some(WordEmbeddings::load(&module_dir)?),
                POOLING_TYPE => pooling = Some(Pooling::load(&module_dir)?),
                DENSE_TYPE => dense = Some(Dense::load(&module_dir)?),
                other => {
                    return Err(Error::Config {
                        field: "modules.json".into(),
                        message: format!("unknown module type '{other}'"),
                    })
                }
            }
        }

        let mut embeddings = embeddings.ok_or_else(|| Error::Config {
            field: "modules.json".into(),
            message: "no WordEmbeddings module".into(),
        })?;
        let config_path = dir.join(EMBEDDER_CONFIG_FILE);
        if config_path.exists() {
            let config: EmbedderConfig = load_json(&config_path)?;
            embeddings.set_max_seq_length(config.max_seq_length);
        }
        let pooling = pooling.unwrap_or_else(|| Pooling::new(embeddings.dimension()));

        info!(dir = %dir.display(), "loaded sentence embedder");
        Ok(Self { embeddings, pooling, dense, precision: Precision::Fp32, source_dir: Some(dir.to_path_buf()) })
    }
}

fn module_entry(idx: usize, kind: &str) -> ModuleEntry {
    ModuleEntry {
        idx,
        name: idx.to_string(),
        path: format!("{idx}_{kind}"),
        kind: kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activation, PoolingMode};
    use approx::assert_abs_diff_eq;

    const CORPUS: [&str; 3] = ["a man is eating food", "a woman plays guitar", "the cat sleeps"];

    fn embedder() -> SentenceEmbedder {
        SentenceEmbedder::from_corpus(&CORPUS, 8, 3).unwrap()
    }

    #[test]
    fn test_encode_shape() {
        let model = embedder();
        let out = model.encode(&["a man", "the cat sleeps", ""]);
        assert_eq!(out.shape(), &[3, 8]);
        assert!(out.row(2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dense_changes_dimension() {
        let model = embedder().with_dense(Dense::new(8, 5, Activation::Tanh, 1));
        assert_eq!(model.embedding_dimension(), 5);
        assert_eq!(model.parameters().len(), 3);
    }

    #[test]
    fn test_save_load_preserves_output() {
        let dir = tempfile::tempdir().unwrap();
        let model = embedder()
            .with_pooling(Pooling::new(8).with_mode(PoolingMode::Max))
            .with_dense(Dense::new(8, 4, Activation::Tanh, 2));
        model.save(dir.path()).unwrap();
        assert!(dir.path().join("0_WordEmbeddings/vocab.txt").exists());
        assert!(dir.path().join("2_Dense/model.safetensors").exists());

        let loaded = SentenceEmbedder::load(dir.path()).unwrap();
        assert_eq!(loaded.embedding_dimension(), 4);
        assert_eq!(loaded.source_dir(), Some(dir.path()));
        let (a, b) = (model.encode(&["a woman plays"]), loaded.encode(&["a woman plays"]));
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_load_missing_dir_is_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = SentenceEmbedder::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::ModelNotFound { .. }));
    }

    #[test]
    fn test_backward_touches_only_used_rows() {
        let mut model = embedder();
        let (_, trace) = model.forward("cat");
        model.backward(&trace, Array1::ones(8).view());
        let id = model.tokenizer().token_to_id("cat").unwrap() as usize;
        let grad = model.parameters()[0].grad().clone();
        let dim = 8;
        assert!(grad.iter().skip(id * dim).take(dim).all(|&g| g == 1.0));
        assert_abs_diff_eq!(grad.sum(), 8.0);
    }
}
