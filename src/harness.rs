//! Save, train, reload, resume: the checkpoint round-trip scenario
//!
//! 1. Make sure the benchmark archives are present and read them.
//! 2. Build a base embedder and save it to `<root>/model`.
//! 3. Load it, fine-tune on a handful of NLI pairs with checkpointing and
//!    optimizer-state persistence.
//! 4. Load the checkpoint `<root>/<checkpoint_save_steps>` and fine-tune
//!    again, resuming optimizer, scheduler and scaler state.
//! 5. Optionally score the result on STS test.
//! 6. Remove the model and checkpoint directories.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{
    read_nli, read_sts, DataLoader, DatasetPaths, InputExample, StsSplits,
};
use crate::data::reader::DEFAULT_MAX_NLI_EXAMPLES;
use crate::eval::{EmbeddingSimilarityEvaluator, ScoreReport};
use crate::io::load_yaml;
use crate::losses::SoftmaxLoss;
use crate::models::{SentenceEmbedder, WordEmbeddings};
use crate::train::{CheckpointManager, FitConfig, FitResult, LoggingCallback, TrainObjective, Trainer};
use crate::util::remove_dirs_best_effort;
use crate::{Error, Result};

/// NLI label count
const NLI_NUM_LABELS: usize = 3;

/// Where the base embedder comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BaseModel {
    /// Download `vocab.txt` and `model.safetensors` from the Hugging Face hub
    Hub {
        /// Model id, e.g. `distilbert-base-uncased`
        model_id: String,
        /// Local download cache
        cache_dir: PathBuf,
    },
    /// Local directory with `vocab.txt` and `model.safetensors`
    Pretrained {
        /// Directory path
        path: PathBuf,
    },
    /// Vocabulary built from the loaded data, random embeddings
    Random {
        /// Embedding width
        dimension: usize,
        /// Initialization seed
        seed: u64,
    },
}

impl Default for BaseModel {
    fn default() -> Self {
        Self::Hub { model_id: "distilbert-base-uncased".into(), cache_dir: PathBuf::from(".cache/models") }
    }
}

/// Scenario parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Root for `<root>/model` and the step checkpoints
    pub root: PathBuf,
    /// Directory holding (or receiving) the benchmark archives
    pub data_dir: PathBuf,
    /// Download missing archives; when false they must already exist
    pub download: bool,
    /// NLI pairs used for each fine-tuning run
    pub nli_train_examples: usize,
    /// Batch size
    pub batch_size: usize,
    /// Steps per fine-tuning run
    pub steps_per_epoch: usize,
    /// Checkpoint interval
    pub checkpoint_save_steps: usize,
    /// Checkpoints kept
    pub checkpoint_save_total_limit: usize,
    /// Fraction of one pass used for warmup
    pub warmup_ratio: f32,
    /// Mixed-precision emulation
    pub use_amp: bool,
    /// Base model source
    pub base_model: BaseModel,
    /// Expected STS test score (x100); evaluation is skipped when unset
    pub expected_score: Option<f32>,
    /// Remove `<root>/model` and the checkpoint at the end
    pub cleanup: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("sample"),
            data_dir: PathBuf::from("datasets"),
            download: true,
            nli_train_examples: 10,
            batch_size: 16,
            steps_per_epoch: 5,
            checkpoint_save_steps: 5,
            checkpoint_save_total_limit: 1,
            warmup_ratio: 0.1,
            use_amp: true,
            base_model: BaseModel::default(),
            expected_score: None,
            cleanup: true,
        }
    }
}

impl ScenarioConfig {
    /// Load from YAML
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        load_yaml(path)
    }

    /// `<root>/model`
    pub fn model_dir(&self) -> PathBuf {
        self.root.join("model")
    }

    /// `<root>/<checkpoint_save_steps>`
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.root.join(self.checkpoint_save_steps.to_string())
    }
}

/// What happened during a scenario run
#[derive(Debug)]
pub struct ScenarioReport {
    /// Dimension of the saved base model
    pub base_dimension: usize,
    /// Dimension of the model reloaded from the checkpoint
    pub reloaded_dimension: usize,
    /// First fine-tuning run
    pub first_run: FitResult,
    /// Resumed fine-tuning run
    pub second_run: FitResult,
    /// Numerically named checkpoints present before cleanup
    pub checkpoints: Vec<PathBuf>,
    /// STS test comparison, when an expected score was configured
    pub score: Option<ScoreReport>,
    /// Directories that could not be removed
    pub cleanup_failures: Vec<(PathBuf, std::io::Error)>,
}

/// Runs the round trip described in the module docs
#[derive(Debug, Clone)]
pub struct CheckpointScenario {
    config: ScenarioConfig,
}

impl CheckpointScenario {
    /// Scenario with the given parameters
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Parameters
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Run every stage
    pub fn run(&self) -> Result<ScenarioReport> {
        let (nli, sts) = self.load_data()?;
        let train: Vec<InputExample> =
            nli.into_iter().take(self.config.nli_train_examples).collect();
        if train.is_empty() {
            return Err(Error::EmptyDataset { context: "no NLI train pairs".into() });
        }

        let base = self.base_model(&train, &sts)?;
        let base_dimension = base.embedding_dimension();
        base.save(self.config.model_dir())?;

        let mut model = SentenceEmbedder::load(self.config.model_dir())?;
        let first_run = self.fine_tune(&mut model, &train)?;

        let mut model = SentenceEmbedder::load(self.config.checkpoint_dir())?;
        let reloaded_dimension = model.embedding_dimension();
        let second_run = self.fine_tune(&mut model, &train)?;

        let checkpoints = CheckpointManager::new(&self.config.root, None)
            .list_checkpoints()?
            .into_iter()
            .map(|(_, path)| path)
            .collect();

        let score = match self.config.expected_score {
            Some(expected) => {
                let evaluator = EmbeddingSimilarityEvaluator::from_input_examples(&sts.test, "sts-test")?;
                let report = ScoreReport::from_correlation(model.evaluate(&evaluator, None)?, expected);
                report.log();
                Some(report)
            }
            None => None,
        };

        let cleanup_failures = if self.config.cleanup {
            remove_dirs_best_effort(&[self.config.model_dir(), self.config.checkpoint_dir()])
        } else {
            Vec::new()
        };

        Ok(ScenarioReport {
            base_dimension,
            reloaded_dimension,
            first_run,
            second_run,
            checkpoints,
            score,
            cleanup_failures,
        })
    }

    fn load_data(&self) -> Result<(Vec<InputExample>, StsSplits)> {
        let paths = DatasetPaths::in_dir(&self.config.data_dir);
        if self.config.download {
            let fetched = paths.ensure()?;
            info!(fetched, dir = %self.config.data_dir.display(), "datasets ready");
        }
        let nli = read_nli(&paths.nli, DEFAULT_MAX_NLI_EXAMPLES)?;
        let sts = read_sts(&paths.sts)?;
        Ok((nli, sts))
    }

    fn base_model(&self, train: &[InputExample], sts: &StsSplits) -> Result<SentenceEmbedder> {
        match &self.config.base_model {
            BaseModel::Hub { model_id, cache_dir } => {
                Ok(SentenceEmbedder::new(WordEmbeddings::from_hub(model_id, cache_dir)?))
            }
            BaseModel::Pretrained { path } => SentenceEmbedder::from_pretrained(path),
            BaseModel::Random { dimension, seed } => {
                let corpus: Vec<&str> = train
                    .iter()
                    .chain(&sts.train)
                    .chain(&sts.dev)
                    .chain(&sts.test)
                    .flat_map(|e| e.texts().iter().map(String::as_str))
                    .collect();
                SentenceEmbedder::from_corpus(&corpus, *dimension, *seed)
            }
        }
    }

    fn fine_tune(&self, model: &mut SentenceEmbedder, train: &[InputExample]) -> Result<FitResult> {
        let loader = DataLoader::new(train.to_vec(), self.config.batch_size, true);
        let warmup_steps = (loader.len() as f32 * self.config.warmup_ratio) as usize;
        let loss = SoftmaxLoss::new(model.embedding_dimension(), NLI_NUM_LABELS, 0);
        let mut objectives = vec![TrainObjective::new(loader, loss)];

        let config = FitConfig::new()
            .with_epochs(1)
            .with_steps_per_epoch(self.config.steps_per_epoch)
            .with_warmup_steps(warmup_steps)
            .with_checkpoints(
                &self.config.root,
                self.config.checkpoint_save_steps,
                Some(self.config.checkpoint_save_total_limit),
            )
            .with_optimizer_state(true)
            .with_amp(self.config.use_amp);

        let mut trainer = Trainer::new(config);
        trainer.add_callback(LoggingCallback::default());
        trainer.fit(model, &mut objectives, None)
    }
}
