//! Correlation of embedding similarities with gold scores

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::correlation::{pearson, spearman};
use super::Evaluator;
use crate::data::InputExample;
use crate::models::SentenceEmbedder;
use crate::util::cos_sim;
use crate::{Error, Result};

const CSV_HEADER: &str = "epoch,steps,cosine_pearson,cosine_spearman,euclidean_pearson,\
euclidean_spearman,manhattan_pearson,manhattan_spearman,dot_pearson,dot_spearman";

/// Similarity used to pick the returned score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityFunction {
    /// Cosine similarity
    Cosine,
    /// Negative Euclidean distance
    Euclidean,
    /// Negative Manhattan distance
    Manhattan,
    /// Dot product
    Dot,
}

/// Pearson and Spearman for one similarity function
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Correlations {
    /// Pearson correlation
    pub pearson: f32,
    /// Spearman rank correlation
    pub spearman: f32,
}

/// Correlations for every similarity function
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimilarityScores {
    /// Cosine
    pub cosine: Correlations,
    /// Euclidean
    pub euclidean: Correlations,
    /// Manhattan
    pub manhattan: Correlations,
    /// Dot product
    pub dot: Correlations,
}

impl SimilarityScores {
    /// Spearman of one function
    pub fn spearman(&self, function: SimilarityFunction) -> f32 {
        match function {
            SimilarityFunction::Cosine => self.cosine.spearman,
            SimilarityFunction::Euclidean => self.euclidean.spearman,
            SimilarityFunction::Manhattan => self.manhattan.spearman,
            SimilarityFunction::Dot => self.dot.spearman,
        }
    }

    /// Largest Spearman across functions
    pub fn max_spearman(&self) -> f32 {
        [self.cosine, self.euclidean, self.manhattan, self.dot]
            .iter()
            .map(|c| c.spearman)
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Embeds both sides of every pair and correlates their similarity with the
/// gold score.
#[derive(Debug, Clone)]
pub struct EmbeddingSimilarityEvaluator {
    sentences1: Vec<String>,
    sentences2: Vec<String>,
    scores: Vec<f32>,
    name: String,
    main_similarity: Option<SimilarityFunction>,
    write_csv: bool,
}

impl EmbeddingSimilarityEvaluator {
    /// Build from parallel sentence lists and scores
    pub fn new(
        sentences1: Vec<String>,
        sentences2: Vec<String>,
        scores: Vec<f32>,
        name: impl Into<String>,
    ) -> Result<Self> {
        if sentences1.len() != sentences2.len() || sentences1.len() != scores.len() {
            return Err(Error::Config {
                field: "sentences".into(),
                message: format!(
                    "length mismatch: {} / {} / {}",
                    sentences1.len(),
                    sentences2.len(),
                    scores.len()
                ),
            });
        }
        if sentences1.is_empty() {
            return Err(Error::EmptyDataset { context: "similarity evaluator".into() });
        }
        Ok(Self {
            sentences1,
            sentences2,
            scores,
            name: name.into(),
            main_similarity: None,
            write_csv: true,
        })
    }

    /// Build from score-labelled pair examples
    pub fn from_input_examples(examples: &[InputExample], name: impl Into<String>) -> Result<Self> {
        let mut s1 = Vec::with_capacity(examples.len());
        let mut s2 = Vec::with_capacity(examples.len());
        let mut scores = Vec::with_capacity(examples.len());
        for example in examples {
            let [a, b] = example.texts() else {
                return Err(Error::Config {
                    field: "texts".into(),
                    message: format!("expected sentence pairs, got {} texts", example.texts().len()),
                });
            };
            let score = example.label().as_score().ok_or_else(|| Error::Config {
                field: "label".into(),
                message: "similarity evaluation needs score labels".into(),
            })?;
            s1.push(a.clone());
            s2.push(b.clone());
            scores.push(score);
        }
        Self::new(s1, s2, scores, name)
    }

    /// Return the Spearman of this function instead of the maximum
    #[must_use]
    pub fn with_main_similarity(mut self, function: SimilarityFunction) -> Self {
        self.main_similarity = Some(function);
        self
    }

    /// Enable or disable the CSV log
    #[must_use]
    pub fn with_csv(mut self, write_csv: bool) -> Self {
        self.write_csv = write_csv;
        self
    }

    /// CSV file name inside the output directory
    pub fn csv_file(&self) -> String {
        format!("similarity_evaluation_{}_results.csv", self.name)
    }

    /// All correlations for `model`
    pub fn compute(&self, model: &SentenceEmbedder) -> SimilarityScores {
        let refs1: Vec<&str> = self.sentences1.iter().map(String::as_str).collect();
        let refs2: Vec<&str> = self.sentences2.iter().map(String::as_str).collect();
        let e1 = model.encode(&refs1);
        let e2 = model.encode(&refs2);

        let n = self.scores.len();
        let (mut cosine, mut euclidean, mut manhattan, mut dot) =
            (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
        for (u, v) in e1.rows().into_iter().zip(e2.rows()) {
            cosine.push(cos_sim(u, v));
            euclidean.push(-distance(u, v, |d| d * d).sqrt());
            manhattan.push(-distance(u, v, f32::abs));
            dot.push(u.dot(&v));
        }

        let correlate = |sims: &[f32]| Correlations {
            pearson: pearson(&self.scores, sims),
            spearman: spearman(&self.scores, sims),
        };
        SimilarityScores {
            cosine: correlate(&cosine),
            euclidean: correlate(&euclidean),
            manhattan: correlate(&manhattan),
            dot: correlate(&dot),
        }
    }

    fn append_csv(
        &self,
        dir: &Path,
        epoch: Option<usize>,
        steps: Option<usize>,
        scores: &SimilarityScores,
    ) -> Result<()> {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;
        let path = dir.join(self.csv_file());
        let is_new = !path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::io(format!("opening {}", path.display()), e))?;

        let field = |v: Option<usize>| v.map_or_else(|| "-1".to_string(), |v| v.to_string());
        let mut row = String::new();
        if is_new {
            row.push_str(CSV_HEADER);
            row.push('\n');
        }
        row.push_str(&format!("{},{}", field(epoch), field(steps)));
        for c in [scores.cosine, scores.euclidean, scores.manhattan, scores.dot] {
            row.push_str(&format!(",{},{}", c.pearson, c.spearman));
        }
        row.push('\n');
        file.write_all(row.as_bytes())
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))
    }
}

fn distance(u: ArrayView1<'_, f32>, v: ArrayView1<'_, f32>, f: impl Fn(f32) -> f32) -> f32 {
    u.iter().zip(v.iter()).map(|(a, b)| f(a - b)).sum()
}

impl Evaluator for EmbeddingSimilarityEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(
        &self,
        model: &SentenceEmbedder,
        output_path: Option<&Path>,
        epoch: Option<usize>,
        steps: Option<usize>,
    ) -> Result<f32> {
        let scores = self.compute(model);
        info!(
            dataset = %self.name,
            cosine_pearson = format_args!("{:.4}", scores.cosine.pearson),
            cosine_spearman = format_args!("{:.4}", scores.cosine.spearman),
            manhattan_spearman = format_args!("{:.4}", scores.manhattan.spearman),
            euclidean_spearman = format_args!("{:.4}", scores.euclidean.spearman),
            dot_spearman = format_args!("{:.4}", scores.dot.spearman),
            "embedding similarity evaluation"
        );
        if self.write_csv {
            if let Some(dir) = output_path {
                self.append_csv(dir, epoch, steps, &scores)?;
            }
        }
        Ok(match self.main_similarity {
            Some(function) => scores.spearman(function),
            None => scores.max_spearman(),
        })
    }
}
