//! Regression of cosine similarity onto a gold score

use super::{pair_texts, Loss};
use crate::data::InputExample;
use crate::models::SentenceEmbedder;
use crate::{Error, Result};

const NORM_EPS: f32 = 1e-8;

/// `mean((cos(u, v) - score)^2)` for score-labelled pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarityLoss;

impl CosineSimilarityLoss {
    /// Create the loss
    pub fn new() -> Self {
        Self
    }
}

impl Loss for CosineSimilarityLoss {
    fn name(&self) -> &'static str {
        "cosine_similarity"
    }

    fn compute(
        &mut self,
        model: &mut SentenceEmbedder,
        batch: &[InputExample],
        loss_scale: f32,
    ) -> Result<f32> {
        if batch.is_empty() {
            return Err(Error::EmptyDataset { context: "cosine loss batch".into() });
        }
        let precision = model.precision();
        let n = batch.len() as f32;
        let mut total = 0.0;

        for example in batch {
            let score = example.label().as_score().ok_or_else(|| Error::Config {
                field: "label".into(),
                message: "cosine similarity loss needs score labels".into(),
            })?;
            let (a, b) = pair_texts(example)?;
            let (u, trace_u) = model.forward(a);
            let (v, trace_v) = model.forward(b);

            let nu = u.dot(&u).sqrt().max(NORM_EPS);
            let nv = v.dot(&v).sqrt().max(NORM_EPS);
            let cos = u.dot(&v) / (nu * nv);
            let err = cos - score;
            total += err * err;

            let dcos = 2.0 * err / n * loss_scale;
            let mut du = (&v / (nu * nv) - &u * (cos / (nu * nu))) * dcos;
            let mut dv = (&u / (nu * nv) - &v * (cos / (nv * nv))) * dcos;
            precision.round_array(&mut du);
            precision.round_array(&mut dv);
            model.backward(&trace_u, du.view());
            model.backward(&trace_v, dv.view());
        }
        Ok(total / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Label;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identical_sentences_with_score_one_have_zero_loss() {
        let mut model = SentenceEmbedder::from_corpus(&["red apple", "green pear"], 4, 1).unwrap();
        let batch = vec![InputExample::pair("red apple", "red apple", Label::Score(1.0))];
        let value = CosineSimilarityLoss.compute(&mut model, &batch, 1.0).unwrap();
        assert_abs_diff_eq!(value, 0.0, epsilon = 1e-6);
        assert!(model.parameters()[0].grad().iter().all(|g| g.abs() < 1e-4));
    }

    #[test]
    fn test_training_moves_cosine_toward_score() {
        let mut model = SentenceEmbedder::from_corpus(&["red apple", "green pear"], 4, 1).unwrap();
        let batch = vec![InputExample::pair("red apple", "green pear", Label::Score(1.0))];
        let before = CosineSimilarityLoss.compute(&mut model, &batch, 1.0).unwrap();
        for p in model.parameters_mut() {
            let step = p.grad().mapv(|g| -0.02 * g);
            *p.data_mut() += &step;
        }
        model.zero_grad();
        let after = CosineSimilarityLoss.compute(&mut model, &batch, 1.0).unwrap();
        assert!(after < before);
    }

    #[test]
    fn test_class_labels_are_rejected() {
        let mut model = SentenceEmbedder::from_corpus(&["x"], 4, 1).unwrap();
        let batch = vec![InputExample::pair("x", "x", Label::Class(1))];
        assert!(CosineSimilarityLoss.compute(&mut model, &batch, 1.0).is_err());
    }
}
