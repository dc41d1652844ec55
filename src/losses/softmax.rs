//! Softmax classification over concatenated pair features

use ndarray::{s, Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{pair_texts, Loss};
use crate::data::InputExample;
use crate::models::{Parameter, SentenceEmbedder};
use crate::{Error, Result};

/// Cross-entropy over `W · concat(u, v, |u - v| [, u * v]) + b`.
///
/// Used for NLI training with three labels.
#[derive(Debug, Clone)]
pub struct SoftmaxLoss {
    weight: Parameter,
    bias: Parameter,
    dimension: usize,
    num_labels: usize,
    concat_difference: bool,
    concat_multiplication: bool,
}

impl SoftmaxLoss {
    /// Head for `dimension`-wide embeddings and `num_labels` classes, with
    /// the `(u, v, |u - v|)` feature layout
    pub fn new(dimension: usize, num_labels: usize, seed: u64) -> Self {
        Self::with_features(dimension, num_labels, true, false, seed)
    }

    /// Head with an explicit feature layout
    pub fn with_features(
        dimension: usize,
        num_labels: usize,
        concat_difference: bool,
        concat_multiplication: bool,
        seed: u64,
    ) -> Self {
        let blocks = 2 + usize::from(concat_difference) + usize::from(concat_multiplication);
        let features = blocks * dimension;
        let mut rng = StdRng::seed_from_u64(seed);
        let bound = 1.0 / (features.max(1) as f32).sqrt();
        let weight = Array2::from_shape_fn((num_labels, features), |_| rng.gen_range(-bound..bound));
        Self {
            weight: Parameter::from_matrix("classifier.weight", weight),
            bias: Parameter::from_vector("classifier.bias", Array1::zeros(num_labels)),
            dimension,
            num_labels,
            concat_difference,
            concat_multiplication,
        }
    }

    /// Number of classes
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn features(&self, u: &Array1<f32>, v: &Array1<f32>) -> Array1<f32> {
        let diff;
        let prod;
        let mut parts = vec![u.view(), v.view()];
        if self.concat_difference {
            diff = (u - v).mapv(f32::abs);
            parts.push(diff.view());
        }
        if self.concat_multiplication {
            prod = u * v;
            parts.push(prod.view());
        }
        ndarray::concatenate(ndarray::Axis(0), &parts).expect("feature blocks share one axis")
    }

    /// Split the feature gradient back into `(du, dv)`
    fn split_feature_grad(
        &self,
        grad: &Array1<f32>,
        u: &Array1<f32>,
        v: &Array1<f32>,
    ) -> (Array1<f32>, Array1<f32>) {
        let d = self.dimension;
        let mut du = grad.slice(s![0..d]).to_owned();
        let mut dv = grad.slice(s![d..2 * d]).to_owned();
        let mut offset = 2 * d;
        if self.concat_difference {
            let g = grad.slice(s![offset..offset + d]);
            let sign = (u - v).mapv(f32::signum);
            let term = &g * &sign;
            du += &term;
            dv -= &term;
            offset += d;
        }
        if self.concat_multiplication {
            let g = grad.slice(s![offset..offset + d]);
            du += &(&g * v);
            dv += &(&g * u);
        }
        (du, dv)
    }
}

impl Loss for SoftmaxLoss {
    fn name(&self) -> &'static str {
        "softmax"
    }

    fn compute(
        &mut self,
        model: &mut SentenceEmbedder,
        batch: &[InputExample],
        loss_scale: f32,
    ) -> Result<f32> {
        if batch.is_empty() {
            return Err(Error::EmptyDataset { context: "softmax loss batch".into() });
        }
        if model.embedding_dimension() != self.dimension {
            return Err(Error::ShapeMismatch {
                tensor: "sentence_embedding".into(),
                expected: vec![self.dimension],
                actual: vec![model.embedding_dimension()],
            });
        }

        let precision = model.precision();
        let scale = loss_scale / batch.len() as f32;
        let mut total = 0.0;

        for example in batch {
            let label = example.label().as_class().ok_or_else(|| Error::Config {
                field: "label".into(),
                message: "softmax loss needs class labels".into(),
            })? as usize;
            if label >= self.num_labels {
                return Err(Error::Config {
                    field: "label".into(),
                    message: format!("class {label} out of range for {} labels", self.num_labels),
                });
            }
            let (a, b) = pair_texts(example)?;
            let (u, trace_u) = model.forward(a);
            let (v, trace_v) = model.forward(b);

            let features = self.features(&u, &v);
            let mut logits = self.weight.matrix().dot(&features) + self.bias.data();
            precision.round_array(&mut logits);

            let max = logits.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
            let exp = logits.mapv(|x| (x - max).exp());
            let probs = &exp / exp.sum();
            total += -probs[label].max(f32::MIN_POSITIVE).ln();

            let mut dz = probs;
            dz[label] -= 1.0;
            dz *= scale;
            precision.round_array(&mut dz);

            {
                let mut wg = self.weight.grad_matrix_mut();
                for (row, mut g) in wg.rows_mut().into_iter().enumerate() {
                    g.scaled_add(dz[row], &features);
                }
            }
            *self.bias.grad_mut() += &dz;

            let feature_grad = self.weight.matrix().t().dot(&dz);
            let (mut du, mut dv) = self.split_feature_grad(&feature_grad, &u, &v);
            precision.round_array(&mut du);
            precision.round_array(&mut dv);
            model.backward(&trace_u, du.view());
            model.backward(&trace_v, dv.view());
        }

        Ok(total / batch.len() as f32)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }
}
