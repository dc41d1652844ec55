//! Training objectives for sentence pairs
//!
//! A loss embeds both sentences of every pair, computes its objective and
//! backpropagates into the embedder as well as into its own head parameters.

mod cosine;
mod softmax;
mod traits;

pub use cosine::CosineSimilarityLoss;
pub use softmax::SoftmaxLoss;
pub use traits::Loss;

use crate::data::InputExample;
use crate::{Error, Result};

/// Borrow the two texts of a pair example
fn pair_texts(example: &InputExample) -> Result<(&str, &str)> {
    match example.texts() {
        [first, second] => Ok((first.as_str(), second.as_str())),
        texts => Err(Error::Config {
            field: "texts".into(),
            message: format!("pair objective needs 2 texts per example, got {}", texts.len()),
        }),
    }
}
