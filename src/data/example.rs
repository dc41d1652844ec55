//! Labeled text examples

use serde::{Deserialize, Serialize};

/// Supervision attached to an example
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Label {
    /// Discrete class id (NLI: contradiction / entailment / neutral)
    Class(u32),
    /// Continuous similarity score in `[0, 1]` (STS)
    Score(f32),
}

impl Label {
    /// Class id, if this is a classification label
    #[must_use]
    pub fn as_class(&self) -> Option<u32> {
        match self {
            Self::Class(id) => Some(*id),
            Self::Score(_) => None,
        }
    }

    /// Score, if this is a regression label
    #[must_use]
    pub fn as_score(&self) -> Option<f32> {
        match self {
            Self::Score(s) => Some(*s),
            Self::Class(_) => None,
        }
    }
}

/// A group of texts (usually a sentence pair) with one label.
///
/// Examples are built once while parsing a dataset and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputExample {
    texts: Vec<String>,
    label: Label,
}

impl InputExample {
    /// Create an example from any number of texts
    pub fn new(texts: Vec<String>, label: Label) -> Self {
        Self { texts, label }
    }

    /// Create a sentence-pair example
    pub fn pair(first: impl Into<String>, second: impl Into<String>, label: Label) -> Self {
        Self { texts: vec![first.into(), second.into()], label }
    }

    /// The texts of this example
    #[must_use]
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// The label of this example
    #[must_use]
    pub fn label(&self) -> Label {
        self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_example() {
        let ex = InputExample::pair("a cat", "a dog", Label::Class(2));
        assert_eq!(ex.texts(), &["a cat".to_string(), "a dog".to_string()]);
        assert_eq!(ex.label().as_class(), Some(2));
        assert_eq!(ex.label().as_score(), None);
    }

    #[test]
    fn test_score_label() {
        let ex = InputExample::pair("x", "y", Label::Score(0.8));
        assert_eq!(ex.label().as_score(), Some(0.8));
        assert_eq!(ex.label().as_class(), None);
    }
}
