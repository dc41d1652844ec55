//! Tokenizer configuration types.

use serde::{Deserialize, Serialize};

/// Special tokens (BERT naming)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    /// Padding token
    pub pad: String,
    /// Unknown token
    pub unk: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self { pad: "[PAD]".to_string(), unk: "[UNK]".to_string() }
    }
}

/// Tokenizer configuration, persisted as `tokenizer_config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Maximum vocabulary size when building from a corpus
    pub vocab_size: usize,
    /// Minimum word frequency when building from a corpus
    pub min_frequency: usize,
    /// Special tokens
    pub special_tokens: SpecialTokens,
    /// Whether to lowercase input
    pub lowercase: bool,
    /// Longer inputs are truncated to this many tokens
    pub max_seq_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            vocab_size: 30_522,
            min_frequency: 1,
            special_tokens: SpecialTokens::default(),
            lowercase: true,
            max_seq_length: 128,
        }
    }
}

impl TokenizerConfig {
    /// Set vocabulary size
    #[must_use]
    pub fn with_vocab_size(mut self, size: usize) -> Self {
        self.vocab_size = size;
        self
    }

    /// Set maximum sequence length
    #[must_use]
    pub fn with_max_seq_length(mut self, len: usize) -> Self {
        self.max_seq_length = len;
        self
    }

    /// Set lowercasing
    #[must_use]
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }
}
