//! BERT-style WordPiece tokenizer.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::config::TokenizerConfig;
use crate::{Error, Result};

/// Token ID type
pub type TokenId = u32;

/// Words longer than this many characters map straight to the unknown token
const MAX_INPUT_CHARS_PER_WORD: usize = 100;

/// Continuation prefix for non-initial word pieces
const CONTINUATION: &str = "##";

/// WordPiece tokenizer with greedy longest-match-first segmentation.
///
/// Text is lowercased (optionally), split on whitespace, and every
/// non-alphanumeric character becomes its own word before WordPiece
/// segmentation. Output is truncated to `max_seq_length`.
#[derive(Debug, Clone)]
pub struct WordPieceTokenizer {
    config: TokenizerConfig,
    vocab: HashMap<String, TokenId>,
    id_to_token: Vec<String>,
    unk_id: TokenId,
}

impl WordPieceTokenizer {
    /// Build from an ordered token list (line index = token id).
    pub fn from_tokens(tokens: Vec<String>, config: TokenizerConfig) -> Result<Self> {
        let vocab: HashMap<String, TokenId> =
            tokens.iter().enumerate().map(|(i, t)| (t.clone(), i as TokenId)).collect();
        let unk_id = *vocab.get(&config.special_tokens.unk).ok_or_else(|| Error::Config {
            field: "vocab".into(),
            message: format!("unknown token {} missing from vocabulary", config.special_tokens.unk),
        })?;
        Ok(Self { config, vocab, id_to_token: tokens, unk_id })
    }

    /// Build a whole-word vocabulary from a corpus.
    ///
    /// Words are ranked by frequency (ties broken alphabetically) and the
    /// top `vocab_size - 2` with at least `min_frequency` occurrences are kept
    /// after `[PAD]` and `[UNK]`.
    pub fn build(corpus: &[&str], config: TokenizerConfig) -> Result<Self> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for text in corpus {
            for word in basic_tokenize(text, config.lowercase) {
                *counts.entry(word).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(String, usize)> =
            counts.into_iter().filter(|(_, c)| *c >= config.min_frequency).collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut tokens = vec![config.special_tokens.pad.clone(), config.special_tokens.unk.clone()];
        let budget = config.vocab_size.saturating_sub(tokens.len());
        tokens.extend(words.into_iter().take(budget).map(|(w, _)| w));

        Self::from_tokens(tokens, config)
    }

    /// Load `vocab.txt` (one token per line) from a directory, reading
    /// `tokenizer_config.json` next to it when present.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config_path = dir.join("tokenizer_config.json");
        let config = if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .map_err(|e| Error::io(format!("reading {}", config_path.display()), e))?;
            serde_json::from_str(&raw)?
        } else {
            TokenizerConfig::default()
        };
        Self::from_vocab_file(dir.join("vocab.txt"), config)
    }

    /// Load a `vocab.txt` file with an explicit config
    pub fn from_vocab_file(path: impl AsRef<Path>, config: TokenizerConfig) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        let tokens = raw.lines().map(|l| l.trim_end_matches('\r').to_string()).collect();
        Self::from_tokens(tokens, config)
    }

    /// Write `vocab.txt` and `tokenizer_config.json` into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let mut vocab = self.id_to_token.join("\n");
        vocab.push('\n');
        fs::write(dir.join("vocab.txt"), vocab)
            .map_err(|e| Error::io(format!("writing vocab to {}", dir.display()), e))?;
        let config = serde_json::to_string_pretty(&self.config)?;
        fs::write(dir.join("tokenizer_config.json"), config)
            .map_err(|e| Error::io(format!("writing tokenizer config to {}", dir.display()), e))?;
        Ok(())
    }

    /// Encode text to token IDs, truncated to `max_seq_length`
    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        let mut ids = Vec::new();
        for word in basic_tokenize(text, self.config.lowercase) {
            self.wordpiece(&word, &mut ids);
            if ids.len() >= self.config.max_seq_length {
                ids.truncate(self.config.max_seq_length);
                break;
            }
        }
        ids
    }

    /// Vocabulary size
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.id_to_token.len()
    }

    /// Token for an id
    #[must_use]
    pub fn id_to_token(&self, id: TokenId) -> Option<&str> {
        self.id_to_token.get(id as usize).map(String::as_str)
    }

    /// Id for a token
    #[must_use]
    pub fn token_to_id(&self, token: &str) -> Option<TokenId> {
        self.vocab.get(token).copied()
    }

    /// Id of the unknown token
    #[must_use]
    pub fn unk_id(&self) -> TokenId {
        self.unk_id
    }

    /// Tokenizer configuration
    #[must_use]
    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Change the truncation length
    pub fn set_max_seq_length(&mut self, len: usize) {
        self.config.max_seq_length = len;
    }

    fn wordpiece(&self, word: &str, out: &mut Vec<TokenId>) {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > MAX_INPUT_CHARS_PER_WORD {
            out.push(self.unk_id);
            return;
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let mut end = chars.len();
            let mut found = None;
            while start < end {
                let mut piece: String = chars[start..end].iter().collect();
                if start > 0 {
                    piece.insert_str(0, CONTINUATION);
                }
                if let Some(&id) = self.vocab.get(&piece) {
                    found = Some(id);
                    break;
                }
                end -= 1;
            }
            match found {
                Some(id) => {
                    pieces.push(id);
                    start = end;
                }
                None => {
                    out.push(self.unk_id);
                    return;
                }
            }
        }
        out.extend(pieces);
    }
}

/// Whitespace split plus punctuation isolation
fn basic_tokenize(text: &str, lowercase: bool) -> Vec<String> {
    let text = if lowercase { text.to_lowercase() } else { text.to_string() };
    let mut words = Vec::new();
    for chunk in text.split_whitespace() {
        let mut current = String::new();
        for c in chunk.chars() {
            if c.is_alphanumeric() {
                current.push(c);
            } else {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                words.push(c.to_string());
            }
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> WordPieceTokenizer {
        let tokens = ["[PAD]", "[UNK]", "the", "play", "##ing", "##s", "cat", ",", "."]
            .iter()
            .map(|s| s.to_string())
            .collect();
        WordPieceTokenizer::from_tokens(tokens, TokenizerConfig::default()).unwrap()
    }

    #[test]
    fn test_basic_tokenize_isolates_punctuation() {
        assert_eq!(basic_tokenize("Hi, there.", true), vec!["hi", ",", "there", "."]);
        assert_eq!(basic_tokenize("  ", true), Vec::<String>::new());
    }

    #[test]
    fn test_wordpiece_longest_match() {
        let tok = toy();
        assert_eq!(tok.encode("The cat playing."), vec![2, 6, 3, 4, 8]);
        assert_eq!(tok.encode("plays"), vec![3, 5]);
    }

    #[test]
    fn test_unsegmentable_word_is_unknown() {
        let tok = toy();
        assert_eq!(tok.encode("dog"), vec![tok.unk_id()]);
        assert_eq!(tok.encode("playx"), vec![tok.unk_id()]);
    }

    #[test]
    fn test_truncation() {
        let mut tok = toy();
        tok.set_max_seq_length(2);
        assert_eq!(tok.encode("the cat the cat").len(), 2);
    }

    #[test]
    fn test_build_ranks_by_frequency() {
        let tok = WordPieceTokenizer::build(
            &["b a a", "a c b"],
            TokenizerConfig::default().with_vocab_size(4),
        )
        .unwrap();
        assert_eq!(tok.vocab_size(), 4);
        assert_eq!(tok.id_to_token(2), Some("a"));
        assert_eq!(tok.id_to_token(3), Some("b"));
        assert_eq!(tok.encode("c"), vec![tok.unk_id()]);
    }

    #[test]
    fn test_missing_unk_is_config_error() {
        let err = WordPieceTokenizer::from_tokens(vec!["a".into()], TokenizerConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let tok = toy();
        tok.save(dir.path()).unwrap();
        let loaded = WordPieceTokenizer::load(dir.path()).unwrap();
        assert_eq!(loaded.vocab_size(), tok.vocab_size());
        assert_eq!(loaded.encode("the cats"), tok.encode("the cats"));
    }
}
