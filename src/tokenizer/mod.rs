//! Subword tokenization
//!
//! BERT-compatible WordPiece tokenization. A tokenizer either loads a
//! pretrained `vocab.txt` or builds a whole-word vocabulary from a corpus.
//!
//! # Example
//!
//! ```
//! use sentence_tune::tokenizer::{TokenizerConfig, WordPieceTokenizer};
//!
//! let tokenizer =
//!     WordPieceTokenizer::build(&["hello world", "hello there"], TokenizerConfig::default())
//!         .unwrap();
//! assert_eq!(tokenizer.encode("hello").len(), 1);
//! ```

mod config;
mod wordpiece;

pub use config::{SpecialTokens, TokenizerConfig};
pub use wordpiece::{TokenId, WordPieceTokenizer};
