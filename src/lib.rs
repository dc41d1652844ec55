//! sentence-tune: sentence-embedding fine-tuning with resumable checkpoints
//!
//! A small bi-encoder (word embeddings, pooling, optional dense projection)
//! trained with hand-written gradients on NLI and STS pairs. Checkpoints carry
//! the model bundle plus optimizer moments, scheduler position and the
//! loss-scaler state so a later run can pick up where the last one stopped.
//!
//! # Modules
//!
//! - [`data`] - benchmark download, TSV readers, batching
//! - [`tokenizer`] - WordPiece tokenizer
//! - [`models`] - embedder modules and bundle save/load
//! - [`losses`] - softmax classification and cosine regression objectives
//! - [`optim`] - AdamW, SGD, warmup schedules, optimizer state persistence
//! - [`precision`] - reduced-precision emulation and gradient scaling
//! - [`train`] - the `fit` loop, callbacks and checkpoint management
//! - [`eval`] - similarity evaluation and regression guard
//! - [`harness`] - the save, train, reload, resume round trip

pub mod cli;
pub mod data;
pub mod error;
pub mod eval;
pub mod harness;
pub mod io;
pub mod losses;
pub mod models;
pub mod optim;
pub mod precision;
pub mod tokenizer;
pub mod train;
pub mod util;

pub use error::{Error, Result};
