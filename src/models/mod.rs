//! Sentence-embedding model stack

mod dense;
mod embedder;
mod parameter;
mod pooling;
mod word_embeddings;

pub use dense::{Activation, Dense, DenseTrace};
pub use embedder::{EncodeTrace, ModuleEntry, SentenceEmbedder};
pub use parameter::Parameter;
pub use pooling::{Pooling, PoolingConfig, PoolingMode, PoolingTrace};
pub use word_embeddings::{WordEmbeddings, WORD_EMBEDDINGS_TENSOR};
