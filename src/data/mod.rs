//! Benchmark dataset acquisition, parsing and batching
//!
//! - `fetch` - idempotent HTTP download of the benchmark archives
//! - `reader` - gzip TSV parsing into typed [`InputExample`]s
//! - `loader` - shuffled mini-batching

mod example;
pub mod fetch;
mod loader;
pub mod reader;
mod split;

use std::path::{Path, PathBuf};

pub use example::{InputExample, Label};
pub use fetch::{ensure_downloaded, http_get};
pub use loader::DataLoader;
pub use reader::{read_nli, read_sts, StsSplits, TsvReader, NLI_LABELS};
pub use split::Split;

/// Semantic-textual-similarity benchmark archive
pub const DEFAULT_STS_URL: &str = "https://sbert.net/datasets/stsbenchmark.tsv.gz";

/// Natural-language-inference training archive
pub const DEFAULT_NLI_URL: &str = "https://sbert.net/datasets/AllNLI.tsv.gz";

/// Local locations of the two benchmark archives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    /// STS benchmark archive
    pub sts: PathBuf,
    /// NLI archive
    pub nli: PathBuf,
}

impl DatasetPaths {
    /// Standard file names under `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self { sts: dir.join("stsbenchmark.tsv.gz"), nli: dir.join("AllNLI.tsv.gz") }
    }

    /// Download both archives unless already present.
    ///
    /// Returns how many files were actually transferred.
    pub fn ensure(&self) -> crate::Result<usize> {
        let mut fetched = 0;
        if ensure_downloaded(DEFAULT_STS_URL, &self.sts)? {
            fetched += 1;
        }
        if ensure_downloaded(DEFAULT_NLI_URL, &self.nli)? {
            fetched += 1;
        }
        Ok(fetched)
    }
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self::in_dir("datasets")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_paths_in_dir() {
        let paths = DatasetPaths::in_dir("/data");
        assert_eq!(paths.sts, PathBuf::from("/data/stsbenchmark.tsv.gz"));
        assert_eq!(paths.nli, PathBuf::from("/data/AllNLI.tsv.gz"));
    }

    #[test]
    fn test_ensure_with_cached_files_transfers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::in_dir(dir.path());
        std::fs::write(&paths.sts, b"x").unwrap();
        std::fs::write(&paths.nli, b"y").unwrap();
        assert_eq!(paths.ensure().unwrap(), 0);
    }
}
