//! Mini-batch loader over in-memory examples

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::InputExample;

/// Batches examples, optionally reshuffling every pass.
///
/// `len()` is the number of batches in one pass (the last batch may be
/// short). [`DataLoader::next_batch`] cycles forever: when a pass is
/// exhausted it starts a new one, reshuffled if shuffling is enabled.
#[derive(Debug, Clone)]
pub struct DataLoader {
    examples: Vec<InputExample>,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
    order: Vec<usize>,
    cursor: usize,
    passes: usize,
}

impl DataLoader {
    /// Create a loader. A `batch_size` of 0 is treated as 1.
    pub fn new(examples: Vec<InputExample>, batch_size: usize, shuffle: bool) -> Self {
        Self::with_seed(examples, batch_size, shuffle, 42)
    }

    /// Create a loader with an explicit shuffle seed
    pub fn with_seed(
        examples: Vec<InputExample>,
        batch_size: usize,
        shuffle: bool,
        seed: u64,
    ) -> Self {
        let order = (0..examples.len()).collect();
        let mut loader = Self {
            examples,
            batch_size: batch_size.max(1),
            shuffle,
            rng: StdRng::seed_from_u64(seed),
            order,
            cursor: 0,
            passes: 0,
        };
        loader.start_pass();
        loader
    }

    /// Restart from a fresh, unshuffled order with a new shuffle seed
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.order = (0..self.examples.len()).collect();
        self.passes = 0;
        self.start_pass();
    }

    /// Number of batches per pass
    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len().div_ceil(self.batch_size)
    }

    /// Whether the loader holds no examples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Configured batch size
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Completed passes over the data
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Next batch, starting a new pass when the current one is exhausted.
    ///
    /// Returns an empty batch only when the loader itself is empty.
    pub fn next_batch(&mut self) -> Vec<InputExample> {
        if self.examples.is_empty() {
            return Vec::new();
        }
        if self.cursor >= self.order.len() {
            self.passes += 1;
            self.start_pass();
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.order[self.cursor..end].iter().map(|&i| self.examples[i].clone()).collect();
        self.cursor = end;
        batch
    }

    /// All batches of one fresh pass
    pub fn epoch(&mut self) -> Vec<Vec<InputExample>> {
        self.cursor = self.order.len();
        (0..self.len()).map(|_| self.next_batch()).collect()
    }

    fn start_pass(&mut self) {
        self.cursor = 0;
        if self.shuffle {
            self.order.shuffle(&mut self.rng);
        }
    }
}
