//! Small shared helpers

use std::path::{Path, PathBuf};

use ndarray::ArrayView1;
use tracing::{debug, warn};

/// Cosine similarity; 0 when either vector is zero
pub fn cos_sim(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    let norms = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norms == 0.0 {
        return 0.0;
    }
    a.dot(&b) / norms
}

/// Remove every directory in `paths`, continuing past failures.
///
/// Each failure is logged and returned; nothing is raised.
pub fn remove_dirs_best_effort<P: AsRef<Path>>(paths: &[P]) -> Vec<(PathBuf, std::io::Error)> {
    let mut failures = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match std::fs::remove_dir_all(path) {
            Ok(()) => debug!(path = %path.display(), "removed"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not remove directory");
                failures.push((path.to_path_buf(), e));
            }
        }
    }
    failures
}
