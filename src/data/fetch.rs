//! Remote dataset and weight acquisition
//!
//! Downloads are blocking and are not retried: a failed fetch aborts whatever
//! setup depended on it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{Error, Result};

/// User agent sent with every download
const USER_AGENT: &str = concat!("sentence-tune/", env!("CARGO_PKG_VERSION"));

/// Download `url` to `path`, creating parent directories.
///
/// The body is streamed into `<path>.part` and renamed into place once
/// complete, so an interrupted transfer never leaves a truncated file at
/// `path`. Returns the number of bytes written.
pub fn http_get(url: &str, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;
        }
    }

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(None)
        .build()
        .map_err(|e| Error::Http { message: format!("Failed to create HTTP client: {e}") })?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| Error::Http { message: format!("GET {url} failed: {e}") })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Http { message: format!("GET {url} returned {status}") });
    }

    let partial = partial_path(path);
    let mut file = File::create(&partial)
        .map_err(|e| Error::io(format!("creating {}", partial.display()), e))?;
    let bytes = response
        .copy_to(&mut file)
        .map_err(|e| Error::Http { message: format!("reading body of {url}: {e}") })?;
    drop(file);

    fs::rename(&partial, path)
        .map_err(|e| Error::io(format!("moving download to {}", path.display()), e))?;

    info!(url, path = %path.display(), bytes, "downloaded");
    Ok(bytes)
}

/// Download `url` to `path` unless `path` already exists.
///
/// Returns `true` when a transfer happened. An existing file is trusted as-is
/// and no network I/O is performed.
pub fn ensure_downloaded(url: &str, path: &Path) -> Result<bool> {
    if path.exists() {
        debug!(path = %path.display(), "already present, skipping download");
        return Ok(false);
    }
    http_get(url, path)?;
    Ok(true)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
