//! Disk cache: one file per article, named by its [`CacheKey`].
//!
//! The cache stores the *pristine* fetch result. Transformations run on every
//! serve, so changing the transformer never requires invalidating the cache.
//! Entries are never expired or deleted here; an operator clears the
//! directory by hand.
//!
//! There is no locking. Every write goes to its own hidden temp file and is
//! renamed into place, so a reader sees either the old entry or a complete
//! new one, and the last writer wins.

use crate::error::{CacheError, RelayError};
use crate::pipeline::sanitize::CacheKey;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Result of a cache lookup that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Raw bytes of the previously fetched page.
    Hit(Vec<u8>),
    /// No entry for this key.
    Miss,
}

/// Flat keyed file store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path of the entry for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    /// Create the cache directory (and parents) if needed.
    pub async fn ensure_dir(&self) -> Result<(), RelayError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| RelayError::CacheDirUnavailable {
                path: self.dir.clone(),
                source: e,
            })
    }

    /// Read the entry for `key`.
    ///
    /// A missing file is [`CacheLookup::Miss`]. Every other failure is
    /// returned as [`CacheError::Read`] so the caller can tell a cold cache
    /// from a broken one.
    pub async fn lookup(&self, key: &CacheKey) -> Result<CacheLookup, CacheError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("Cache entry {} ({} bytes)", path.display(), bytes.len());
                Ok(CacheLookup::Hit(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(CacheLookup::Miss),
            Err(e) => Err(CacheError::Read { path, source: e }),
        }
    }

    /// Persist `bytes` as the entry for `key`.
    ///
    /// Each call writes its own uniquely named hidden temp file in the cache
    /// directory and renames it over the entry, so concurrent stores of one
    /// key never share a temp file. Keys never start with `.`, so temp names
    /// cannot collide with an entry.
    pub async fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let dir = self.dir.clone();
        let bytes = bytes.to_vec();
        let len = bytes.len();

        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_data()?;
            // On failure the temp file is removed when the error is dropped.
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .unwrap_or_else(|e| Err(std::io::Error::other(e)));

        written.map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;

        debug!("Stored {} bytes at {}", len, path.display());
        Ok(())
    }
}
