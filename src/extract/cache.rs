//! Stage 3: memoize the answer/title join as a CSV file
//!
//! The cache is keyed by the existence of its path only. When the dumps change the
//! caller deletes it (see [`PostCache::invalidate`]).

use super::source::{ExtractError, PostOfInterest};
use super::tabular::{read_table, write_table};
use std::path::{Path, PathBuf};
use tracing::info;

/// Rows of interest plus where they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub rows: Vec<PostOfInterest>,
    /// True when the rows were loaded from an existing cache file
    pub cache_hit: bool,
}

/// CSV-backed cache of [`PostOfInterest`] rows
#[derive(Debug, Clone)]
pub struct PostCache {
    path: PathBuf,
}

impl PostCache {
    /// Cache stored at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a cache file is present
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load every cached row
    pub fn load(&self) -> Result<Vec<PostOfInterest>, ExtractError> {
        read_table(&self.path, &PostOfInterest::HEADERS)
    }

    /// Persist rows, replacing any existing cache
    pub fn store(&self, rows: &[PostOfInterest]) -> Result<(), ExtractError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        write_table(&self.path, &PostOfInterest::HEADERS, rows)?;
        info!("Cached {} posts of interest in {}", rows.len(), self.path.display());
        Ok(())
    }

    /// Delete the cache file. Returns whether there was one.
    pub fn invalidate(&self) -> Result<bool, ExtractError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed cache {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the cached rows, or run `build` and cache its result if no cache exists.
    ///
    /// `build` is not called at all on a cache hit. Nothing is written if it fails.
    pub fn load_or_build<F>(&self, build: F) -> Result<Materialized, ExtractError>
    where
        F: FnOnce() -> Result<Vec<PostOfInterest>, ExtractError>,
    {
        if self.exists() {
            let rows = self.load()?;
            info!(
                "Loaded {} posts of interest from cache {}",
                rows.len(),
                self.path.display()
            );
            return Ok(Materialized {
                rows,
                cache_hit: true,
            });
        }

        let rows = build()?;
        self.store(&rows)?;
        Ok(Materialized {
            rows,
            cache_hit: false,
        })
    }
}
