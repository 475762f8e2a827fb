//! Queue checkpointing
//!
//! The pending queue is written to disk as a JSON array of normalized URLs so
//! a stopped or crashed crawl can pick up where it left off. The checkpoint is
//! advisory: the result store decides what has been crawled, so a stale or
//! missing checkpoint only costs some re-filtering.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while writing a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to write checkpoint {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The on-disk checkpoint of the pending queue
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the pending sequence
    ///
    /// A missing file is an empty queue. A file that cannot be read or parsed
    /// is logged and also treated as empty, so the crawl falls back to its
    /// seeds instead of failing.
    pub fn load(&self) -> Vec<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No checkpoint at {}", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read checkpoint {}: {}; starting from seeds",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(pending) => {
                tracing::info!(
                    "Loaded {} pending URLs from checkpoint {}",
                    pending.len(),
                    self.path.display()
                );
                pending
            }
            Err(e) => {
                tracing::warn!(
                    "Checkpoint {} is corrupt ({}); starting from seeds",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Overwrites the checkpoint with `pending`
    ///
    /// The new content goes to a temporary file in the same directory which is
    /// then renamed over the old one, so a crash mid-write leaves the previous
    /// checkpoint intact.
    pub fn save<'a, I>(&self, pending: I) -> Result<(), CheckpointError>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let pending: Vec<&String> = pending.into_iter().collect();
        let json = serde_json::to_string_pretty(&pending)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        self.write_atomically(&dir, json.as_bytes())
            .map_err(|source| CheckpointError::Write {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(
            "Checkpoint saved: {} pending URLs -> {}",
            pending.len(),
            self.path.display()
        );
        Ok(())
    }

    fn write_atomically(&self, dir: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
