//! Dataset archiving
//!
//! Fetched pages are written to a staging directory. Every time a batch is
//! full the crawl loop asks an [`Archiver`] to bundle the staged files into
//! `dataset{N}.tar.gz` and empty the staging directory.

pub mod staging;

pub use staging::{hashed_file_name, save_page, staged_files, storage_file_name};

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while producing an archive
///
/// All of them are fatal for the crawl: staged pages are kept on disk rather
/// than dropped.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to read staging directory {path}: {source}")]
    Staging { path: PathBuf, source: io::Error },

    #[error("Failed to write archive {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to clear staged file {path}: {source}")]
    Clear { path: PathBuf, source: io::Error },
}

/// Result of a successful archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    /// Path of the written archive
    pub path: PathBuf,
    /// Number of files bundled
    pub files: usize,
}

/// Bundles the staging directory into numbered archives
pub trait Archiver {
    /// Directory that fetched pages are saved into
    fn staging_dir(&self) -> &Path;

    /// Number of files currently waiting in the staging directory
    fn staged_count(&self) -> Result<usize, ArchiveError>;

    /// Returns true if an archive for dataset `index` is already on disk
    fn archive_exists(&self, index: u64) -> bool;

    /// Writes dataset `index` from the staged files, then empties the
    /// staging directory
    ///
    /// An existing archive is never replaced; writing over one is an error.
    fn archive(&self, index: u64) -> Result<ArchiveOutcome, ArchiveError>;
}

/// Writes gzip-compressed tar archives
#[derive(Debug, Clone)]
pub struct TarGzArchiver {
    staging_dir: PathBuf,
    archive_dir: PathBuf,
}

impl TarGzArchiver {
    pub fn new(staging_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            archive_dir: archive_dir.into(),
        }
    }

    /// Path of the archive for dataset `index`
    pub fn archive_path(&self, index: u64) -> PathBuf {
        self.archive_dir.join(format!("dataset{}.tar.gz", index))
    }

    fn list_staged(&self) -> Result<Vec<PathBuf>, ArchiveError> {
        staged_files(&self.staging_dir).map_err(|source| ArchiveError::Staging {
            path: self.staging_dir.clone(),
            source,
        })
    }

    /// Builds the archive in a temporary file next to its destination and
    /// moves it into place once complete, failing if `target` exists
    fn write_archive(&self, files: &[PathBuf], target: &Path) -> io::Result<()> {
        fs::create_dir_all(&self.archive_dir)?;
        let tmp = NamedTempFile::new_in(&self.archive_dir)?;

        let encoder = GzEncoder::new(tmp.as_file(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for file in files {
            let name = file.file_name().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("staged path has no file name: {}", file.display()),
                )
            })?;
            builder.append_path_with_name(file, name)?;
        }

        let encoder = builder.into_inner()?;
        encoder.finish()?;
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(target).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Archiver for TarGzArchiver {
    fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    fn staged_count(&self) -> Result<usize, ArchiveError> {
        Ok(self.list_staged()?.len())
    }

    fn archive_exists(&self, index: u64) -> bool {
        self.archive_path(index).exists()
    }

    fn archive(&self, index: u64) -> Result<ArchiveOutcome, ArchiveError> {
        let files = self.list_staged()?;
        let target = self.archive_path(index);

        self.write_archive(&files, &target)
            .map_err(|source| ArchiveError::Write {
                path: target.clone(),
                source,
            })?;

        for file in &files {
            fs::remove_file(file).map_err(|source| ArchiveError::Clear {
                path: file.clone(),
                source,
            })?;
        }

        tracing::info!(
            "Archive {} created: {} ({} files)",
            index,
            target.display(),
            files.len()
        );

        Ok(ArchiveOutcome {
            path: target,
            files: files.len(),
        })
    }
}
