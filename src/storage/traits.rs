//! Storage traits and error types
//!
//! This module defines the trait interface for result store backends and
//! associated error types.

use crate::storage::{CrawlRecord, DatasetRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for result store implementations
///
/// The store is the authority on what has been crawled: a URL with a record
/// is never fetched again, across restarts.
pub trait ResultStore {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Crawl Records =====

    /// Checks whether a record exists for the exact normalized URL
    fn contains(&self, url: &str) -> StorageResult<bool>;

    /// Writes a crawl record
    ///
    /// Records are created once and never replaced. Returns false if a record
    /// for the URL already existed, in which case the store is unchanged.
    fn insert_record(&mut self, record: &CrawlRecord) -> StorageResult<bool>;

    /// Gets the record for a URL
    fn get_record(&self, url: &str) -> StorageResult<Option<CrawlRecord>>;

    /// Counts all records
    fn count_records(&self) -> StorageResult<u64>;

    /// Counts records of failed fetches
    fn count_failed(&self) -> StorageResult<u64>;

    /// Gets (status code, count) pairs for fetched pages, ordered by status
    fn status_breakdown(&self) -> StorageResult<Vec<(u16, u64)>>;

    // ===== Datasets =====

    /// Records a dataset archive that was written
    fn record_dataset(&mut self, dataset: &DatasetRecord) -> StorageResult<()>;

    /// Returns the index the next archive must use
    ///
    /// Indices start at 1 and are never reused.
    fn next_dataset_index(&self) -> StorageResult<u64>;

    /// Lists every dataset archive written, oldest first
    fn list_datasets(&self) -> StorageResult<Vec<DatasetRecord>>;
}
