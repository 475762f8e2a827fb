//! Tidepool: a breadth-first dataset crawler
//!
//! This crate crawls outward from a set of seed URLs, records one result per
//! page in a SQLite store, and bundles fetched pages into numbered
//! `dataset{N}.tar.gz` archives. The pending queue is checkpointed to disk so an
//! interrupted crawl resumes where it stopped, and an operator can pause,
//! resume or stop a running crawl from the terminal.

pub mod archive;
pub mod checkpoint;
pub mod config;
pub mod control;
pub mod crawler;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Tidepool operations
#[derive(Debug, Error)]
pub enum TidepoolError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Archive error: {0}")]
    Archive(#[from] archive::ArchiveError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Tidepool operations
pub type Result<T> = std::result::Result<T, TidepoolError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use control::{ControlCommand, ControlHandle, ControlState, CrawlControl};
pub use crawler::{Coordinator, CrawlSummary, StopReason};
pub use url::normalize_url;
