//! Storage module for persisting crawl results
//!
//! This module owns the durable side of the crawler:
//! - One `CrawlRecord` per crawled URL, the permanent "already crawled" ledger
//! - Run tracking (start, finish, outcome)
//! - The list of dataset archives written so far

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ResultStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};

/// The durable result of crawling one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRecord {
    /// Normalized URL
    pub url: String,

    /// HTTP status; `None` when the fetch failed
    pub status: Option<u16>,

    /// Outbound links exactly as extracted from the page
    pub links: Vec<String>,

    /// Location of the saved page body in the staging directory
    pub saved_path: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl CrawlRecord {
    /// Builds the record for a page that was fetched
    pub fn fetched(
        url: impl Into<String>,
        status: u16,
        links: Vec<String>,
        saved_path: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            links,
            saved_path,
            timestamp: Utc::now(),
        }
    }

    /// Builds the record for a page whose fetch failed
    pub fn failed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            links: Vec::new(),
            saved_path: None,
            timestamp: Utc::now(),
        }
    }

    /// Returns true if this record marks a failed fetch
    pub fn is_failure(&self) -> bool {
        self.status.is_none()
    }
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    /// The frontier was exhausted
    Completed,
    /// The operator requested quit
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One dataset archive written by the crawler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub dataset_index: u64,
    pub archive_path: String,
    /// Pages recorded in the batch, including failed fetches
    pub page_count: u32,
    /// Files actually bundled into the archive
    pub file_count: u32,
    pub run_id: i64,
    pub created_at: String,
}
