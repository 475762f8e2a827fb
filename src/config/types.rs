use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Tidepool
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URLs the crawl starts from when no checkpoint is available
    pub seeds: Vec<String>,

    /// Number of recorded pages bundled into each dataset archive
    #[serde(rename = "pages-per-archive", default = "default_pages_per_archive")]
    pub pages_per_archive: u32,

    /// Number of processed pages between queue checkpoints
    #[serde(
        rename = "checkpoint-interval",
        default = "default_checkpoint_interval"
    )]
    pub checkpoint_interval: u32,

    /// Per-request timeout; slower fetches are recorded as failures
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Upper bound on how long a paused crawl sleeps before re-checking
    /// the control flags
    #[serde(rename = "pause-poll-ms", default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite result store
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Path to the pending-queue checkpoint file
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: String,

    /// Directory where fetched pages wait for the next archive
    #[serde(rename = "staging-dir", default = "default_staging_dir")]
    pub staging_dir: String,

    /// Directory receiving `dataset{N}.tar.gz` files
    #[serde(rename = "archive-dir", default = "default_archive_dir")]
    pub archive_dir: String,
}

impl OutputConfig {
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        PathBuf::from(&self.checkpoint_path)
    }

    pub fn staging_dir(&self) -> PathBuf {
        PathBuf::from(&self.staging_dir)
    }

    pub fn archive_dir(&self) -> PathBuf {
        PathBuf::from(&self.archive_dir)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            checkpoint_path: default_checkpoint_path(),
            staging_dir: default_staging_dir(),
            archive_dir: default_archive_dir(),
        }
    }
}

fn default_pages_per_archive() -> u32 {
    2500
}

fn default_checkpoint_interval() -> u32 {
    100
}

fn default_fetch_timeout_secs() -> u64 {
    5
}

fn default_pause_poll_ms() -> u64 {
    250
}

fn default_database_path() -> String {
    "crawler-db.sqlite".to_string()
}

fn default_checkpoint_path() -> String {
    "crawl-queue.json".to_string()
}

fn default_staging_dir() -> String {
    "temp-data".to_string()
}

fn default_archive_dir() -> String {
    "data".to_string()
}
