//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ResultStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResultStore, StorageError, StorageResult};
use crate::storage::{CrawlRecord, DatasetRecord, RunRecord, RunStatus};
use crate::TidepoolError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

/// A `pages` row before its JSON and timestamp columns are decoded
struct PageRow {
    url: String,
    status: Option<u16>,
    links: String,
    saved_path: Option<String>,
    timestamp: String,
}

impl PageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            status: row.get(1)?,
            links: row.get(2)?,
            saved_path: row.get(3)?,
            timestamp: row.get(4)?,
        })
    }

    fn into_record(self) -> StorageResult<CrawlRecord> {
        let links: Vec<String> = serde_json::from_str(&self.links)?;
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|source| StorageError::Timestamp {
                value: self.timestamp.clone(),
                source,
            })?
            .with_timezone(&Utc);

        Ok(CrawlRecord {
            url: self.url,
            status: self.status,
            links,
            saved_path: self.saved_path,
            timestamp,
        })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
    })
}

impl SqliteStorage {
    /// Opens or creates the result store at `path`
    ///
    /// Missing parent directories are created.
    pub fn new(path: &Path) -> Result<Self, TidepoolError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, TidepoolError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl ResultStore for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }

        Ok(())
    }

    // ===== Crawl Records =====

    fn contains(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM pages WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_record(&mut self, record: &CrawlRecord) -> StorageResult<bool> {
        let links = serde_json::to_string(&record.links)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO pages (url, status, links, saved_path, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.url,
                record.status,
                links,
                record.saved_path,
                record.timestamp.to_rfc3339()
            ],
        )?;
        Ok(inserted == 1)
    }

    fn get_record(&self, url: &str) -> StorageResult<Option<CrawlRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, status, links, saved_path, timestamp FROM pages WHERE url = ?1",
                params![url],
                PageRow::from_row,
            )
            .optional()?;

        row.map(PageRow::into_record).transpose()
    }

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_failed(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE status IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn status_breakdown(&self) -> StorageResult<Vec<(u16, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM pages WHERE status IS NOT NULL
             GROUP BY status ORDER BY status",
        )?;

        let breakdown = stmt
            .query_map([], |row| {
                Ok((row.get::<_, u16>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(breakdown)
    }

    // ===== Datasets =====

    fn record_dataset(&mut self, dataset: &DatasetRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO datasets (dataset_index, archive_path, page_count, file_count, run_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                dataset.dataset_index as i64,
                dataset.archive_path,
                dataset.page_count,
                dataset.file_count,
                dataset.run_id,
                dataset.created_at
            ],
        )?;
        Ok(())
    }

    fn next_dataset_index(&self) -> StorageResult<u64> {
        let max: Option<i64> =
            self.conn
                .query_row("SELECT MAX(dataset_index) FROM datasets", [], |row| {
                    row.get(0)
                })?;
        Ok(max.map(|m| m as u64 + 1).unwrap_or(1))
    }

    fn list_datasets(&self) -> StorageResult<Vec<DatasetRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT dataset_index, archive_path, page_count, file_count, run_id, created_at
             FROM datasets ORDER BY dataset_index ASC",
        )?;

        let datasets = stmt
            .query_map([], |row| {
                Ok(DatasetRecord {
                    dataset_index: row.get::<_, i64>(0)? as u64,
                    archive_path: row.get(1)?,
                    page_count: row.get(2)?,
                    file_count: row.get(3)?,
                    run_id: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(datasets)
    }
}
