//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Tidepool result store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One record per crawled URL; status, saved_path are NULL for failed fetches
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    status INTEGER,
    links TEXT NOT NULL,
    saved_path TEXT,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_status ON pages(status);

-- Dataset archives written so far
CREATE TABLE IF NOT EXISTS datasets (
    dataset_index INTEGER PRIMARY KEY,
    archive_path TEXT NOT NULL,
    page_count INTEGER NOT NULL,
    file_count INTEGER NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    created_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
