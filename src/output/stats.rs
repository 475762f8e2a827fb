//! Statistics generation from the result store
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{DatasetRecord, ResultStore, RunRecord};
use crate::TidepoolError;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of recorded URLs
    pub total_records: u64,

    /// Records with an HTTP status
    pub fetched: u64,

    /// Records whose fetch failed
    pub failed: u64,

    /// Count of records per HTTP status, ascending by status
    pub status_breakdown: Vec<(u16, u64)>,

    /// Archives written so far, oldest first
    pub datasets: Vec<DatasetRecord>,

    /// Most recent crawl run
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    /// Share of records that were fetched, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            (self.fetched as f64 / self.total_records as f64) * 100.0
        }
    }

    /// Pages bundled into archives, failed fetches included
    pub fn archived_pages(&self) -> u64 {
        self.datasets.iter().map(|d| u64::from(d.page_count)).sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
pub fn load_statistics(storage: &dyn ResultStore) -> Result<CrawlStatistics, TidepoolError> {
    let total_records = storage.count_records()?;
    let failed = storage.count_failed()?;

    Ok(CrawlStatistics {
        total_records,
        fetched: total_records.saturating_sub(failed),
        failed,
        status_breakdown: storage.status_breakdown()?,
        datasets: storage.list_datasets()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Recorded URLs: {}", stats.total_records);
    println!("  Fetched: {}", stats.fetched);
    println!("  Failed: {}", stats.failed);
    println!();

    if !stats.status_breakdown.is_empty() {
        println!("Status Codes:");
        for (status, count) in &stats.status_breakdown {
            let percentage = if stats.total_records > 0 {
                (*count as f64 / stats.total_records as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", status, count, percentage);
        }
        println!();
    }

    println!("Datasets ({}):", stats.datasets.len());
    for dataset in &stats.datasets {
        println!(
            "  #{} {} ({} pages, {} files, run {})",
            dataset.dataset_index,
            dataset.archive_path,
            dataset.page_count,
            dataset.file_count,
            dataset.run_id
        );
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  ID: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} URLs fetched)",
        stats.success_rate(),
        stats.fetched,
        stats.total_records
    );
}
