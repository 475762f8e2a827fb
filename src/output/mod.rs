//! Output module for reporting on crawl results
//!
//! Reads the result store and prints what has been crawled so far.

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
