//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a fixed timeout
//! - HTML parsing and link extraction
//! - The breadth-first frontier
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use coordinator::{
    Coordinator, CrawlParts, CrawlSummary, FrontierSettings, SkipReason, Step, StopReason,
};
pub use fetcher::{build_http_client, fetch_url, FailureReason, FetchOutcome, HttpFetcher, PageFetcher};
pub use frontier::Frontier;
pub use parser::{parse_links, HtmlLinkExtractor, LinkExtractor};

use crate::config::Config;
use crate::control::spawn_stdin_listener;
use crate::TidepoolError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the result store and restore the frontier
/// 2. Listen for pause/quit commands on stdin and quit on Ctrl-C
/// 3. Crawl until the frontier is exhausted or a quit is requested
/// 4. Write the final checkpoint and close the run
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file
/// * `fresh` - Ignore the checkpoint and start from the seeds
pub async fn crawl(
    config: &Config,
    config_hash: &str,
    fresh: bool,
) -> Result<CrawlSummary, TidepoolError> {
    let mut coordinator = Coordinator::new(config, config_hash, fresh)?;
    let handle = coordinator.control_handle();

    if let Err(e) = spawn_stdin_listener(handle.clone()) {
        tracing::warn!("Control input unavailable: {}", e);
    }
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.request_quit();
        }
    });

    let result = coordinator.run().await;

    interrupt.abort();

    result
}
