//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns every piece of crawl state: the frontier, the result
//! store, the archiver, the checkpoint file and the receiving side of the
//! controls. One call to [`Coordinator::crawl_next`] takes one URL through
//! fetch, record, enqueue, archive and checkpoint; [`Coordinator::run`] repeats
//! it until the frontier is exhausted or a quit is requested.
//!
//! Ordering within one page matters for restarts: the record is written
//! before the URL joins the visited set, and both happen before any
//! checkpoint that could leave the URL out. A crash therefore loses at most
//! pending entries, which the next run rediscovers or finds already recorded.

use crate::archive::{save_page, Archiver, TarGzArchiver};
use crate::checkpoint::CheckpointFile;
use crate::config::{Config, CrawlerConfig};
use crate::control::{CrawlControl, Gate};
use crate::crawler::fetcher::{FetchOutcome, HttpFetcher, PageFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::storage::{CrawlRecord, DatasetRecord, ResultStore, RunStatus, SqliteStorage};
use crate::{ControlHandle, TidepoolError};
use chrono::Utc;
use std::time::Instant;

/// Batch and checkpoint cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierSettings {
    /// Recorded pages per dataset archive
    pub pages_per_archive: u32,
    /// Processed pages between periodic checkpoints
    pub checkpoint_interval: u32,
}

impl From<&CrawlerConfig> for FrontierSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            pages_per_archive: config.pages_per_archive.max(1),
            checkpoint_interval: config.checkpoint_interval.max(1),
        }
    }
}

/// Why a dequeued URL was not fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already handled earlier in this process
    AlreadyVisited,
    /// The result store has a record from an earlier run
    AlreadyRecorded,
}

/// The result of one crawl iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Quit was requested; nothing was dequeued
    Quit,
    /// The pending queue is empty
    Exhausted,
    Skipped { url: String, reason: SkipReason },
    /// A record was written for `url`
    Crawled {
        url: String,
        /// `None` when the fetch failed
        status: Option<u16>,
        /// Links newly appended to the pending queue
        enqueued: usize,
    },
}

/// Why a crawl run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    Quit,
}

/// Counters for one call to [`Coordinator::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Pages recorded, including failed fetches
    pub pages_crawled: u64,
    pub pages_failed: u64,
    pub pages_skipped: u64,
    pub archives_written: u64,
    pub pending_remaining: usize,
    pub stop_reason: StopReason,
}

/// The collaborators a coordinator is assembled from
pub struct CrawlParts<F, E, A, S = SqliteStorage> {
    pub storage: S,
    pub fetcher: F,
    pub extractor: E,
    pub archiver: A,
    pub checkpoint: CheckpointFile,
    pub control: CrawlControl,
}

/// Pages recorded since the last archive and the index of the next one
#[derive(Debug, Clone, Copy)]
struct DatasetBatch {
    pages: u32,
    next_index: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    processed: u64,
    failed: u64,
    skipped: u64,
    archives: u64,
}

/// Main crawler coordinator structure
pub struct Coordinator<F = HttpFetcher, E = HtmlLinkExtractor, A = TarGzArchiver, S = SqliteStorage> {
    settings: FrontierSettings,
    storage: S,
    fetcher: F,
    extractor: E,
    archiver: A,
    checkpoint: CheckpointFile,
    control: CrawlControl,
    frontier: Frontier,
    run_id: i64,
    batch: DatasetBatch,
    counters: Counters,
}

impl Coordinator {
    /// Creates a coordinator wired to HTTP, HTML and tar.gz implementations
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded on the run
    /// * `fresh` - Ignore the checkpoint and start from the seeds
    pub fn new(config: &Config, config_hash: &str, fresh: bool) -> Result<Self, TidepoolError> {
        let storage = SqliteStorage::new(&config.output.database_path())?;
        let fetcher = HttpFetcher::new(config.crawler.fetch_timeout())?;

        let parts = CrawlParts {
            storage,
            fetcher,
            extractor: HtmlLinkExtractor,
            archiver: TarGzArchiver::new(config.output.staging_dir(), config.output.archive_dir()),
            checkpoint: CheckpointFile::new(config.output.checkpoint_path()),
            control: CrawlControl::new(config.crawler.pause_poll()),
        };

        Self::assemble(
            FrontierSettings::from(&config.crawler),
            parts,
            &config.crawler.seeds,
            config_hash,
            fresh,
        )
    }
}

impl<F, E, A, S> Coordinator<F, E, A, S>
where
    F: PageFetcher,
    E: LinkExtractor,
    A: Archiver,
    S: ResultStore,
{
    /// Builds a coordinator from its parts and restores the frontier
    ///
    /// Unless `fresh` is set the checkpoint is loaded and every entry the
    /// store has already recorded is dropped. If nothing is left the seeds
    /// are enqueued, subject to the same filter. Pages left in the staging
    /// directory by an earlier run count toward the first batch.
    pub fn assemble(
        settings: FrontierSettings,
        parts: CrawlParts<F, E, A, S>,
        seeds: &[String],
        config_hash: &str,
        fresh: bool,
    ) -> Result<Self, TidepoolError> {
        let CrawlParts {
            mut storage,
            fetcher,
            extractor,
            archiver,
            checkpoint,
            control,
        } = parts;

        let mut frontier = Frontier::new();

        if fresh {
            tracing::info!("Fresh start requested; ignoring checkpoint");
        } else {
            let saved = checkpoint.load();
            let restored = frontier.enqueue_new(saved.iter().map(String::as_str), |url| {
                storage.contains(url)
            })?;
            if restored < saved.len() {
                tracing::info!(
                    "Dropped {} checkpoint entries that are already recorded or invalid",
                    saved.len() - restored
                );
            }
        }

        if frontier.is_empty() {
            let seeded = frontier.enqueue_new(seeds.iter().map(String::as_str), |url| {
                storage.contains(url)
            })?;
            tracing::info!("Seeding frontier with {} of {} seed URLs", seeded, seeds.len());
        }

        let staged = archiver.staged_count()?;
        if staged > 0 {
            tracing::info!("{} pages already staged from an earlier run", staged);
        }
        // Leftovers join the first batch but never trigger an archive on their own
        let staged = u32::try_from(staged).unwrap_or(u32::MAX);

        let mut next_index = storage.next_dataset_index()?;
        while archiver.archive_exists(next_index) {
            tracing::warn!(
                "Dataset {} already exists on disk but not in the store; skipping its index",
                next_index
            );
            next_index += 1;
        }

        let batch = DatasetBatch {
            pages: staged.min(settings.pages_per_archive.saturating_sub(1)),
            next_index,
        };

        let run_id = storage.create_run(config_hash)?;

        Ok(Self {
            settings,
            storage,
            fetcher,
            extractor,
            archiver,
            checkpoint,
            control,
            frontier,
            run_id,
            batch,
            counters: Counters::default(),
        })
    }

    /// Returns a handle that can pause, resume or stop this crawl
    pub fn control_handle(&self) -> ControlHandle {
        self.control.handle()
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Index the next archive will be written under
    pub fn next_dataset_index(&self) -> u64 {
        self.batch.next_index
    }

    /// Pages recorded since the last archive
    pub fn batch_pages(&self) -> u32 {
        self.batch.pages
    }

    /// Runs the main crawl loop
    ///
    /// Stops when the frontier is exhausted or a quit is requested, writes a
    /// final checkpoint and closes the run. If an iteration fails the run is
    /// marked failed, a checkpoint is attempted and the error is returned.
    pub async fn run(&mut self) -> Result<CrawlSummary, TidepoolError> {
        tracing::info!(
            "Starting crawl run {} with {} pending URLs",
            self.run_id,
            self.frontier.pending_len()
        );

        let start_time = Instant::now();

        let stop_reason = loop {
            let step = match self.crawl_next().await {
                Ok(step) => step,
                Err(e) => {
                    self.abort(&e);
                    return Err(e);
                }
            };

            match step {
                Step::Quit => {
                    tracing::info!("Stopping crawl on operator request");
                    break StopReason::Quit;
                }
                Step::Exhausted => {
                    tracing::info!("Frontier is empty, crawl complete");
                    break StopReason::Exhausted;
                }
                Step::Skipped { url, reason } => {
                    tracing::debug!("Skipped {} ({:?})", url, reason);
                }
                Step::Crawled { .. } => {
                    let processed = self.counters.processed;
                    if processed % u64::from(self.settings.checkpoint_interval) == 0 {
                        let rate = processed as f64 / start_time.elapsed().as_secs_f64();
                        tracing::info!(
                            "Progress: {} pages crawled, {} in frontier, {:.2} pages/sec",
                            processed,
                            self.frontier.pending_len(),
                            rate
                        );
                    }
                }
            }
        };

        if let Err(e) = self.save_checkpoint() {
            self.finish_run(RunStatus::Failed);
            return Err(e);
        }

        let status = match stop_reason {
            StopReason::Exhausted => RunStatus::Completed,
            StopReason::Quit => RunStatus::Interrupted,
        };
        self.storage.finish_run(self.run_id, status)?;

        let summary = self.summary(stop_reason);
        tracing::info!(
            "Crawl run {} finished ({:?}): {} pages crawled ({} failed), {} archives, {} pending, in {:?}",
            self.run_id,
            summary.stop_reason,
            summary.pages_crawled,
            summary.pages_failed,
            summary.archives_written,
            summary.pending_remaining,
            start_time.elapsed()
        );

        Ok(summary)
    }

    /// Performs one iteration of the crawl loop
    pub async fn crawl_next(&mut self) -> Result<Step, TidepoolError> {
        if self.control.quit_requested() {
            return Ok(Step::Quit);
        }
        if self.control.wait_until_runnable().await == Gate::Quit {
            return Ok(Step::Quit);
        }

        let Some(url) = self.frontier.pop() else {
            return Ok(Step::Exhausted);
        };

        if self.frontier.is_visited(&url) {
            self.counters.skipped += 1;
            return Ok(Step::Skipped {
                url,
                reason: SkipReason::AlreadyVisited,
            });
        }

        let recorded = match self.storage.contains(&url) {
            Ok(recorded) => recorded,
            Err(e) => {
                self.frontier.push_front(url);
                return Err(e.into());
            }
        };
        if recorded {
            self.frontier.mark_visited(url.clone());
            self.counters.skipped += 1;
            return Ok(Step::Skipped {
                url,
                reason: SkipReason::AlreadyRecorded,
            });
        }

        tracing::debug!("Processing URL: {}", url);
        let record = self.fetch_record(&url).await;
        let status = record.status;

        // Until the record is durable the URL must stay in the queue, or an
        // abort checkpoint would drop it
        if let Err(e) = self.storage.insert_record(&record) {
            self.frontier.push_front(url);
            return Err(e.into());
        }
        self.frontier.mark_visited(url.clone());
        if record.is_failure() {
            self.counters.failed += 1;
        }

        let storage = &self.storage;
        let enqueued = self
            .frontier
            .enqueue_new(record.links.iter().map(String::as_str), |candidate| {
                storage.contains(candidate)
            })?;

        self.batch.pages += 1;
        if self.batch.pages >= self.settings.pages_per_archive {
            self.archive_batch()?;
        }

        self.counters.processed += 1;
        if self.counters.processed % u64::from(self.settings.checkpoint_interval) == 0 {
            if let Err(e) = self.save_checkpoint() {
                tracing::warn!("Periodic checkpoint failed: {}", e);
            }
        }

        Ok(Step::Crawled {
            url,
            status,
            enqueued,
        })
    }

    /// Fetches `url` and turns the outcome into its record
    async fn fetch_record(&self, url: &str) -> CrawlRecord {
        match self.fetcher.fetch(url).await {
            FetchOutcome::Fetched {
                status_code,
                final_url,
                body,
            } => {
                let links = self.extractor.extract_links(&body, &final_url);

                let saved_path = match save_page(self.archiver.staging_dir(), url, &body) {
                    Ok(path) => Some(path.to_string_lossy().into_owned()),
                    Err(e) => {
                        tracing::warn!("Failed to save page {}: {}", url, e);
                        None
                    }
                };

                tracing::info!("Crawled: {} ({}, {} links)", url, status_code, links.len());
                CrawlRecord::fetched(url, status_code, links, saved_path)
            }
            FetchOutcome::Failed { reason, error } => {
                tracing::warn!("Failed to crawl {} ({}): {}", url, reason, error);
                CrawlRecord::failed(url)
            }
        }
    }

    /// Bundles the staged pages into the next dataset and starts a new batch
    fn archive_batch(&mut self) -> Result<(), TidepoolError> {
        let index = self.batch.next_index;
        let outcome = self.archiver.archive(index)?;

        self.storage.record_dataset(&DatasetRecord {
            dataset_index: index,
            archive_path: outcome.path.to_string_lossy().into_owned(),
            page_count: self.batch.pages,
            file_count: u32::try_from(outcome.files).unwrap_or(u32::MAX),
            run_id: self.run_id,
            created_at: Utc::now().to_rfc3339(),
        })?;

        self.batch.next_index += 1;
        self.batch.pages = 0;
        self.counters.archives += 1;
        Ok(())
    }

    /// Writes the pending queue to the checkpoint file
    pub fn save_checkpoint(&self) -> Result<(), TidepoolError> {
        self.checkpoint.save(self.frontier.pending())?;
        Ok(())
    }

    /// Best-effort cleanup after a fatal iteration error
    fn abort(&mut self, error: &TidepoolError) {
        tracing::error!("Crawl run {} failed: {}", self.run_id, error);

        if let Err(e) = self.save_checkpoint() {
            tracing::warn!("Failed to save checkpoint after error: {}", e);
        }
        self.finish_run(RunStatus::Failed);
    }

    fn finish_run(&mut self, status: RunStatus) {
        if let Err(e) = self.storage.finish_run(self.run_id, status) {
            tracing::warn!("Failed to mark run {} as {:?}: {}", self.run_id, status, e);
        }
    }

    fn summary(&self, stop_reason: StopReason) -> CrawlSummary {
        CrawlSummary {
            pages_crawled: self.counters.processed,
            pages_failed: self.counters.failed,
            pages_skipped: self.counters.skipped,
            archives_written: self.counters.archives,
            pending_remaining: self.frontier.pending_len(),
            stop_reason,
        }
    }
}
