//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end with the real fetcher, extractor and archiver.

use flate2::read::GzDecoder;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tidepool::checkpoint::CheckpointFile;
use tidepool::config::{Config, CrawlerConfig, OutputConfig};
use tidepool::crawler::{Coordinator, FailureReason, FetchOutcome, HttpFetcher, PageFetcher, StopReason};
use tidepool::storage::{ResultStore, RunStatus, SqliteStorage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted in `dir`
fn create_test_config(dir: &TempDir, seeds: Vec<String>, pages_per_archive: u32) -> Config {
    let in_dir = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

    Config {
        crawler: CrawlerConfig {
            seeds,
            pages_per_archive,
            checkpoint_interval: 1,
            fetch_timeout_secs: 1,
            pause_poll_ms: 20,
        },
        output: OutputConfig {
            database_path: in_dir("crawler-db.sqlite"),
            checkpoint_path: in_dir("crawl-queue.json"),
            staging_dir: in_dir("temp-data"),
            archive_dir: in_dir("data"),
        },
    }
}

fn html_page(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

/// Lists the entry names of a dataset archive
fn archive_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("Failed to open archive");
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut names: Vec<String> = archive
        .entries()
        .expect("Failed to read archive")
        .map(|entry| {
            entry
                .expect("Bad archive entry")
                .path()
                .expect("Bad entry path")
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Mounts a small site: `/` links to `/page1`, `/page2?ref=home` and
/// `/missing`; `/page1` links back home and to `/page2#top`
async fn mount_site(server: &MockServer, expected_hits: u64) {
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(format!(
            r#"<a href="{0}/page1">Page 1</a>
               <a href="/page2?ref=home">Page 2</a>
               <a href="missing">Missing</a>"#,
            base_url
        )))
        .expect(expected_hits)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html_page(
            r##"<a href="/">Home</a><a href="/page2#top">Page 2</a>"##.to_string(),
        ))
        .expect(expected_hits)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html_page("Content 2".to_string()))
        .expect(expected_hits)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(expected_hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_writes_records_and_archives() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 1).await;
    let base_url = mock_server.uri();

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir, vec![format!("{}/", base_url)], 2);

    let mut coordinator =
        Coordinator::new(&config, "test-hash", false).expect("Failed to create coordinator");
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(summary.pages_crawled, 4);
    assert_eq!(summary.pages_failed, 0);
    // /page2 was queued twice, once from each page linking to it
    assert_eq!(summary.pages_skipped, 1);
    assert_eq!(summary.archives_written, 2);
    assert_eq!(summary.pending_remaining, 0);

    let storage = SqliteStorage::new(&config.output.database_path()).unwrap();
    assert_eq!(storage.count_records().unwrap(), 4);

    let home = storage
        .get_record(&format!("{}/", base_url))
        .unwrap()
        .expect("home page recorded");
    assert_eq!(home.status, Some(200));
    assert_eq!(
        home.links,
        vec![
            format!("{}/page1", base_url),
            format!("{}/page2?ref=home", base_url),
            format!("{}/missing", base_url),
        ]
    );

    let missing = storage
        .get_record(&format!("{}/missing", base_url))
        .unwrap()
        .expect("404 page recorded");
    assert_eq!(missing.status, Some(404));

    let prefix = format!("127_0_0_1_{}", mock_server.address().port());
    assert_eq!(
        archive_entries(&dir.path().join("data/dataset1.tar.gz")),
        vec![format!("{}_.html", prefix), format!("{}_page1.html", prefix)]
    );
    assert_eq!(
        archive_entries(&dir.path().join("data/dataset2.tar.gz")),
        vec![format!("{}_missing.html", prefix), format!("{}_page2.html", prefix)]
    );
    assert_eq!(std::fs::read_dir(dir.path().join("temp-data")).unwrap().count(), 0);

    let datasets = storage.list_datasets().unwrap();
    assert_eq!(datasets.len(), 2);
    assert!(datasets.iter().all(|d| d.page_count == 2));

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");

    assert!(CheckpointFile::new(config.output.checkpoint_path())
        .load()
        .is_empty());
}

#[tokio::test]
async fn test_second_run_fetches_nothing_already_recorded() {
    let mock_server = MockServer::start().await;
    // Every page must be fetched exactly once across both runs
    mount_site(&mock_server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir, vec![format!("{}/", mock_server.uri())], 100);

    let first = Coordinator::new(&config, "test-hash", false)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.pages_crawled, 4);

    let second = Coordinator::new(&config, "test-hash", true)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.stop_reason, StopReason::Exhausted);
    assert_eq!(second.pages_crawled, 0);
}

#[tokio::test]
async fn test_quit_then_resume_from_checkpoint() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 1).await;
    let base_url = mock_server.uri();

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir, vec![format!("{}/", base_url)], 100);

    {
        let mut coordinator = Coordinator::new(&config, "test-hash", false).unwrap();
        coordinator.crawl_next().await.unwrap();
        coordinator.control_handle().request_quit();

        let summary = coordinator.run().await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::Quit);
        assert_eq!(summary.pages_crawled, 1);
        assert_eq!(summary.pending_remaining, 3);
    }

    let saved = CheckpointFile::new(config.output.checkpoint_path()).load();
    assert_eq!(
        saved,
        vec![
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
            format!("{}/missing", base_url),
        ]
    );

    let mut resumed = Coordinator::new(&config, "test-hash", false).unwrap();
    let summary = resumed.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(summary.pages_crawled, 3);

    let storage = SqliteStorage::new(&config.output.database_path()).unwrap();
    assert_eq!(storage.count_records().unwrap(), 4);
}

#[tokio::test]
async fn test_slow_page_is_recorded_as_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(r#"<a href="/slow">Slow</a>"#.to_string()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir, vec![format!("{}/", base_url)], 100);

    let summary = Coordinator::new(&config, "test-hash", false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(summary.pages_failed, 1);

    let storage = SqliteStorage::new(&config.output.database_path()).unwrap();
    let slow = storage
        .get_record(&format!("{}/slow", base_url))
        .unwrap()
        .expect("slow page recorded");
    assert_eq!(slow.status, None);
    assert!(slow.links.is_empty());
    assert_eq!(slow.saved_path, None);
    assert_eq!(storage.count_failed().unwrap(), 1);
}

#[tokio::test]
async fn test_http_fetcher_classifies_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_millis(200)).unwrap();
    let outcome = fetcher.fetch(&format!("{}/slow", mock_server.uri())).await;

    assert!(matches!(
        outcome,
        FetchOutcome::Failed {
            reason: FailureReason::Timeout,
            ..
        }
    ));
}

#[tokio::test]
async fn test_http_fetcher_keeps_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410).set_body_string("gone"))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let outcome = fetcher.fetch(&format!("{}/gone", mock_server.uri())).await;

    match outcome {
        FetchOutcome::Fetched {
            status_code, body, ..
        } => {
            assert_eq!(status_code, 410);
            assert_eq!(body, "gone");
        }
        other => panic!("Expected a fetched page, got {:?}", other),
    }
}
