//! Integration tests for Tidepool

mod crawl_tests;
