//! Configuration module for Tidepool
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use tidepool::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tidepool.toml")).unwrap();
//! println!("Pages per archive: {}", config.crawler.pages_per_archive);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
