use crate::config::types::{Config, CrawlerConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    if config.pages_per_archive < 1 {
        return Err(ConfigError::Validation(format!(
            "pages_per_archive must be >= 1, got {}",
            config.pages_per_archive
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if config.fetch_timeout_secs < 1 || config.fetch_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be between 1 and 300, got {}",
            config.fetch_timeout_secs
        )));
    }

    if config.pause_poll_ms < 10 || config.pause_poll_ms > 10_000 {
        return Err(ConfigError::Validation(format!(
            "pause_poll_ms must be between 10 and 10000, got {}",
            config.pause_poll_ms
        )));
    }

    Ok(())
}

/// Validates a single seed URL
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("database_path", &config.database_path),
        ("checkpoint_path", &config.checkpoint_path),
        ("staging_dir", &config.staging_dir),
        ("archive_dir", &config.archive_dir),
    ];

    for (name, value) in paths {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.staging_dir == config.archive_dir {
        return Err(ConfigError::Validation(
            "staging_dir and archive_dir must be different directories".to_string(),
        ));
    }

    Ok(())
}
