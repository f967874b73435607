use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    // Listing pages are joined onto the base, so it has to name a directory
    if !url.path().ends_with('/') {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must end with '/'",
            config.base_url
        )));
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    for (name, value) in [
        ("fetch_timeout_secs", config.fetch_timeout_secs),
        ("listing_timeout_secs", config.listing_timeout_secs),
        ("queue_wait_ms", config.queue_wait_ms),
        ("collect_timeout_secs", config.collect_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_interval must be >= 1".to_string(),
        ));
    }

    if config.result_buffer < 1 {
        return Err(ConfigError::Validation(
            "result_buffer must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.is_empty()
        || config
            .file_prefix
            .contains(|c: char| c == '/' || c == '\\')
    {
        return Err(ConfigError::Validation(format!(
            "file_prefix must be a non-empty file name, got '{}'",
            config.file_prefix
        )));
    }

    Ok(())
}
