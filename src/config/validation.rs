use crate::config::types::{
    Config, CrawlerConfig, SitemapConfig, UserAgentConfig, ValidationConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_sitemap_config(&config.sitemap)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_validation_config(&config.validation)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 10_000 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 10000, got {}",
            config.batch_size
        )));
    }

    for (name, value) in [
        ("navigation_timeout_ms", config.navigation_timeout_ms),
        ("discovery_timeout_ms", config.discovery_timeout_ms),
        (
            "existence_check_timeout_ms",
            config.existence_check_timeout_ms,
        ),
    ] {
        if value < 100 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 100ms, got {}ms",
                name, value
            )));
        }
    }

    if config.max_discovery_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_discovery_pages must be >= 1, got {}",
            config.max_discovery_pages
        )));
    }

    if config.check_concurrency < 1 || config.check_concurrency > 50 {
        return Err(ConfigError::Validation(format!(
            "check_concurrency must be between 1 and 50, got {}",
            config.check_concurrency
        )));
    }

    Ok(())
}

/// Validates sitemap configuration
fn validate_sitemap_config(config: &SitemapConfig) -> Result<(), ConfigError> {
    if config.max_redirects > 20 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= 20, got {}",
            config.max_redirects
        )));
    }

    if config.child_batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "child_batch_size must be >= 1, got {}",
            config.child_batch_size
        )));
    }

    if config.fetch_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_ms must be >= 100ms, got {}ms",
            config.fetch_timeout_ms
        )));
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

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::Validation(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates the skip-list and noise patterns
fn validate_validation_config(config: &ValidationConfig) -> Result<(), ConfigError> {
    for pattern in &config.skip_hosts {
        validate_host_pattern(pattern)?;
    }

    for pattern in &config.extra_noise_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid noise pattern '{}': {}", pattern, e))
        })?;
    }

    Ok(())
}

/// Validates a host pattern (supports a leading `*.` wildcard)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Host pattern '{}' has no host after the wildcard",
            pattern
        )));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot contain consecutive dots",
            host
        )));
    }

    if !host.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' must contain at least one dot (e.g., 'example.com')",
            host
        )));
    }

    Ok(())
}
