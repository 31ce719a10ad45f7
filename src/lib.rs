//! Site-Auditor: a website health auditor
//!
//! This crate discovers the pages of a site (from its sitemap or by walking
//! links page by page), then crawls a chosen subset of them, reporting broken
//! links, broken images, script errors and pages that failed to load as a
//! stream of structured events.

pub mod classifier;
pub mod config;
pub mod crawler;
pub mod discovery;
pub mod driver;
pub mod events;
pub mod findings;
pub mod output;
pub mod probe;
pub mod registry;
pub mod session;
pub mod sitemap;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Auditor operations
///
/// Only conditions that abort a run surface through this type. Recoverable
/// problems (a dead link, a failed child sitemap, a page that timed out) are
/// turned into log or finding events instead.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Invalid start URL {url}: {reason}")]
    InvalidStartUrl { url: String, reason: String },

    #[error("Failed to launch browser session: {0}")]
    BrowserLaunch(String),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: session::Phase,
        to: session::Phase,
    },

    #[error("Run cancelled by consumer")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Network errors from sitemap fetches and existence checks
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },
}

impl FetchError {
    /// Classifies a reqwest error for the given URL
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if source.is_redirect() {
            FetchError::RedirectLimit {
                url: url.to_string(),
            }
        } else {
            FetchError::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Result type alias for Site-Auditor operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlRequest};
pub use discovery::{DiscoveryEngine, DiscoveryRequest, DiscoveryResult};
pub use events::{CrawlEvent, DiscoveryEvent, EventEmitter};
pub use findings::Finding;
pub use session::{AuditSession, Phase};
pub use url::{canonicalize, is_anchor_only, is_non_page_resource, is_same_origin};
