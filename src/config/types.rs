use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Site-Auditor
///
/// Every section is optional in the TOML file; missing sections and keys
/// fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub sitemap: SitemapConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Crawl and discovery loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Pages processed between progress events
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Navigation timeout during a crawl (milliseconds)
    #[serde(
        rename = "navigation-timeout-ms",
        default = "default_navigation_timeout_ms"
    )]
    pub navigation_timeout_ms: u64,

    /// Navigation timeout during discovery (milliseconds)
    #[serde(rename = "discovery-timeout-ms", default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    /// Timeout for a single existence check (milliseconds)
    #[serde(
        rename = "existence-check-timeout-ms",
        default = "default_existence_check_timeout_ms"
    )]
    pub existence_check_timeout_ms: u64,

    /// Safety cap on pages visited by browser-crawl discovery
    #[serde(rename = "max-discovery-pages", default = "default_max_discovery_pages")]
    pub max_discovery_pages: usize,

    /// Number of existence checks allowed in flight at once
    #[serde(rename = "check-concurrency", default = "default_check_concurrency")]
    pub check_concurrency: usize,
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn existence_check_timeout(&self) -> Duration {
        Duration::from_millis(self.existence_check_timeout_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            existence_check_timeout_ms: default_existence_check_timeout_ms(),
            max_discovery_pages: default_max_discovery_pages(),
            check_concurrency: default_check_concurrency(),
        }
    }
}

/// Sitemap fetching configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SitemapConfig {
    /// Maximum redirects followed for one sitemap fetch
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Child sitemaps fetched concurrently per batch
    #[serde(rename = "child-batch-size", default = "default_child_batch_size")]
    pub child_batch_size: usize,

    /// Timeout for one sitemap fetch (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl SitemapConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
            child_batch_size: default_child_batch_size(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the auditor
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the auditor
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the auditor
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

/// Link validation policy
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Hosts never probed for external links (wildcards allowed)
    #[serde(rename = "skip-hosts", default = "default_skip_hosts")]
    pub skip_hosts: Vec<String>,

    /// In selective mode, treat caller-supplied discovered URLs as valid
    #[serde(rename = "trust-discovered", default = "default_trust_discovered")]
    pub trust_discovered: bool,

    /// Additional noise patterns for the failure classifier
    #[serde(rename = "extra-noise-patterns", default)]
    pub extra_noise_patterns: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            skip_hosts: default_skip_hosts(),
            trust_discovered: default_trust_discovered(),
            extra_noise_patterns: Vec::new(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_discovery_timeout_ms() -> u64 {
    15_000
}

fn default_existence_check_timeout_ms() -> u64 {
    10_000
}

fn default_max_discovery_pages() -> usize {
    5000
}

fn default_check_concurrency() -> usize {
    5
}

fn default_max_redirects() -> usize {
    5
}

fn default_child_batch_size() -> usize {
    5
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_crawler_name() -> String {
    "SiteAuditor".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_trust_discovered() -> bool {
    true
}

/// Social and media platforms known to block automated probing
fn default_skip_hosts() -> Vec<String> {
    [
        "*.facebook.com",
        "*.fb.com",
        "*.twitter.com",
        "x.com",
        "*.linkedin.com",
        "*.instagram.com",
        "*.youtube.com",
        "youtu.be",
        "*.tiktok.com",
        "*.pinterest.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
