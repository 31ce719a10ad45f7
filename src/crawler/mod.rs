//! Crawl engine
//!
//! This module contains the audit crawl, including:
//! - The breadth-first frontier shared with discovery
//! - Per-run state (registry, visited set, findings) in a [`RunContext`]
//! - Per-page processing: navigation, link/image extraction, existence checks
//! - Correlation of browser events (failed loads, console output) to referrers

mod context;
mod engine;
mod frontier;
mod listener;

pub use context::{CrawlMode, RunContext, SelectiveAction, TargetFailure};
pub use engine::CrawlEngine;
pub use frontier::Frontier;

use serde::Deserialize;

/// Parameters of a crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    pub start_url: String,

    /// Present when the site has a sitemap; changes how header links are queued
    #[serde(default)]
    pub sitemap_url: Option<String>,

    /// Restricts link/image extraction to elements matching this selector
    #[serde(default)]
    pub selector: Option<String>,

    /// Pages to visit; absent means a full-site crawl
    #[serde(default)]
    pub selected_urls: Option<Vec<String>>,

    /// URLs from a prior discovery, assumed valid in selective mode
    #[serde(default)]
    pub all_discovered_urls: Option<Vec<String>>,
}

impl CrawlRequest {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            ..Default::default()
        }
    }

    pub fn with_sitemap(mut self, sitemap_url: impl Into<String>) -> Self {
        self.sitemap_url = Some(sitemap_url.into());
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_selection(mut self, selected: Vec<String>, discovered: Vec<String>) -> Self {
        self.selected_urls = Some(selected);
        self.all_discovered_urls = Some(discovered);
        self
    }

    pub fn mode(&self) -> CrawlMode {
        if self.selected_urls.is_some() {
            CrawlMode::Selective
        } else {
            CrawlMode::Full
        }
    }
}
