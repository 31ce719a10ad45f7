//! Discovery engine
//!
//! Builds the list of pages a crawl may visit, either by flattening the
//! site's sitemap (no navigation at all) or by walking same-origin links
//! breadth-first from the start URL. Both modes produce a canonical,
//! depth-sorted list that a caller previews before choosing what to crawl.

mod walk;

use crate::config::Config;
use crate::driver::BrowserDriver;
use crate::events::{DiscoveryEvent, DiscoveryPhase, DiscoveryStatus, EventEmitter};
use crate::sitemap::SitemapReader;
use crate::url::{
    canonicalize, is_non_page_resource, is_same_origin, origin_of, parse_start_url, sort_by_depth,
};
use crate::AuditError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Parameters of a discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRequest {
    pub start_url: String,

    /// Switches discovery to sitemap mode when present
    #[serde(default)]
    pub sitemap_url: Option<String>,

    /// Restricts link extraction to elements matching this selector
    #[serde(default)]
    pub selector: Option<String>,
}

impl DiscoveryRequest {
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

    /// Browser-crawl mode needs a driver; sitemap mode never navigates
    pub fn needs_browser(&self) -> bool {
        self.sitemap_url.is_none()
    }
}

/// Outcome of a discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    /// Canonical page URLs, depth ascending then lexicographic
    pub links: Vec<String>,

    /// Number of entries in `links`
    pub total: usize,

    /// Unique same-origin page URLs contributed by the sitemap
    pub from_sitemap: usize,

    /// URLs found by walking pages
    pub from_pages: usize,

    /// Pages navigated during discovery
    pub pages_scanned: usize,
}

/// Runs discovery in either mode
pub struct DiscoveryEngine {
    config: Arc<Config>,
    sitemap: SitemapReader,
}

impl DiscoveryEngine {
    pub fn new(config: Arc<Config>, sitemap: SitemapReader) -> Self {
        Self { config, sitemap }
    }

    /// Sitemap mode: flattens the sitemap without visiting any page
    ///
    /// An unreachable sitemap is not fatal; the result then holds only the
    /// start URL.
    pub async fn from_sitemap(
        &self,
        request: &DiscoveryRequest,
        sitemap_url: &str,
        emitter: &EventEmitter<DiscoveryEvent>,
    ) -> Result<DiscoveryResult, AuditError> {
        let start = start_url(&request.start_url)?;
        let origin = origin_of(&start).unwrap_or_default();

        emitter.send(status(
            DiscoveryPhase::Sitemap,
            format!("Reading sitemap {}", sitemap_url),
            0,
            0,
            0,
            None,
        ));

        let page_urls = match self.sitemap.read(sitemap_url).await {
            Ok(contents) => contents.page_urls,
            Err(e) => {
                tracing::warn!("Sitemap {} unavailable: {}", sitemap_url, e);
                emitter.send(status(
                    DiscoveryPhase::Sitemap,
                    format!("Sitemap unavailable: {}", e),
                    0,
                    0,
                    0,
                    None,
                ));
                Vec::new()
            }
        };

        let mut from_sitemap = HashSet::new();
        for url in &page_urls {
            let canonical = canonicalize(url);
            if is_same_origin(&canonical, &origin) && !is_non_page_resource(&canonical) {
                from_sitemap.insert(canonical);
            } else {
                tracing::trace!("Ignoring sitemap entry {}", url);
            }
        }

        let mut links: Vec<String> = from_sitemap.iter().cloned().collect();
        if !from_sitemap.contains(&start) {
            links.push(start.clone());
        }
        sort_by_depth(&mut links);

        let result = DiscoveryResult {
            total: links.len(),
            from_sitemap: from_sitemap.len(),
            from_pages: 0,
            pages_scanned: 0,
            links,
        };

        finish(emitter, &result);
        Ok(result)
    }

    /// Browser-crawl mode: breadth-first walk over same-origin links
    pub async fn from_pages(
        &self,
        request: &DiscoveryRequest,
        driver: &mut dyn BrowserDriver,
        emitter: &EventEmitter<DiscoveryEvent>,
    ) -> Result<DiscoveryResult, AuditError> {
        let start = start_url(&request.start_url)?;
        let result = walk::walk(
            &self.config.crawler,
            &start,
            request.selector.as_deref(),
            driver,
            emitter,
        )
        .await?;

        finish(emitter, &result);
        Ok(result)
    }
}

fn start_url(raw: &str) -> Result<String, AuditError> {
    let url = parse_start_url(raw).map_err(|e| AuditError::InvalidStartUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    Ok(canonicalize(url.as_str()))
}

fn finish(emitter: &EventEmitter<DiscoveryEvent>, result: &DiscoveryResult) {
    tracing::info!(
        "Discovery complete: {} links ({} from sitemap, {} pages scanned)",
        result.total,
        result.from_sitemap,
        result.pages_scanned
    );
    emitter.send(status(
        DiscoveryPhase::Complete,
        format!("Discovered {} pages", result.total),
        result.total,
        result.from_sitemap,
        result.pages_scanned,
        None,
    ));
    emitter.send(DiscoveryEvent::Done(result.clone()));
}

fn status(
    phase: DiscoveryPhase,
    message: String,
    total: usize,
    from_sitemap: usize,
    pages_scanned: usize,
    current_url: Option<String>,
) -> DiscoveryEvent {
    DiscoveryEvent::Status(DiscoveryStatus {
        phase,
        message,
        total,
        from_sitemap,
        pages_scanned,
        current_url,
    })
}
