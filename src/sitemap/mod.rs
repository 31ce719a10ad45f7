//! Sitemap reader
//!
//! Fetches an XML sitemap and flattens it, following sitemap indexes down to
//! their child sitemaps. Children are fetched in small concurrent batches so
//! the target host is never hit with the whole index at once.

mod parse;

pub use parse::{extract_child_sitemaps, extract_page_urls, is_index, looks_like_sitemap};

use crate::config::{Config, SitemapConfig};
use crate::driver::build_http_client;
use crate::FetchError;
use futures::future::join_all;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};

/// Flattened content of a sitemap tree
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SitemapContents {
    /// Page locations in document order, duplicates removed
    pub page_urls: Vec<String>,

    /// Sitemap documents successfully fetched (root included)
    pub sitemaps_read: usize,

    /// Child sitemaps that could not be fetched
    pub sitemaps_failed: usize,
}

/// Reads XML sitemaps over HTTP
#[derive(Clone)]
pub struct SitemapReader {
    client: Client,
    config: SitemapConfig,
}

impl SitemapReader {
    /// Creates a reader with its own client
    ///
    /// The client follows at most `sitemap.max-redirects` redirects and
    /// accepts self-signed certificates.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, config.sitemap.max_redirects)?;
        Ok(Self::with_client(client, config.sitemap.clone()))
    }

    pub fn with_client(client: Client, config: SitemapConfig) -> Self {
        Self { client, config }
    }

    /// Fetches one sitemap document as text
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.fetch_timeout())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }

    /// Reads a sitemap and every sitemap it references
    ///
    /// Only a failure to fetch the root document is returned as an error;
    /// failed children are logged and skipped.
    pub async fn read(&self, url: &str) -> Result<SitemapContents, FetchError> {
        let root = self.fetch(url).await?;

        let mut contents = SitemapContents {
            sitemaps_read: 1,
            ..Default::default()
        };
        let mut seen_sitemaps: HashSet<String> = HashSet::from([url.to_string()]);
        let mut seen_pages: HashSet<String> = HashSet::new();
        let mut pending: VecDeque<String> = VecDeque::new();

        absorb(
            &root,
            &mut contents,
            &mut seen_sitemaps,
            &mut seen_pages,
            &mut pending,
        );

        let batch_size = self.config.child_batch_size.max(1);
        while !pending.is_empty() {
            let take = batch_size.min(pending.len());
            let batch: Vec<String> = pending.drain(..take).collect();
            tracing::debug!("Fetching {} child sitemaps", batch.len());

            let results = join_all(batch.iter().map(|child| self.fetch(child))).await;

            for (child, result) in batch.iter().zip(results) {
                match result {
                    Ok(xml) => {
                        contents.sitemaps_read += 1;
                        absorb(
                            &xml,
                            &mut contents,
                            &mut seen_sitemaps,
                            &mut seen_pages,
                            &mut pending,
                        );
                    }
                    Err(e) => {
                        tracing::warn!("Skipping child sitemap {}: {}", child, e);
                        contents.sitemaps_failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Read {} sitemap(s) with {} page URLs ({} failed)",
            contents.sitemaps_read,
            contents.page_urls.len(),
            contents.sitemaps_failed
        );

        Ok(contents)
    }
}

/// Adds one document's pages, and queues its unseen child sitemaps
fn absorb(
    xml: &str,
    contents: &mut SitemapContents,
    seen_sitemaps: &mut HashSet<String>,
    seen_pages: &mut HashSet<String>,
    pending: &mut VecDeque<String>,
) {
    if is_index(xml) {
        for child in extract_child_sitemaps(xml) {
            if seen_sitemaps.insert(child.clone()) {
                pending.push_back(child);
            }
        }
    } else {
        for page in extract_page_urls(xml) {
            if seen_pages.insert(page.clone()) {
                contents.page_urls.push(page);
            }
        }
    }
}
