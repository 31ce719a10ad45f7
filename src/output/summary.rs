//! Crawl summary types
//!
//! This module defines the aggregated view of a finished crawl used by the
//! report writers and the command-line statistics.

use crate::events::CrawlDone;
use crate::findings::{Finding, FindingKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Pages listed in the "most affected" section
const TOP_PAGES: usize = 20;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary statistics for a crawl
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSummary {
    pub start_url: String,
    pub generated_at: DateTime<Utc>,

    pub pages_crawled: usize,
    pub broken_links: usize,
    pub broken_images: usize,
    pub console_errors: usize,
    pub navigation_issues: usize,

    /// Distinct URLs behind broken link/image and navigation findings
    pub broken_targets: usize,

    /// Broken link count per HTTP status
    pub status_breakdown: BTreeMap<u16, usize>,

    /// Pages with at least one finding
    pub affected_pages: usize,

    /// Pages with the most findings, descending
    pub top_pages: Vec<(String, usize)>,
}

impl CrawlSummary {
    /// Builds a summary from the terminal crawl event
    pub fn from_done(start_url: impl Into<String>, done: &CrawlDone) -> Self {
        let findings = &done.findings;

        let broken_targets = findings
            .iter()
            .filter(|f| f.kind() != FindingKind::ConsoleError)
            .map(Finding::subject)
            .collect::<HashSet<_>>()
            .len();

        let mut status_breakdown = BTreeMap::new();
        for finding in findings {
            if let Finding::BrokenLink(link) = finding {
                *status_breakdown.entry(link.status_code).or_insert(0) += 1;
            }
        }

        let mut per_page: HashMap<&str, usize> = HashMap::new();
        for finding in findings {
            *per_page.entry(finding.found_on_page()).or_insert(0) += 1;
        }
        let affected_pages = per_page.len();
        let mut top_pages: Vec<(String, usize)> = per_page
            .into_iter()
            .map(|(page, count)| (page.to_string(), count))
            .collect();
        top_pages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_pages.truncate(TOP_PAGES);

        Self {
            start_url: start_url.into(),
            generated_at: Utc::now(),
            pages_crawled: done.crawled,
            broken_links: done.broken_links,
            broken_images: done.broken_images,
            console_errors: done.console_errors,
            navigation_issues: done.navigation_issues,
            broken_targets,
            status_breakdown,
            affected_pages,
            top_pages,
        }
    }

    pub fn total_findings(&self) -> usize {
        self.broken_links + self.broken_images + self.console_errors + self.navigation_issues
    }

    /// True when the crawl found nothing to fix
    pub fn is_clean(&self) -> bool {
        self.total_findings() == 0
    }
}
