//! Structured progress and result events
//!
//! Discovery and crawl runs each stream one ordered sequence of events to a
//! single consumer through an [`EventEmitter`]. Every event is structured:
//! consumers never need to parse prose to recover state.

mod emitter;

pub use emitter::EventEmitter;

use crate::discovery::DiscoveryResult;
use crate::findings::{BrokenImage, BrokenLink, ConsoleError, Finding, NavigationIssue};
use serde::Serialize;

/// Stage reported by a discovery status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPhase {
    /// Reading the sitemap (and any child sitemaps)
    Sitemap,
    /// Walking pages breadth-first
    Crawling,
    /// Discovery finished
    Complete,
}

/// Progress snapshot during discovery
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryStatus {
    pub phase: DiscoveryPhase,
    pub message: String,
    pub total: usize,
    pub from_sitemap: usize,
    pub pages_scanned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
}

/// Events streamed by a discovery run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiscoveryEvent {
    Status(DiscoveryStatus),
    Done(DiscoveryResult),
    Error { message: String },
}

/// Progress snapshot during a crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    pub current_url: String,
    pub crawled: usize,
    pub queued: usize,
    pub broken_links: usize,
    pub broken_images: usize,
    pub navigation_issues: usize,
}

/// Terminal crawl event carrying the authoritative result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlDone {
    pub message: String,
    pub crawled: usize,
    pub broken_links: usize,
    pub broken_images: usize,
    pub console_errors: usize,
    pub navigation_issues: usize,
    pub findings: Vec<Finding>,
}

/// Events streamed by a crawl run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    Log { message: String },
    Progress(CrawlProgress),
    BrokenLink(BrokenLink),
    BrokenImage(BrokenImage),
    ConsoleError(ConsoleError),
    NavigationIssue(NavigationIssue),
    Done(CrawlDone),
    Error { message: String },
}

impl CrawlEvent {
    pub fn log(message: impl Into<String>) -> Self {
        CrawlEvent::Log {
            message: message.into(),
        }
    }
}

impl From<Finding> for CrawlEvent {
    fn from(finding: Finding) -> Self {
        match finding {
            Finding::BrokenLink(f) => CrawlEvent::BrokenLink(f),
            Finding::BrokenImage(f) => CrawlEvent::BrokenImage(f),
            Finding::ConsoleError(f) => CrawlEvent::ConsoleError(f),
            Finding::NavigationIssue(f) => CrawlEvent::NavigationIssue(f),
        }
    }
}
