//! Audit findings
//!
//! A finding is one reportable problem attributed to one page. A broken
//! target linked from N pages yields N findings.

use crate::registry::LinkReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A link whose target answered with an HTTP error status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    pub url: String,
    pub status_code: u16,
    pub found_on_page: String,
    pub link_text: String,
    pub element_context: String,
    pub timestamp: DateTime<Utc>,
}

/// An image that failed to load and failed re-verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenImage {
    pub src: String,
    pub found_on_page: String,
    pub alt_text: String,
    pub element_context: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// A script or console error raised while a page was rendered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleError {
    pub message: String,
    pub found_on_page: String,
    #[serde(rename = "type")]
    pub kind: ConsoleErrorKind,
    pub timestamp: DateTime<Utc>,
}

/// Source of a console error finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleErrorKind {
    /// `console.error` output
    Console,
    /// Uncaught exception in page script
    PageError,
    /// Sub-resource request that failed without a response
    RequestFailed,
}

/// A page or resource that could not be loaded at all (timeout, DNS, ...)
///
/// Kept apart from broken links because these are frequently transient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationIssue {
    pub url: String,
    pub reason: String,
    pub found_on_page: String,
    pub link_text: String,
    pub element_context: String,
    pub timestamp: DateTime<Utc>,
}

/// One reportable problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    BrokenLink(BrokenLink),
    BrokenImage(BrokenImage),
    ConsoleError(ConsoleError),
    NavigationIssue(NavigationIssue),
}

/// Discriminant of a [`Finding`], used for counting and dedup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FindingKind {
    BrokenLink,
    BrokenImage,
    ConsoleError,
    NavigationIssue,
}

impl Finding {
    pub fn broken_link(reference: &LinkReference, status_code: u16) -> Self {
        Finding::BrokenLink(BrokenLink {
            url: reference.target_url.clone(),
            status_code,
            found_on_page: reference.found_on_page.clone(),
            link_text: reference.link_text.clone(),
            element_context: reference.element_context.clone(),
            timestamp: Utc::now(),
        })
    }

    pub fn broken_image(reference: &LinkReference, reason: impl Into<String>) -> Self {
        Finding::BrokenImage(BrokenImage {
            src: reference.target_url.clone(),
            found_on_page: reference.found_on_page.clone(),
            alt_text: reference.link_text.clone(),
            element_context: reference.element_context.clone(),
            reason: reason.into(),
            timestamp: Utc::now(),
        })
    }

    pub fn navigation_issue(reference: &LinkReference, reason: impl Into<String>) -> Self {
        Finding::NavigationIssue(NavigationIssue {
            url: reference.target_url.clone(),
            reason: reason.into(),
            found_on_page: reference.found_on_page.clone(),
            link_text: reference.link_text.clone(),
            element_context: reference.element_context.clone(),
            timestamp: Utc::now(),
        })
    }

    pub fn console_error(
        message: impl Into<String>,
        found_on_page: impl Into<String>,
        kind: ConsoleErrorKind,
    ) -> Self {
        Finding::ConsoleError(ConsoleError {
            message: message.into(),
            found_on_page: found_on_page.into(),
            kind,
            timestamp: Utc::now(),
        })
    }

    pub fn kind(&self) -> FindingKind {
        match self {
            Finding::BrokenLink(_) => FindingKind::BrokenLink,
            Finding::BrokenImage(_) => FindingKind::BrokenImage,
            Finding::ConsoleError(_) => FindingKind::ConsoleError,
            Finding::NavigationIssue(_) => FindingKind::NavigationIssue,
        }
    }

    /// The offending URL, or the message for console errors
    pub fn subject(&self) -> &str {
        match self {
            Finding::BrokenLink(f) => &f.url,
            Finding::BrokenImage(f) => &f.src,
            Finding::ConsoleError(f) => &f.message,
            Finding::NavigationIssue(f) => &f.url,
        }
    }

    pub fn found_on_page(&self) -> &str {
        match self {
            Finding::BrokenLink(f) => &f.found_on_page,
            Finding::BrokenImage(f) => &f.found_on_page,
            Finding::ConsoleError(f) => &f.found_on_page,
            Finding::NavigationIssue(f) => &f.found_on_page,
        }
    }

    /// Anchor or alt text; empty for console errors
    pub fn link_text(&self) -> &str {
        match self {
            Finding::BrokenLink(f) => &f.link_text,
            Finding::BrokenImage(f) => &f.alt_text,
            Finding::ConsoleError(_) => "",
            Finding::NavigationIssue(f) => &f.link_text,
        }
    }

    /// Identity used to avoid reporting the same occurrence twice
    pub fn dedup_key(&self) -> (FindingKind, String, String, String) {
        (
            self.kind(),
            self.subject().to_string(),
            self.found_on_page().to_string(),
            self.link_text().to_string(),
        )
    }
}
