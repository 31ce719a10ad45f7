//! URL handling module for Site-Auditor
//!
//! This module provides canonicalization (fragment stripping), origin and
//! resource classification, depth ordering, and host skip-list matching.

mod matcher;
mod normalize;

pub use matcher::{is_skipped_host, matches_wildcard};
pub use normalize::{
    canonicalize, compare_by_depth, host_of, is_anchor_only, is_http_url, is_image_url,
    is_non_page_resource, is_same_origin, is_svg, origin_of, parse_start_url, path_depth,
    sort_by_depth,
};

/// How a link found on a page is handled by the crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// Same-origin page that may be navigated
    Internal,
    /// Same-origin document/media/style/script/font file, existence-checked only
    InternalResource,
    /// Different origin, existence-checked only
    External,
    /// Not auditable (anchor-only, non-HTTP scheme)
    Ignored,
}

impl LinkClass {
    /// Returns true if the link may be queued for navigation
    pub fn is_navigable(&self) -> bool {
        matches!(self, Self::Internal)
    }

    /// Returns true if the link lives on the audited origin
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::InternalResource)
    }
}

/// Classifies a canonical link relative to the audited origin
///
/// # Examples
///
/// ```
/// use site_auditor::url::{classify_link, LinkClass};
///
/// let origin = "https://example.com";
/// assert_eq!(classify_link("https://example.com/about", origin), LinkClass::Internal);
/// assert_eq!(classify_link("https://example.com/a.pdf", origin), LinkClass::InternalResource);
/// assert_eq!(classify_link("https://other.org/", origin), LinkClass::External);
/// assert_eq!(classify_link("mailto:me@example.com", origin), LinkClass::Ignored);
/// ```
pub fn classify_link(url: &str, origin: &str) -> LinkClass {
    if is_anchor_only(url) || !is_http_url(url) {
        return LinkClass::Ignored;
    }

    if is_same_origin(url, origin) {
        if is_non_page_resource(url) {
            LinkClass::InternalResource
        } else {
            LinkClass::Internal
        }
    } else {
        LinkClass::External
    }
}
