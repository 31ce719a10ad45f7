//! Link/referrer registry
//!
//! Maps each canonical target URL to every place it was linked from, so a
//! single broken target can be reported against each page that links to it.

use std::collections::HashMap;

/// One occurrence of a link (or image) pointing at a target URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    /// Canonical URL the link points at
    pub target_url: String,

    /// Canonical URL of the page the link was found on
    pub found_on_page: String,

    /// Anchor text, or alt text for images
    pub link_text: String,

    /// Short description of where in the DOM the element sits
    pub element_context: String,
}

impl LinkReference {
    pub fn new(
        target_url: impl Into<String>,
        found_on_page: impl Into<String>,
        link_text: impl Into<String>,
        element_context: impl Into<String>,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            found_on_page: found_on_page.into(),
            link_text: link_text.into(),
            element_context: element_context.into(),
        }
    }
}

/// Registry of canonical URL -> referrers, in discovery order
///
/// Grows monotonically for the lifetime of a run. A (page, text) pair is
/// recorded at most once per target.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    entries: HashMap<String, Vec<LinkReference>>,
    reference_count: usize,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reference
    ///
    /// Returns false when the same (found_on_page, link_text) pair was
    /// already registered for this target.
    pub fn register(&mut self, reference: LinkReference) -> bool {
        let refs = self
            .entries
            .entry(reference.target_url.clone())
            .or_default();

        let duplicate = refs.iter().any(|existing| {
            existing.found_on_page == reference.found_on_page
                && existing.link_text == reference.link_text
        });
        if duplicate {
            return false;
        }

        refs.push(reference);
        self.reference_count += 1;
        true
    }

    /// All references to a target, in the order they were found
    pub fn referrers(&self, target_url: &str) -> &[LinkReference] {
        self.entries
            .get(target_url)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if at least one page links to the target
    pub fn has_referrers(&self, target_url: &str) -> bool {
        !self.referrers(target_url).is_empty()
    }

    /// Number of distinct targets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of references across all targets
    pub fn reference_count(&self) -> usize {
        self.reference_count
    }
}
