//! Per-run crawl state
//!
//! Everything a crawl mutates lives in one [`RunContext`] owned by the run.
//! Nothing here is shared between runs, and the only writers are the run's
//! page loop and the browser events it drains between pages.

use super::frontier::Frontier;
use crate::findings::{ConsoleErrorKind, Finding, FindingKind};
use crate::registry::{LinkReference, LinkRegistry};
use std::collections::{HashMap, HashSet};

/// How the frontier is fed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Seeded with the start URL, every new same-origin page is queued
    Full,
    /// Seeded with a caller-chosen subset, nothing is queued afterwards
    Selective,
}

/// What to do with an internal link found during a selective crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectiveAction {
    /// Part of the selection, it will be visited anyway
    Selected,
    /// Known from discovery and trusted to be valid
    Trusted,
    /// Neither: verify with an existence check
    Check,
}

/// Why a target is considered broken
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetFailure {
    /// Answered with an HTTP error status
    Status(u16),
    /// An image that failed to load and failed re-verification
    Image(String),
    /// Could not be loaded at all
    Unreachable(String),
}

impl TargetFailure {
    fn finding_for(&self, reference: &LinkReference) -> Finding {
        match self {
            TargetFailure::Status(status) => Finding::broken_link(reference, *status),
            TargetFailure::Image(reason) => Finding::broken_image(reference, reason.clone()),
            TargetFailure::Unreachable(reason) => {
                Finding::navigation_issue(reference, reason.clone())
            }
        }
    }
}

/// Mutable state of one crawl run
#[derive(Debug)]
pub struct RunContext {
    pub origin: String,
    /// Canonical start URL; the only page that can fail with no referrer
    pub start_url: String,
    pub mode: CrawlMode,
    pub has_sitemap: bool,
    pub frontier: Frontier,
    pub registry: LinkRegistry,
    /// Targets already sent to an existence check
    pub checked_resources: HashSet<String>,
    /// Pages navigated so far
    pub pages_crawled: usize,
    /// Page whose processing is in progress, used to attribute browser events
    pub current_page: Option<String>,
    selected: HashSet<String>,
    discovered: HashSet<String>,
    trust_discovered: bool,
    broken: HashMap<String, TargetFailure>,
    reported: HashSet<(FindingKind, String, String, String)>,
    findings: Vec<Finding>,
}

impl RunContext {
    /// Full mode context seeded with the start URL
    pub fn full(origin: impl Into<String>, start: &str, has_sitemap: bool) -> Self {
        Self::build(
            origin.into(),
            start.to_string(),
            CrawlMode::Full,
            has_sitemap,
            Frontier::seeded([start]),
            HashSet::new(),
            HashSet::new(),
            false,
        )
    }

    /// Selective mode context seeded with the chosen pages
    pub fn selective(
        origin: impl Into<String>,
        start: &str,
        selected: Vec<String>,
        discovered: Vec<String>,
        has_sitemap: bool,
        trust_discovered: bool,
    ) -> Self {
        let frontier = Frontier::seeded(selected.iter().cloned());
        Self::build(
            origin.into(),
            start.to_string(),
            CrawlMode::Selective,
            has_sitemap,
            frontier,
            selected.into_iter().collect(),
            discovered.into_iter().collect(),
            trust_discovered,
        )
    }

    fn build(
        origin: String,
        start_url: String,
        mode: CrawlMode,
        has_sitemap: bool,
        frontier: Frontier,
        selected: HashSet<String>,
        discovered: HashSet<String>,
        trust_discovered: bool,
    ) -> Self {
        Self {
            origin,
            start_url,
            mode,
            has_sitemap,
            frontier,
            registry: LinkRegistry::new(),
            checked_resources: HashSet::new(),
            pages_crawled: 0,
            current_page: None,
            selected,
            discovered,
            trust_discovered,
            broken: HashMap::new(),
            reported: HashSet::new(),
            findings: Vec::new(),
        }
    }

    /// Selective-mode policy for an internal link
    pub fn selective_action(&self, target: &str) -> SelectiveAction {
        if self.selected.contains(target) {
            SelectiveAction::Selected
        } else if self.trust_discovered && self.discovered.contains(target) {
            SelectiveAction::Trusted
        } else {
            SelectiveAction::Check
        }
    }

    /// Fallback attribution for a navigated page that failed
    ///
    /// Only the start URL is attributed to itself; any other page waits for
    /// the pages linking to it.
    pub fn navigation_fallback<'a>(&self, url: &'a str) -> Option<&'a str> {
        (url == self.start_url).then_some(url)
    }

    /// Page used when a failure has no registered referrer
    pub fn fallback_page(&self, target: &str) -> String {
        self.current_page
            .clone()
            .unwrap_or_else(|| target.to_string())
    }

    /// Registers a link occurrence
    ///
    /// If the target is already known to be broken, the finding for this
    /// new referrer is returned.
    pub fn register_link(&mut self, reference: LinkReference) -> Vec<Finding> {
        if !self.registry.register(reference.clone()) {
            return Vec::new();
        }

        let late = self
            .broken
            .get(&reference.target_url)
            .map(|failure| failure.finding_for(&reference));

        late.into_iter()
            .filter_map(|finding| self.record(finding))
            .collect()
    }

    /// Marks a target as broken and reports it against every referrer
    ///
    /// Without referrers a single finding is attributed to `fallback_page`
    /// when one is given; otherwise nothing is reported until referrers
    /// show up through `register_link`. A target is only marked once;
    /// later calls report nothing new.
    pub fn fail_target(
        &mut self,
        target: &str,
        failure: TargetFailure,
        fallback_page: Option<&str>,
    ) -> Vec<Finding> {
        if self.broken.contains_key(target) {
            return Vec::new();
        }

        let mut references = self.registry.referrers(target).to_vec();
        if references.is_empty() {
            if let Some(page) = fallback_page {
                references.push(LinkReference::new(target, page, "", ""));
            }
        }

        let findings: Vec<Finding> = references
            .iter()
            .map(|reference| failure.finding_for(reference))
            .collect();
        self.broken.insert(target.to_string(), failure);

        findings
            .into_iter()
            .filter_map(|finding| self.record(finding))
            .collect()
    }

    /// Records a console-derived finding for the current page
    pub fn console_error(&mut self, message: &str, kind: ConsoleErrorKind) -> Option<Finding> {
        let page = self.current_page.clone().unwrap_or_default();
        self.record(Finding::console_error(message, page, kind))
    }

    /// Appends a finding unless an identical one was already reported
    pub fn record(&mut self, finding: Finding) -> Option<Finding> {
        if !self.reported.insert(finding.dedup_key()) {
            tracing::trace!("Duplicate finding for {}", finding.subject());
            return None;
        }
        self.findings.push(finding.clone());
        Some(finding)
    }

    pub fn is_broken(&self, target: &str) -> bool {
        self.broken.contains_key(target)
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind() == kind).count()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}
