//! Crawl orchestration
//!
//! Pages are taken from the frontier in batches and processed strictly one
//! after another against the run's single browser session. Existence checks
//! gathered while processing a page run concurrently, bounded by
//! `crawler.check-concurrency`.

use super::context::{CrawlMode, RunContext, SelectiveAction, TargetFailure};
use super::listener;
use super::CrawlRequest;
use crate::classifier::FailureClassifier;
use crate::config::Config;
use crate::driver::{BrowserDriver, BrowserEvent, DriverError, ExtractQuery, ExtractedElement};
use crate::events::{CrawlDone, CrawlEvent, CrawlProgress, EventEmitter};
use crate::findings::{Finding, FindingKind};
use crate::probe::{ExistenceCheck, ProbeResult};
use crate::registry::LinkReference;
use crate::url::{
    canonicalize, classify_link, is_anchor_only, is_image_url, is_non_page_resource,
    is_skipped_host, is_svg, origin_of, parse_start_url, LinkClass,
};
use crate::{AuditError, ConfigError};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// What an existence check is verifying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckKind {
    Link,
    Image,
}

#[derive(Debug, Clone)]
struct PendingCheck {
    url: String,
    kind: CheckKind,
}

/// Runs audit crawls
pub struct CrawlEngine {
    config: Arc<Config>,
    probe: Arc<dyn ExistenceCheck>,
    classifier: FailureClassifier,
}

impl CrawlEngine {
    /// Creates an engine; fails if a configured noise pattern is invalid
    pub fn new(config: Arc<Config>, probe: Arc<dyn ExistenceCheck>) -> Result<Self, ConfigError> {
        let classifier = FailureClassifier::new(&config.validation.extra_noise_patterns)?;
        Ok(Self {
            config,
            probe,
            classifier,
        })
    }

    /// Crawls until the frontier is empty
    ///
    /// Findings are streamed as they are made and returned in full with the
    /// terminal `done` event. The run stops early with
    /// [`AuditError::Cancelled`] once the event consumer goes away; the page
    /// in flight is finished first.
    pub async fn run(
        &self,
        request: &CrawlRequest,
        driver: &mut dyn BrowserDriver,
        emitter: &EventEmitter<CrawlEvent>,
    ) -> Result<CrawlDone, AuditError> {
        let mut ctx = self.build_context(request)?;
        let mut browser_events = driver.subscribe();
        let selector = request.selector.as_deref();
        let batch_size = self.config.crawler.batch_size.max(1);

        let mode = match ctx.mode {
            CrawlMode::Full => "full",
            CrawlMode::Selective => "selective",
        };
        tracing::info!("Starting {} crawl of {} ({} queued)", mode, ctx.origin, ctx.frontier.len());
        emitter.send(CrawlEvent::log(format!(
            "Starting {} crawl of {} with {} page(s) queued",
            mode,
            request.start_url,
            ctx.frontier.len()
        )));

        loop {
            let batch = ctx.frontier.next_batch(batch_size);
            if batch.is_empty() {
                break;
            }
            tracing::debug!("Processing batch of {} URLs", batch.len());

            for url in batch {
                if emitter.is_closed() {
                    tracing::info!("Crawl cancelled after {} pages", ctx.pages_crawled);
                    return Err(AuditError::Cancelled);
                }

                self.process_url(&mut ctx, &url, selector, driver, emitter)
                    .await?;
                self.drain_browser_events(&mut ctx, browser_events.as_mut(), emitter);

                emitter.send(CrawlEvent::Progress(CrawlProgress {
                    current_url: url.clone(),
                    crawled: ctx.pages_crawled,
                    queued: ctx.frontier.len(),
                    broken_links: ctx.count(FindingKind::BrokenLink),
                    broken_images: ctx.count(FindingKind::BrokenImage),
                    navigation_issues: ctx.count(FindingKind::NavigationIssue),
                }));
            }

            emitter.send(CrawlEvent::log(format!(
                "{} pages crawled, {} queued",
                ctx.pages_crawled,
                ctx.frontier.len()
            )));
        }

        // Events that arrived after the last page
        self.drain_browser_events(&mut ctx, browser_events.as_mut(), emitter);

        let done = CrawlDone {
            message: format!(
                "Crawl complete: {} pages, {} broken links, {} broken images, {} console errors, {} navigation issues",
                ctx.pages_crawled,
                ctx.count(FindingKind::BrokenLink),
                ctx.count(FindingKind::BrokenImage),
                ctx.count(FindingKind::ConsoleError),
                ctx.count(FindingKind::NavigationIssue)
            ),
            crawled: ctx.pages_crawled,
            broken_links: ctx.count(FindingKind::BrokenLink),
            broken_images: ctx.count(FindingKind::BrokenImage),
            console_errors: ctx.count(FindingKind::ConsoleError),
            navigation_issues: ctx.count(FindingKind::NavigationIssue),
            findings: ctx.into_findings(),
        };

        tracing::info!("{}", done.message);
        emitter.send(CrawlEvent::Done(done.clone()));
        Ok(done)
    }

    fn build_context(&self, request: &CrawlRequest) -> Result<RunContext, AuditError> {
        let start = parse_start_url(&request.start_url).map_err(|e| {
            AuditError::InvalidStartUrl {
                url: request.start_url.clone(),
                reason: e.to_string(),
            }
        })?;
        let start = canonicalize(start.as_str());
        let origin = origin_of(&start).unwrap_or_default();
        let has_sitemap = request.sitemap_url.is_some();

        let ctx = match &request.selected_urls {
            None => RunContext::full(origin, &start, has_sitemap),
            Some(selected) => RunContext::selective(
                origin,
                &start,
                selected.iter().map(|u| canonicalize(u)).collect(),
                request
                    .all_discovered_urls
                    .iter()
                    .flatten()
                    .map(|u| canonicalize(u))
                    .collect(),
                has_sitemap,
                self.config.validation.trust_discovered,
            ),
        };
        Ok(ctx)
    }

    async fn process_url(
        &self,
        ctx: &mut RunContext,
        url: &str,
        selector: Option<&str>,
        driver: &mut dyn BrowserDriver,
        emitter: &EventEmitter<CrawlEvent>,
    ) -> Result<(), AuditError> {
        if !ctx.frontier.mark_visited(url) {
            return Ok(());
        }
        ctx.current_page = Some(url.to_string());

        if is_non_page_resource(url) {
            self.check_resource(ctx, url, emitter).await;
            return Ok(());
        }

        tracing::debug!("Crawling {}", url);
        ctx.pages_crawled += 1;

        match driver
            .navigate(url, self.config.crawler.navigation_timeout())
            .await
        {
            Ok(response) => {
                if let Some(status) = response.status.filter(|s| *s >= 400) {
                    tracing::debug!("{} answered {}", url, status);
                    let fallback = ctx.navigation_fallback(url);
                    let findings = ctx.fail_target(url, TargetFailure::Status(status), fallback);
                    emit(emitter, findings);
                    return Ok(());
                }
            }
            Err(DriverError::Closed) => return Err(DriverError::Closed.into()),
            Err(e) => {
                tracing::debug!("Navigation to {} failed: {}", url, e);
                let fallback = ctx.navigation_fallback(url);
                let findings =
                    ctx.fail_target(url, TargetFailure::Unreachable(e.to_string()), fallback);
                emit(emitter, findings);
                return Ok(());
            }
        }

        let anchors = match extract(driver, ExtractQuery::Anchors, selector, url).await? {
            Some(anchors) => anchors,
            None => return Ok(()),
        };
        let images = extract(driver, ExtractQuery::Images, selector, url)
            .await?
            .unwrap_or_default();

        // Header links count as content on the first page of a site without
        // a sitemap, so navigation pages get discovered at least once.
        let follow_header = ctx.pages_crawled == 1 && !ctx.has_sitemap;

        let mut checks = Vec::new();
        for anchor in anchors {
            self.handle_anchor(ctx, url, anchor, follow_header, &mut checks, emitter);
        }
        for image in images {
            self.handle_image(ctx, url, image, &mut checks, emitter);
        }

        self.run_checks(ctx, checks, emitter).await;
        Ok(())
    }

    /// Existence check for a queued non-page resource
    async fn check_resource(
        &self,
        ctx: &mut RunContext,
        url: &str,
        emitter: &EventEmitter<CrawlEvent>,
    ) {
        if !ctx.registry.has_referrers(url) || !ctx.checked_resources.insert(url.to_string()) {
            tracing::trace!("Not checking resource {}", url);
            return;
        }

        let kind = if is_image_url(url) {
            CheckKind::Image
        } else {
            CheckKind::Link
        };
        let result = self
            .probe
            .check(url, self.config.crawler.existence_check_timeout())
            .await;
        self.apply_check(
            ctx,
            PendingCheck {
                url: url.to_string(),
                kind,
            },
            result,
            emitter,
        );
    }

    fn handle_anchor(
        &self,
        ctx: &mut RunContext,
        page: &str,
        anchor: ExtractedElement,
        follow_header: bool,
        checks: &mut Vec<PendingCheck>,
        emitter: &EventEmitter<CrawlEvent>,
    ) {
        if is_anchor_only(&anchor.url) {
            return;
        }
        let target = canonicalize(&anchor.url);
        let class = classify_link(&target, &ctx.origin);
        if class == LinkClass::Ignored {
            return;
        }

        let reference = LinkReference::new(&target, page, anchor.text, anchor.context);
        emit(emitter, ctx.register_link(reference));

        if anchor.is_header && !follow_header {
            tracing::trace!("Header link {} registered only", target);
            return;
        }

        match class {
            LinkClass::Internal | LinkClass::InternalResource => match ctx.mode {
                CrawlMode::Full => {
                    ctx.frontier.push(target);
                }
                CrawlMode::Selective => match ctx.selective_action(&target) {
                    SelectiveAction::Selected | SelectiveAction::Trusted => {}
                    SelectiveAction::Check => {
                        queue_check(ctx, checks, target, CheckKind::Link);
                    }
                },
            },
            LinkClass::External => {
                if is_skipped_host(&target, &self.config.validation.skip_hosts) {
                    tracing::trace!("Skipping external link {}", target);
                    return;
                }
                queue_check(ctx, checks, target, CheckKind::Link);
            }
            LinkClass::Ignored => {}
        }
    }

    fn handle_image(
        &self,
        ctx: &mut RunContext,
        page: &str,
        image: ExtractedElement,
        checks: &mut Vec<PendingCheck>,
        emitter: &EventEmitter<CrawlEvent>,
    ) {
        let target = canonicalize(&image.url);
        let candidate = is_broken_image_candidate(&image, &target);

        let reference = LinkReference::new(&target, page, image.text, image.context);
        emit(emitter, ctx.register_link(reference));

        if candidate {
            queue_check(ctx, checks, target, CheckKind::Image);
        }
    }

    async fn run_checks(
        &self,
        ctx: &mut RunContext,
        checks: Vec<PendingCheck>,
        emitter: &EventEmitter<CrawlEvent>,
    ) {
        if checks.is_empty() {
            return;
        }
        tracing::debug!("Running {} existence checks", checks.len());

        let timeout = self.config.crawler.existence_check_timeout();
        let probe = &self.probe;
        let results: Vec<(PendingCheck, ProbeResult)> = stream::iter(checks)
            .map(|check| async move {
                let result = probe.check(&check.url, timeout).await;
                (check, result)
            })
            .buffered(self.config.crawler.check_concurrency.max(1))
            .collect()
            .await;

        for (check, result) in results {
            self.apply_check(ctx, check, result, emitter);
        }
    }

    fn apply_check(
        &self,
        ctx: &mut RunContext,
        check: PendingCheck,
        result: ProbeResult,
        emitter: &EventEmitter<CrawlEvent>,
    ) {
        let fallback = ctx.fallback_page(&check.url);
        let failure = match (check.kind, result.status) {
            (_, Some(status)) if status < 400 => return,
            (CheckKind::Image, Some(status)) => TargetFailure::Image(format!("HTTP {}", status)),
            (CheckKind::Image, None) => TargetFailure::Image(
                result
                    .error
                    .unwrap_or_else(|| "Image failed to load".to_string()),
            ),
            (CheckKind::Link, Some(status)) => TargetFailure::Status(status),
            (CheckKind::Link, None) => TargetFailure::Unreachable(
                result.error.unwrap_or_else(|| "Request failed".to_string()),
            ),
        };

        tracing::debug!("Existence check failed for {}: {:?}", check.url, failure);
        emit(emitter, ctx.fail_target(&check.url, failure, Some(&fallback)));
    }

    fn drain_browser_events(
        &self,
        ctx: &mut RunContext,
        events: Option<&mut UnboundedReceiver<BrowserEvent>>,
        emitter: &EventEmitter<CrawlEvent>,
    ) {
        let Some(events) = events else {
            return;
        };
        while let Ok(event) = events.try_recv() {
            let findings = listener::correlate(ctx, &self.classifier, event);
            emit(emitter, findings);
        }
    }
}

/// An image is re-verified when the DOM says it did not load, or when the
/// driver cannot tell. SVGs legitimately report zero natural width.
fn is_broken_image_candidate(image: &ExtractedElement, url: &str) -> bool {
    match (image.complete, image.natural_width) {
        (Some(false), _) => true,
        (_, Some(0)) => !is_svg(url),
        (None, None) => true,
        _ => false,
    }
}

fn queue_check(ctx: &mut RunContext, checks: &mut Vec<PendingCheck>, url: String, kind: CheckKind) {
    if ctx.is_broken(&url) || !ctx.checked_resources.insert(url.clone()) {
        return;
    }
    checks.push(PendingCheck { url, kind });
}

/// Runs an extraction query; `Ok(None)` means the page is skipped
async fn extract(
    driver: &mut dyn BrowserDriver,
    query: ExtractQuery,
    selector: Option<&str>,
    page: &str,
) -> Result<Option<Vec<ExtractedElement>>, AuditError> {
    match driver.evaluate(query, selector).await {
        Ok(elements) => Ok(Some(elements)),
        Err(e @ (DriverError::InvalidSelector(_) | DriverError::Closed)) => Err(e.into()),
        Err(e) => {
            tracing::warn!("Extraction failed on {}: {}", page, e);
            Ok(None)
        }
    }
}

fn emit(emitter: &EventEmitter<CrawlEvent>, findings: Vec<Finding>) {
    for finding in findings {
        emitter.send(CrawlEvent::from(finding));
    }
}
