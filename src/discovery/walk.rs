use super::{status, DiscoveryResult};
use crate::config::CrawlerConfig;
use crate::crawler::Frontier;
use crate::driver::{BrowserDriver, DriverError, ExtractQuery};
use crate::events::{DiscoveryEvent, DiscoveryPhase, EventEmitter};
use crate::url::{
    canonicalize, is_anchor_only, is_non_page_resource, is_same_origin, origin_of, sort_by_depth,
};
use crate::AuditError;
use std::collections::HashSet;

/// Breadth-first walk from `start`, bounded by `max-discovery-pages`
///
/// Each URL is queued at most once. A page that fails to load or answers
/// with an error status is counted as scanned and contributes no links.
/// A status event follows every scanned page. Losing the browser session
/// aborts the walk.
pub(super) async fn walk(
    config: &CrawlerConfig,
    start: &str,
    selector: Option<&str>,
    driver: &mut dyn BrowserDriver,
    emitter: &EventEmitter<DiscoveryEvent>,
) -> Result<DiscoveryResult, AuditError> {
    let origin = origin_of(start).unwrap_or_default();
    let mut frontier = Frontier::seeded([start]);
    let mut discovered: HashSet<String> = HashSet::from([start.to_string()]);
    let mut links = vec![start.to_string()];
    let mut pages_scanned = 0;

    while let Some(url) = frontier.pop() {
        if emitter.is_closed() {
            tracing::info!("Discovery cancelled after {} pages", pages_scanned);
            return Err(AuditError::Cancelled);
        }

        if pages_scanned >= config.max_discovery_pages {
            tracing::warn!(
                "Page cap of {} reached, {} URLs left unscanned",
                config.max_discovery_pages,
                frontier.len() + 1
            );
            break;
        }

        frontier.mark_visited(&url);
        pages_scanned += 1;

        let anchors = match driver.navigate(&url, config.discovery_timeout()).await {
            Ok(response) if response.status.is_some_and(|s| s >= 400) => {
                tracing::debug!("Skipping {} (status {:?})", url, response.status);
                Vec::new()
            }
            Ok(_) => match driver.evaluate(ExtractQuery::Anchors, selector).await {
                Ok(anchors) => anchors,
                Err(e @ (DriverError::InvalidSelector(_) | DriverError::Closed)) => {
                    return Err(e.into())
                }
                Err(e) => {
                    tracing::debug!("Link extraction failed on {}: {}", url, e);
                    Vec::new()
                }
            },
            Err(DriverError::Closed) => return Err(DriverError::Closed.into()),
            Err(e) => {
                tracing::debug!("Could not load {}: {}", url, e);
                Vec::new()
            }
        };

        let before = links.len();
        for anchor in anchors {
            if is_anchor_only(&anchor.url) {
                continue;
            }
            let canonical = canonicalize(&anchor.url);
            if !is_same_origin(&canonical, &origin) || is_non_page_resource(&canonical) {
                continue;
            }
            if discovered.insert(canonical.clone()) {
                frontier.push(canonical.clone());
                links.push(canonical);
            }
        }

        let found = links.len() - before;
        if found > 0 {
            tracing::debug!("{} new links on {}", found, url);
        }
        emitter.send(status(
            DiscoveryPhase::Crawling,
            format!("Scanned {}, {} new links", url, found),
            links.len(),
            0,
            pages_scanned,
            Some(url.clone()),
        ));
    }

    sort_by_depth(&mut links);
    Ok(DiscoveryResult {
        total: links.len(),
        from_sitemap: 0,
        from_pages: links.len(),
        pages_scanned,
        links,
    })
}
