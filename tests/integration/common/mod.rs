//! Shared fixtures for the integration tests
//!
//! A scripted browser driver serving an in-memory site, and a probe with
//! canned answers. Neither touches the network.

#![allow(dead_code)]

use async_trait::async_trait;
use site_auditor::driver::{
    BrowserDriver, BrowserEvent, DriverError, DriverLauncher, ExtractQuery, ExtractedElement,
    NavigationResponse,
};
use site_auditor::probe::{ExistenceCheck, ProbeResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const ORIGIN: &str = "https://site.test";

/// Scope selectors starting with this are rejected as invalid
pub const INVALID_SCOPE: &str = "!";

pub fn page_url(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

/// One scripted page
#[derive(Debug, Clone)]
pub struct FakePage {
    pub status: u16,
    /// Navigation error message; the page never answers
    pub failure: Option<String>,
    /// The browser session dies while loading this page
    pub crash: bool,
    pub anchors: Vec<ExtractedElement>,
    pub images: Vec<ExtractedElement>,
    /// Published while the page loads
    pub events: Vec<BrowserEvent>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            status: 200,
            failure: None,
            crash: false,
            anchors: Vec::new(),
            images: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn unreachable(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn crash() -> Self {
        Self {
            crash: true,
            ..Default::default()
        }
    }

    pub fn link(mut self, href: &str, text: &str) -> Self {
        self.anchors.push(anchor(href, text, "main", false));
        self
    }

    pub fn link_in(mut self, href: &str, text: &str, context: &str) -> Self {
        self.anchors.push(anchor(href, text, context, false));
        self
    }

    pub fn header_link(mut self, href: &str, text: &str) -> Self {
        self.anchors.push(anchor(href, text, "nav", true));
        self
    }

    pub fn image(mut self, src: &str, complete: Option<bool>, natural_width: Option<u32>) -> Self {
        self.images.push(ExtractedElement {
            url: absolute(src),
            text: String::new(),
            context: "main".to_string(),
            is_header: false,
            complete,
            natural_width,
        });
        self
    }

    pub fn event(mut self, event: BrowserEvent) -> Self {
        self.events.push(event);
        self
    }
}

fn absolute(href: &str) -> String {
    if href.starts_with('/') {
        page_url(href)
    } else {
        href.to_string()
    }
}

fn anchor(href: &str, text: &str, context: &str, is_header: bool) -> ExtractedElement {
    ExtractedElement {
        url: absolute(href),
        text: text.to_string(),
        context: context.to_string(),
        is_header,
        complete: None,
        natural_width: None,
    }
}

/// An in-memory site; unknown URLs answer 404
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, page: FakePage) -> Self {
        self.pages.insert(absolute(path), page);
        self
    }
}

/// What the fake browser sessions did, shared with the test
#[derive(Debug, Default)]
pub struct DriverLog {
    pub visits: Mutex<Vec<String>>,
    pub launches: AtomicUsize,
    pub closed: AtomicBool,
}

impl DriverLog {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct FakeDriver {
    site: Arc<FakeSite>,
    log: Arc<DriverLog>,
    delay: Option<Duration>,
    current: Option<String>,
    events_tx: UnboundedSender<BrowserEvent>,
    events_rx: Option<UnboundedReceiver<BrowserEvent>>,
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(
        &mut self,
        url: &str,
        _timeout: Duration,
    ) -> Result<NavigationResponse, DriverError> {
        if self.log.was_closed() {
            return Err(DriverError::Closed);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.log.visits.lock().unwrap().push(url.to_string());
        self.current = None;

        let page = self.site.pages.get(url).cloned().unwrap_or_else(|| FakePage::status(404));
        if page.crash {
            return Err(DriverError::Closed);
        }
        if let Some(message) = page.failure {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message,
            });
        }
        for event in page.events {
            let _ = self.events_tx.send(event);
        }
        self.current = Some(url.to_string());

        Ok(NavigationResponse {
            status: Some(page.status),
            final_url: url.to_string(),
        })
    }

    async fn evaluate(
        &mut self,
        query: ExtractQuery,
        scope: Option<&str>,
    ) -> Result<Vec<ExtractedElement>, DriverError> {
        if let Some(scope) = scope.filter(|s| s.starts_with(INVALID_SCOPE)) {
            return Err(DriverError::InvalidSelector(scope.to_string()));
        }
        let Some(page) = self.current.as_ref().and_then(|url| self.site.pages.get(url)) else {
            return Ok(Vec::new());
        };

        let elements = match query {
            ExtractQuery::Anchors => &page.anchors,
            ExtractQuery::Images => &page.images,
        };
        // Scopes match on the element context
        Ok(elements
            .iter()
            .filter(|e| scope.map_or(true, |s| e.context == s))
            .cloned()
            .collect())
    }

    fn subscribe(&mut self) -> Option<UnboundedReceiver<BrowserEvent>> {
        self.events_rx.take()
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.log.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeLauncher {
    site: Arc<FakeSite>,
    log: Arc<DriverLog>,
    delay: Option<Duration>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(DriverLog::default()),
            delay: None,
        }
    }

    /// Every navigation sleeps this long first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn log(&self) -> Arc<DriverLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl DriverLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, DriverError> {
        self.log.launches.fetch_add(1, Ordering::SeqCst);
        self.log.closed.store(false, Ordering::SeqCst);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Box::new(FakeDriver {
            site: Arc::clone(&self.site),
            log: Arc::clone(&self.log),
            delay: self.delay,
            current: None,
            events_tx,
            events_rx: Some(events_rx),
        }))
    }
}

/// Probe with canned answers; anything not listed answers 200
#[derive(Default)]
pub struct FakeProbe {
    answers: HashMap<String, ProbeResult>,
    checked: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, url: &str, result: ProbeResult) -> Self {
        self.answers.insert(absolute(url), result);
        self
    }

    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExistenceCheck for FakeProbe {
    async fn check(&self, url: &str, _timeout: Duration) -> ProbeResult {
        self.checked.lock().unwrap().push(url.to_string());
        self.answers
            .get(url)
            .cloned()
            .unwrap_or_else(|| ProbeResult::from_status(200))
    }
}
