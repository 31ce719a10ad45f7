//! Audit session
//!
//! Drives the discover → preview → crawl cycle. A session is in exactly one
//! [`Phase`] at a time; every run, however it ends, leaves the session idle
//! (or in preview after a successful discovery) with its browser session
//! closed.

use crate::config::{validate, Config};
use crate::crawler::{CrawlEngine, CrawlRequest};
use crate::discovery::{DiscoveryEngine, DiscoveryRequest, DiscoveryResult};
use crate::driver::{BrowserDriver, DriverLauncher};
use crate::events::{CrawlDone, CrawlEvent, DiscoveryEvent, EventEmitter};
use crate::probe::ExistenceCheck;
use crate::sitemap::SitemapReader;
use crate::url::parse_start_url;
use crate::AuditError;
use std::fmt;
use std::sync::Arc;

/// Run state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Discovering,
    /// Discovery finished, waiting for the caller to choose pages
    Preview,
    Crawling,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Discovering => "discovering",
            Phase::Preview => "preview",
            Phase::Crawling => "crawling",
        };
        f.write_str(name)
    }
}

/// One auditor instance: a phase, the engines and a way to start browsers
pub struct AuditSession {
    launcher: Arc<dyn DriverLauncher>,
    discovery: DiscoveryEngine,
    crawler: CrawlEngine,
    phase: Phase,
    preview: Option<DiscoveryResult>,
}

impl AuditSession {
    /// Creates an idle session
    ///
    /// Fails if the configuration does not validate or the sitemap client
    /// cannot be built.
    pub fn new(
        config: Config,
        launcher: Arc<dyn DriverLauncher>,
        probe: Arc<dyn ExistenceCheck>,
    ) -> Result<Self, AuditError> {
        validate(&config)?;
        let sitemap = SitemapReader::new(&config)?;
        let config = Arc::new(config);

        Ok(Self {
            launcher,
            discovery: DiscoveryEngine::new(Arc::clone(&config), sitemap),
            crawler: CrawlEngine::new(config, probe)?,
            phase: Phase::Idle,
            preview: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Result of the last discovery while in preview
    pub fn preview(&self) -> Option<&DiscoveryResult> {
        self.preview.as_ref()
    }

    /// Discovers pages and enters preview
    ///
    /// Allowed from idle, or from preview to start over. On failure or
    /// cancellation an `error` event is emitted and the session returns to
    /// idle.
    pub async fn discover(
        &mut self,
        request: &DiscoveryRequest,
        emitter: &EventEmitter<DiscoveryEvent>,
    ) -> Result<DiscoveryResult, AuditError> {
        if !matches!(self.phase, Phase::Idle | Phase::Preview) {
            return Err(self.invalid(Phase::Discovering));
        }
        self.phase = Phase::Discovering;
        self.preview = None;
        tracing::info!("Discovering pages from {}", request.start_url);

        let outcome = self.run_discovery(request, emitter).await;
        let result = match outcome {
            Ok(result) => {
                self.phase = Phase::Preview;
                self.preview = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                tracing::error!("Discovery failed: {}", e);
                self.phase = Phase::Idle;
                emitter.send(DiscoveryEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        };

        emitter.close();
        result
    }

    async fn run_discovery(
        &self,
        request: &DiscoveryRequest,
        emitter: &EventEmitter<DiscoveryEvent>,
    ) -> Result<DiscoveryResult, AuditError> {
        check_start_url(&request.start_url)?;

        if let Some(sitemap_url) = &request.sitemap_url {
            return self
                .discovery
                .from_sitemap(request, sitemap_url, emitter)
                .await;
        }

        let mut driver = self.launch().await?;
        let result = self
            .discovery
            .from_pages(request, driver.as_mut(), emitter)
            .await;
        close_driver(driver.as_mut()).await;
        result
    }

    /// Leaves preview without crawling
    pub fn cancel_preview(&mut self) -> Result<(), AuditError> {
        if self.phase != Phase::Preview {
            return Err(self.invalid(Phase::Idle));
        }
        self.phase = Phase::Idle;
        self.preview = None;
        Ok(())
    }

    /// Crawls the site
    ///
    /// Allowed from preview (usually with a selection from the preview) or
    /// directly from idle. The session is idle again when this returns, and
    /// the browser session has been closed whatever the outcome.
    pub async fn crawl(
        &mut self,
        request: &CrawlRequest,
        emitter: &EventEmitter<CrawlEvent>,
    ) -> Result<CrawlDone, AuditError> {
        if !matches!(self.phase, Phase::Idle | Phase::Preview) {
            return Err(self.invalid(Phase::Crawling));
        }
        self.phase = Phase::Crawling;
        tracing::info!("Crawling {}", request.start_url);

        let outcome = self.run_crawl(request, emitter).await;

        self.phase = Phase::Idle;
        self.preview = None;

        if let Err(e) = &outcome {
            tracing::error!("Crawl failed: {}", e);
            emitter.send(CrawlEvent::Error {
                message: e.to_string(),
            });
        }
        emitter.close();
        outcome
    }

    async fn run_crawl(
        &self,
        request: &CrawlRequest,
        emitter: &EventEmitter<CrawlEvent>,
    ) -> Result<CrawlDone, AuditError> {
        check_start_url(&request.start_url)?;

        let mut driver = self.launch().await?;
        let result = self.crawler.run(request, driver.as_mut(), emitter).await;
        close_driver(driver.as_mut()).await;
        result
    }

    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, AuditError> {
        self.launcher
            .launch()
            .await
            .map_err(|e| AuditError::BrowserLaunch(e.to_string()))
    }

    fn invalid(&self, to: Phase) -> AuditError {
        AuditError::InvalidTransition {
            from: self.phase,
            to,
        }
    }
}

fn check_start_url(raw: &str) -> Result<(), AuditError> {
    parse_start_url(raw)
        .map(|_| ())
        .map_err(|e| AuditError::InvalidStartUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Teardown never fails a run
async fn close_driver(driver: &mut dyn BrowserDriver) {
    if let Err(e) = driver.close().await {
        tracing::warn!("Failed to close browser session: {}", e);
    }
}
