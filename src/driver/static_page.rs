//! Static page driver
//!
//! This module implements [`BrowserDriver`] on top of plain HTTP:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to "navigate" and capture the page HTML
//! - Evaluating extraction queries over the captured HTML
//!
//! Scripts are not executed, so no console or network events are ever
//! emitted and image load state is reported as unknown.

use super::{
    extract_elements, BrowserDriver, BrowserEvent, DriverError, DriverLauncher, ExtractQuery,
    ExtractedElement, NavigationResponse,
};
use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// TLS certificate errors are tolerated so that sites with self-signed
/// certificates can still be audited.
///
/// # Example
///
/// ```no_run
/// use site_auditor::config::UserAgentConfig;
/// use site_auditor::driver::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), 10).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    max_redirects: usize,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(max_redirects))
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// The page currently loaded in the driver
#[derive(Debug)]
struct LoadedPage {
    url: Url,
    html: String,
}

/// HTTP-backed driver
pub struct StaticPageDriver {
    client: Client,
    current: Option<LoadedPage>,
    events_rx: Option<UnboundedReceiver<BrowserEvent>>,
    closed: bool,
}

impl StaticPageDriver {
    pub fn new(client: Client) -> Self {
        // Nothing is ever published: the sender is dropped right away and
        // subscribers see an already finished stream.
        let (_tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            current: None,
            events_rx: Some(rx),
            closed: false,
        }
    }
}

#[async_trait]
impl BrowserDriver for StaticPageDriver {
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<NavigationResponse, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.current = None;

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if status < 400 && (content_type.is_empty() || content_type.contains("html")) {
            let html = response
                .text()
                .await
                .map_err(|e| classify_error(url, e))?;
            self.current = Some(LoadedPage {
                url: final_url.clone(),
                html,
            });
        } else {
            tracing::trace!("Not capturing body of {} ({}, {})", url, status, content_type);
        }

        Ok(NavigationResponse {
            status: Some(status),
            final_url: final_url.to_string(),
        })
    }

    async fn evaluate(
        &mut self,
        query: ExtractQuery,
        scope: Option<&str>,
    ) -> Result<Vec<ExtractedElement>, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }

        match &self.current {
            Some(page) => extract_elements(&page.html, &page.url, query, scope),
            None => Ok(Vec::new()),
        }
    }

    fn subscribe(&mut self) -> Option<UnboundedReceiver<BrowserEvent>> {
        self.events_rx.take()
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}

/// Maps reqwest failures to driver errors
fn classify_error(url: &str, error: reqwest::Error) -> DriverError {
    if error.is_timeout() {
        DriverError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        DriverError::Navigation {
            url: url.to_string(),
            message: format!("Connection failed: {}", error),
        }
    } else if error.is_redirect() {
        DriverError::Navigation {
            url: url.to_string(),
            message: "Too many redirects".to_string(),
        }
    } else {
        DriverError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Launches [`StaticPageDriver`] sessions sharing one HTTP client
pub struct StaticLauncher {
    client: Client,
}

impl StaticLauncher {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, 10)?,
        })
    }
}

#[async_trait]
impl DriverLauncher for StaticLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, DriverError> {
        Ok(Box::new(StaticPageDriver::new(self.client.clone())))
    }
}
