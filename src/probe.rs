//! Existence checks
//!
//! A cheap status probe used in place of a full page render for external
//! links, non-page resources and image re-verification.

use crate::config::UserAgentConfig;
use crate::driver::build_http_client;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Outcome of an existence check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// HTTP status, if a response arrived
    pub status: Option<u16>,

    /// True for any status below 400
    pub ok: bool,

    /// Network error description when no response arrived
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn from_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ok: status < 400,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: None,
            ok: false,
            error: Some(error.into()),
        }
    }

    /// True when the target answered with an error status
    pub fn is_broken(&self) -> bool {
        matches!(self.status, Some(s) if s >= 400)
    }
}

/// Lightweight status probe
#[async_trait]
pub trait ExistenceCheck: Send + Sync {
    /// Checks a URL without rendering it; never fails, errors are folded
    /// into the result
    async fn check(&self, url: &str, timeout: Duration) -> ProbeResult;
}

/// HEAD-based probe over reqwest
///
/// Servers that reject HEAD (405/501) are retried once with GET.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, 10)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get_status(&self, url: &str, timeout: Duration) -> ProbeResult {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => ProbeResult::from_status(response.status().as_u16()),
            Err(e) => ProbeResult::failed(describe_error(&e)),
        }
    }
}

#[async_trait]
impl ExistenceCheck for HttpProbe {
    async fn check(&self, url: &str, timeout: Duration) -> ProbeResult {
        let response = match self.client.head(url).timeout(timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("HEAD {} failed: {}", url, e);
                return ProbeResult::failed(describe_error(&e));
            }
        };

        let status = response.status();
        if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED {
            tracing::trace!("HEAD rejected by {} ({}), retrying with GET", url, status);
            return self.get_status(url, timeout).await;
        }

        ProbeResult::from_status(status.as_u16())
    }
}

fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else {
        error.to_string()
    }
}
