//! Failure classifier
//!
//! Separates genuine breakage from error classes that are known to be noise
//! (CORS rejections, aborted or client-blocked requests, mixed-content and
//! CSP warnings). Anything matching a noise pattern is dropped before a
//! console or network finding is produced.

use crate::ConfigError;
use regex::{Regex, RegexSet, RegexSetBuilder};

/// Built-in noise patterns, checked case-insensitively
pub const NOISE_PATTERNS: &[&str] = &[
    r"\bCORS\b",
    r"cross-origin",
    r"Access-Control-Allow-Origin",
    r"net::ERR_ABORTED",
    r"net::ERR_BLOCKED_BY_CLIENT",
    r"net::ERR_BLOCKED_BY_RESPONSE",
    r"net::ERR_BLOCKED_BY_ORB",
    r"net::ERR_FAILED\b",
    r"NS_BINDING_ABORTED",
    r"\baborted\b",
    r"Mixed Content",
    r"Content Security Policy",
    r"SecurityError",
    r"was blocked",
];

/// Pattern-based noise filter
#[derive(Debug, Clone)]
pub struct FailureClassifier {
    noise: RegexSet,
    embedded_url: Regex,
    embedded_status: Regex,
}

/// A URL and HTTP status recovered from console text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFailure {
    pub url: String,
    pub status: u16,
}

impl FailureClassifier {
    /// Builds a classifier from the built-in patterns plus `extra` patterns
    pub fn new(extra: &[String]) -> Result<Self, ConfigError> {
        let patterns = NOISE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .chain(extra.iter().cloned());

        let noise = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        let embedded_url = Regex::new(r#"https?://[^\s'"<>()]+"#)
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        let embedded_status = Regex::new(r"\b([45]\d{2})\b")
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            noise,
            embedded_url,
            embedded_status,
        })
    }

    /// Returns true if the message matches a noise pattern and must be dropped
    pub fn is_noise(&self, message: &str) -> bool {
        self.noise.is_match(message)
    }

    /// Extracts a `URL ... status` pair from console text
    ///
    /// Browser consoles report failed loads as e.g.
    /// `GET https://example.com/a.png 404 (Not Found)`. The status is looked
    /// up outside the URL so digits inside the path are not mistaken for it.
    pub fn extract_failure(&self, message: &str) -> Option<EmbeddedFailure> {
        let url_match = self.embedded_url.find(message)?;
        let url = url_match
            .as_str()
            .trim_end_matches(['.', ',', ';', ':'])
            .to_string();

        let remainder = format!(
            "{} {}",
            &message[..url_match.start()],
            &message[url_match.end()..]
        );
        let status = self
            .embedded_status
            .captures(&remainder)?
            .get(1)?
            .as_str()
            .parse::<u16>()
            .ok()?;

        Some(EmbeddedFailure { url, status })
    }
}
