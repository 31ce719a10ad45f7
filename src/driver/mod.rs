//! Browser automation contract
//!
//! The engines never talk to a browser directly. They consume a
//! [`BrowserDriver`] that can navigate, evaluate link/image extraction
//! queries against the rendered DOM, and report asynchronous page events
//! (failed sub-resources, console output, uncaught script errors).
//!
//! [`StaticPageDriver`] is a plain HTTP + HTML implementation used by the
//! command-line tool; a headless-browser backed driver plugs in through the
//! same traits.

mod extract;
mod static_page;

pub use extract::extract_elements;
pub use static_page::{build_http_client, StaticLauncher, StaticPageDriver};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

/// Errors raised by a browser driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out")]
    Timeout { url: String },

    #[error("DOM evaluation failed: {0}")]
    Evaluation(String),

    #[error("Invalid scope selector: {0}")]
    InvalidSelector(String),

    #[error("Browser session is closed")]
    Closed,
}

/// Outcome of a navigation that produced a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResponse {
    /// Final HTTP status of the main document, when known
    pub status: Option<u16>,

    /// URL after redirects
    pub final_url: String,
}

/// What to extract from the rendered DOM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractQuery {
    /// `<a href>` elements
    Anchors,
    /// `<img>` elements
    Images,
}

/// One element returned by an extraction query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedElement {
    /// Absolute href (anchors) or src (images)
    pub url: String,

    /// Anchor text, or alt text for images
    pub text: String,

    /// Short description of the element's position, e.g. `nav > ul > li`
    pub context: String,

    /// True when the element sits inside the site header or navigation
    pub is_header: bool,

    /// Image `complete` flag, when the driver can observe it
    pub complete: Option<bool>,

    /// Image `naturalWidth`, when the driver can observe it
    pub natural_width: Option<u32>,
}

/// Resource type of a sub-resource request, as reported by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Fetch,
    Other,
}

impl ResourceType {
    /// Resource types whose failures are reported from network events
    ///
    /// Documents are handled by navigation itself; styles, fonts, scripts and
    /// media fail noisily for reasons unrelated to the audited links.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::Image | Self::Xhr | Self::Fetch | Self::Other
        )
    }
}

impl From<&str> for ResourceType {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "document" => ResourceType::Document,
            "stylesheet" => ResourceType::Stylesheet,
            "image" => ResourceType::Image,
            "media" => ResourceType::Media,
            "font" => ResourceType::Font,
            "script" => ResourceType::Script,
            "xhr" => ResourceType::Xhr,
            "fetch" => ResourceType::Fetch,
            _ => ResourceType::Other,
        }
    }
}

/// Severity of a console message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warning,
    Error,
    Debug,
    Other,
}

impl From<&str> for ConsoleLevel {
    fn from(s: &str) -> Self {
        match s {
            "log" => ConsoleLevel::Log,
            "info" => ConsoleLevel::Info,
            "warning" | "warn" => ConsoleLevel::Warning,
            "error" => ConsoleLevel::Error,
            "debug" => ConsoleLevel::Debug,
            _ => ConsoleLevel::Other,
        }
    }
}

/// Asynchronous page event pushed by the driver
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserEvent {
    /// A sub-resource response arrived
    Response {
        url: String,
        status: u16,
        resource_type: ResourceType,
    },
    /// A sub-resource request failed without a response
    RequestFailed {
        url: String,
        error_text: String,
        resource_type: ResourceType,
    },
    /// A console message was logged
    Console { level: ConsoleLevel, text: String },
    /// An uncaught script error occurred
    PageError { message: String },
}

/// A browser session owned by exactly one run
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigates the page, waiting at most `timeout`
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<NavigationResponse, DriverError>;

    /// Runs an extraction query against the current page
    ///
    /// When `scope` is given only elements inside the subtree(s) matching
    /// that selector are returned.
    async fn evaluate(
        &mut self,
        query: ExtractQuery,
        scope: Option<&str>,
    ) -> Result<Vec<ExtractedElement>, DriverError>;

    /// Takes the page event stream; subsequent calls return None
    fn subscribe(&mut self) -> Option<UnboundedReceiver<BrowserEvent>>;

    /// Tears the session down
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Starts browser sessions, one per run
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, DriverError>;
}
