//! Browser event correlation
//!
//! Turns asynchronous page events into findings. Failed sub-resource
//! responses are attributed to every registered referrer of the failing URL;
//! console and script errors are attributed to the page being processed.

use super::context::{RunContext, TargetFailure};
use crate::classifier::FailureClassifier;
use crate::driver::{BrowserEvent, ConsoleLevel, ResourceType};
use crate::findings::{ConsoleErrorKind, Finding};
use crate::url::{canonicalize, is_image_url, is_svg};

/// Converts one browser event into zero or more new findings
pub(super) fn correlate(
    ctx: &mut RunContext,
    classifier: &FailureClassifier,
    event: BrowserEvent,
) -> Vec<Finding> {
    match event {
        BrowserEvent::Response {
            url,
            status,
            resource_type,
        } => {
            if status < 400 || !resource_type.is_reportable() || is_svg(&url) {
                return Vec::new();
            }
            let target = canonicalize(&url);
            let failure = if resource_type == ResourceType::Image || is_image_url(&target) {
                TargetFailure::Image(format!("HTTP {}", status))
            } else {
                TargetFailure::Status(status)
            };
            let fallback = ctx.fallback_page(&target);
            ctx.fail_target(&target, failure, Some(&fallback))
        }

        BrowserEvent::RequestFailed {
            url,
            error_text,
            resource_type,
        } => {
            if !resource_type.is_reportable() {
                return Vec::new();
            }
            let message = format!("Failed to load {}: {}", url, error_text);
            if classifier.is_noise(&message) {
                tracing::trace!("Suppressed request failure: {}", message);
                return Vec::new();
            }
            ctx.console_error(&message, ConsoleErrorKind::RequestFailed)
                .into_iter()
                .collect()
        }

        BrowserEvent::Console { level, text } => {
            if level != ConsoleLevel::Error {
                return Vec::new();
            }
            if classifier.is_noise(&text) {
                tracing::trace!("Suppressed console error: {}", text);
                return Vec::new();
            }

            let mut findings: Vec<Finding> = ctx
                .console_error(&text, ConsoleErrorKind::Console)
                .into_iter()
                .collect();

            if let Some(embedded) = classifier.extract_failure(&text) {
                let target = canonicalize(&embedded.url);
                let failure = if is_image_url(&target) {
                    TargetFailure::Image(format!("HTTP {}", embedded.status))
                } else {
                    TargetFailure::Status(embedded.status)
                };
                let fallback = ctx.fallback_page(&target);
                findings.extend(ctx.fail_target(&target, failure, Some(&fallback)));
            }
            findings
        }

        BrowserEvent::PageError { message } => {
            if classifier.is_noise(&message) {
                tracing::trace!("Suppressed page error: {}", message);
                return Vec::new();
            }
            ctx.console_error(&message, ConsoleErrorKind::PageError)
                .into_iter()
                .collect()
        }
    }
}
