//! HTML extraction for the static page driver
//!
//! Evaluates the link/image extraction queries against fetched HTML:
//! - `<a href>` targets, resolved against the page URL
//! - `<img src>` sources with their alt text
//! - a short DOM context and header/navigation flag per element

use super::{DriverError, ExtractQuery, ExtractedElement};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Ancestors included in an element's DOM context
const CONTEXT_DEPTH: usize = 3;

/// Runs an extraction query over an HTML document
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that does not resolve to HTTP(S)
///
/// # Arguments
///
/// * `html` - The HTML content
/// * `base_url` - The page URL for resolving relative links
/// * `query` - Anchors or images
/// * `scope` - Optional CSS selector restricting the search to matching subtrees
///
/// # Example
///
/// ```
/// use site_auditor::driver::{extract_elements, ExtractQuery};
/// use url::Url;
///
/// let html = r#"<html><body><nav><a href="/about">About</a></nav></body></html>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let anchors = extract_elements(html, &base, ExtractQuery::Anchors, None).unwrap();
/// assert_eq!(anchors[0].url, "https://example.com/about");
/// assert!(anchors[0].is_header);
/// ```
pub fn extract_elements(
    html: &str,
    base_url: &Url,
    query: ExtractQuery,
    scope: Option<&str>,
) -> Result<Vec<ExtractedElement>, DriverError> {
    let document = Html::parse_document(html);

    let target_css = match query {
        ExtractQuery::Anchors => "a[href]",
        ExtractQuery::Images => "img[src]",
    };
    let target = Selector::parse(target_css)
        .map_err(|e| DriverError::Evaluation(format!("{:?}", e)))?;

    let candidates: Vec<ElementRef> = match scope {
        Some(scope_css) => {
            let scope_selector = Selector::parse(scope_css)
                .map_err(|e| DriverError::InvalidSelector(format!("{}: {:?}", scope_css, e)))?;

            // Nested scope matches would otherwise yield the same element twice
            let mut seen = HashSet::new();
            document
                .select(&scope_selector)
                .flat_map(|root| root.select(&target))
                .filter(|el| seen.insert(el.id()))
                .collect()
        }
        None => document.select(&target).collect(),
    };

    let elements = candidates
        .into_iter()
        .filter_map(|el| match query {
            ExtractQuery::Anchors => anchor_element(el, base_url),
            ExtractQuery::Images => image_element(el, base_url),
        })
        .collect();

    Ok(elements)
}

fn anchor_element(el: ElementRef, base_url: &Url) -> Option<ExtractedElement> {
    let href = el.value().attr("href")?;
    let url = resolve_link(href, base_url)?;

    let mut text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
    if text.is_empty() {
        text = el
            .value()
            .attr("aria-label")
            .or_else(|| el.value().attr("title"))
            .unwrap_or_default()
            .trim()
            .to_string();
    }

    Some(ExtractedElement {
        url,
        text,
        context: dom_context(el),
        is_header: in_header(el),
        complete: None,
        natural_width: None,
    })
}

fn image_element(el: ElementRef, base_url: &Url) -> Option<ExtractedElement> {
    let src = el.value().attr("src")?;
    let url = resolve_link(src, base_url)?;

    Some(ExtractedElement {
        url,
        text: el.value().attr("alt").unwrap_or_default().trim().to_string(),
        context: dom_context(el),
        is_header: in_header(el),
        // Static HTML cannot observe load state
        complete: None,
        natural_width: None,
    })
}

/// Resolves an href/src to an absolute HTTP(S) URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Describes where an element sits, e.g. `header > nav#main > ul`
fn dom_context(el: ElementRef) -> String {
    let mut parts: Vec<String> = el
        .ancestors()
        .filter_map(ElementRef::wrap)
        .filter(|anc| !matches!(anc.value().name(), "html" | "body"))
        .take(CONTEXT_DEPTH)
        .map(|anc| match anc.value().id() {
            Some(id) => format!("{}#{}", anc.value().name(), id),
            None => anc.value().name().to_string(),
        })
        .collect();
    parts.reverse();

    if parts.is_empty() {
        "body".to_string()
    } else {
        parts.join(" > ")
    }
}

/// True if the element is inside `<header>`, `<nav>` or a navigation landmark
fn in_header(el: ElementRef) -> bool {
    el.ancestors().filter_map(ElementRef::wrap).any(|anc| {
        let value = anc.value();
        matches!(value.name(), "header" | "nav")
            || matches!(value.attr("role"), Some("navigation") | Some("banner"))
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
