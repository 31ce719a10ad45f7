//! Sitemap XML extraction
//!
//! Documents are first read with a strict XML pass that tracks which
//! wrapper (`<sitemap>` or `<url>`) each `<loc>` belongs to. Malformed
//! documents fall back to a loose `<loc>` scan so a broken sitemap still
//! yields whatever locations it contains.

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::sync::OnceLock;

/// Locations found in one sitemap document
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Locations {
    /// `<sitemap><loc>` entries of an index
    sitemaps: Vec<String>,
    /// `<url><loc>` entries of a urlset
    pages: Vec<String>,
}

fn loc_regex() -> Option<&'static Regex> {
    static LOC: OnceLock<Option<Regex>> = OnceLock::new();
    LOC.get_or_init(|| {
        Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?loc\s*>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</(?:[a-z0-9_-]+:)?loc\s*>").ok()
    })
    .as_ref()
}

fn index_regex() -> Option<&'static Regex> {
    static INDEX: OnceLock<Option<Regex>> = OnceLock::new();
    INDEX
        .get_or_init(|| Regex::new(r"(?i)<(?:[a-z0-9_-]+:)?sitemapindex[\s>]").ok())
        .as_ref()
}

/// True if the document is a sitemap index
pub fn is_index(xml: &str) -> bool {
    match index_regex() {
        Some(re) => re.is_match(xml),
        None => xml.contains("<sitemapindex"),
    }
}

/// Child sitemap locations of a sitemap index
pub fn extract_child_sitemaps(xml: &str) -> Vec<String> {
    match read_locations(xml) {
        Ok(locations) => locations.sitemaps,
        Err(e) => {
            tracing::debug!("Malformed sitemap XML ({}), using loose extraction", e);
            loose_locations(xml)
                .into_iter()
                .filter(|loc| looks_like_sitemap(loc))
                .collect()
        }
    }
}

/// Page locations of a urlset
///
/// On the loose path, entries that look like sitemap files are dropped so an
/// unparseable index is not mistaken for a list of pages.
pub fn extract_page_urls(xml: &str) -> Vec<String> {
    match read_locations(xml) {
        Ok(locations) => locations.pages,
        Err(e) => {
            tracing::debug!("Malformed sitemap XML ({}), using loose extraction", e);
            loose_locations(xml)
                .into_iter()
                .filter(|loc| !looks_like_sitemap(loc))
                .collect()
        }
    }
}

/// Heuristic for sitemap file URLs: `.xml`/`.xml.gz` or a "sitemap" keyword
pub fn looks_like_sitemap(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    path.ends_with(".xml") || path.ends_with(".xml.gz") || lower.contains("sitemap")
}

fn read_locations(xml: &str) -> Result<Locations, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut locations = Locations::default();
    let mut wrapper: Option<Wrapper> = None;
    let mut in_loc = false;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sitemap" => wrapper = Some(Wrapper::Sitemap),
                b"url" => wrapper = Some(Wrapper::Url),
                b"loc" => {
                    in_loc = true;
                    text.clear();
                }
                _ => {}
            },
            Event::Text(t) if in_loc => text.push_str(&t.unescape()?),
            Event::CData(c) if in_loc => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"loc" => {
                    in_loc = false;
                    let loc = text.trim().to_string();
                    if !loc.is_empty() {
                        match wrapper {
                            Some(Wrapper::Sitemap) => locations.sitemaps.push(loc),
                            Some(Wrapper::Url) => locations.pages.push(loc),
                            None => {}
                        }
                    }
                }
                b"sitemap" | b"url" => wrapper = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(locations)
}

#[derive(Debug, Clone, Copy)]
enum Wrapper {
    Sitemap,
    Url,
}

fn loose_locations(xml: &str) -> Vec<String> {
    let Some(re) = loc_regex() else {
        return Vec::new();
    };
    re.captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .map(|m| unescape_entities(m.as_str().trim()))
        .filter(|loc| !loc.is_empty())
        .collect()
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
