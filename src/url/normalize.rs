use crate::UrlError;
use std::cmp::Ordering;
use url::Url;

/// Path extensions that identify non-page resources
///
/// URLs ending in one of these are validated with an existence check and
/// never navigated to.
const RESOURCE_EXTENSIONS: &[&str] = &[
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "rtf", "txt", "csv",
    "zip", "rar", "7z", "gz", "tar", // Images
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "avif", "tif", "tiff",
    // Media
    "mp3", "mp4", "wav", "ogg", "webm", "mov", "avi", "m4a", "m4v", // Styles and scripts
    "css", "js", "mjs", "map", "json", "xml", // Fonts
    "woff", "woff2", "ttf", "otf", "eot",
];

/// Image extensions, used to decide between broken-link and broken-image findings
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "avif", "tif", "tiff",
];

/// Canonicalizes a URL by stripping its fragment
///
/// Fails open: a string that cannot be parsed is returned unchanged, so the
/// caller always gets a usable dedup key.
///
/// # Examples
///
/// ```
/// use site_auditor::url::canonicalize;
///
/// assert_eq!(canonicalize("https://example.com/page#intro"), "https://example.com/page");
/// assert_eq!(canonicalize("not a url"), "not a url");
/// ```
pub fn canonicalize(url_str: &str) -> String {
    match Url::parse(url_str.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Parses and validates the URL a run starts from
///
/// Unlike [`canonicalize`] this is strict: the start URL must be an absolute
/// HTTP(S) URL with a host, otherwise the run cannot begin.
pub fn parse_start_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Returns the origin (scheme + host + port) of a URL as a string
///
/// Returns None for URLs without a tuple origin (e.g. `mailto:`).
pub fn origin_of(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    match url.origin() {
        origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

/// Checks whether a URL belongs to the given origin
///
/// Strict prefix match on the serialized origin, followed by a boundary
/// check so `https://example.com.evil.net` does not match
/// `https://example.com`.
pub fn is_same_origin(url_str: &str, origin: &str) -> bool {
    let origin = origin.trim_end_matches('/');
    match url_str.strip_prefix(origin) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

/// Returns the lowercase file extension of the URL path, if any
fn path_extension(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    let last_segment = url.path_segments()?.last()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Returns true if the URL points at a document, media, style, script or font
/// file rather than a page
pub fn is_non_page_resource(url_str: &str) -> bool {
    path_extension(url_str)
        .map(|ext| RESOURCE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Returns true if the URL path ends in an image extension
pub fn is_image_url(url_str: &str) -> bool {
    path_extension(url_str)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Returns true if the URL path ends in `.svg`
pub fn is_svg(url_str: &str) -> bool {
    path_extension(url_str).as_deref() == Some("svg")
}

/// Returns true if the link only points at an in-page anchor
///
/// Matches raw hrefs such as `#top` as well as resolved URLs whose only
/// content beyond the origin is a fragment (`https://example.com/#top`).
pub fn is_anchor_only(url_str: &str) -> bool {
    let trimmed = url_str.trim();
    if trimmed.starts_with('#') {
        return true;
    }

    match Url::parse(trimmed) {
        Ok(url) => {
            url.fragment().is_some()
                && url.query().is_none()
                && (url.path().is_empty() || url.path() == "/")
        }
        Err(_) => false,
    }
}

/// Returns true for schemes the auditor can check (HTTP and HTTPS)
pub fn is_http_url(url_str: &str) -> bool {
    Url::parse(url_str)
        .map(|u| u.scheme() == "http" || u.scheme() == "https")
        .unwrap_or(false)
}

/// Returns the host of a URL in lowercase
pub fn host_of(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()?
        .host_str()
        .map(|h| h.to_lowercase())
}

/// Number of non-empty path segments in a URL
///
/// `https://example.com/` has depth 0, `https://example.com/a/b` depth 2.
pub fn path_depth(url_str: &str) -> usize {
    match Url::parse(url_str) {
        Ok(url) => url.path().split('/').filter(|s| !s.is_empty()).count(),
        Err(_) => url_str.split('/').filter(|s| !s.is_empty()).count(),
    }
}

/// Orders URLs by path depth ascending, then lexicographically
pub fn compare_by_depth(a: &str, b: &str) -> Ordering {
    path_depth(a).cmp(&path_depth(b)).then_with(|| a.cmp(b))
}

/// Sorts a list of URLs by path depth, then lexicographically
pub fn sort_by_depth(urls: &mut [String]) {
    urls.sort_by(|a, b| compare_by_depth(a, b));
}
