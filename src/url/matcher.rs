use super::normalize::host_of;

/// Checks if a host matches a skip-list pattern
///
/// Two kinds of patterns are supported:
/// 1. Exact: "x.com" matches only "x.com"
/// 2. Wildcard: "*.facebook.com" matches "facebook.com" and any subdomain
///    of it ("www.facebook.com", "m.facebook.com")
///
/// Both sides are expected to be lowercase.
///
/// # Examples
///
/// ```
/// use site_auditor::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.facebook.com", "www.facebook.com"));
/// assert!(matches_wildcard("*.facebook.com", "facebook.com"));
/// assert!(!matches_wildcard("*.facebook.com", "notfacebook.com"));
/// assert!(matches_wildcard("x.com", "x.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Returns true if the URL's host is covered by any of the skip patterns
///
/// Used to leave social/media platforms that block automated probing out of
/// external link validation.
pub fn is_skipped_host(url_str: &str, patterns: &[String]) -> bool {
    match host_of(url_str) {
        Some(host) => patterns
            .iter()
            .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &host)),
        None => false,
    }
}
