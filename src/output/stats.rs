//! Console statistics
//!
//! Human-readable end-of-run statistics. The command-line tool prints these
//! to stderr so stdout stays reserved for the event stream.

use crate::discovery::DiscoveryResult;
use crate::output::summary::CrawlSummary;

/// Renders crawl statistics as plain text
pub fn format_statistics(summary: &CrawlSummary) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Statistics ===\n\n");
    out.push_str(&format!("Site: {}\n", summary.start_url));
    out.push_str(&format!("  Pages crawled: {}\n", summary.pages_crawled));
    out.push_str(&format!("  Broken links: {}\n", summary.broken_links));
    out.push_str(&format!("  Broken images: {}\n", summary.broken_images));
    out.push_str(&format!("  Console errors: {}\n", summary.console_errors));
    out.push_str(&format!(
        "  Navigation issues: {}\n",
        summary.navigation_issues
    ));
    out.push('\n');

    if !summary.status_breakdown.is_empty() {
        out.push_str("Broken Links by Status:\n");
        for (status, count) in &summary.status_breakdown {
            out.push_str(&format!("  {}: {}\n", status, count));
        }
        out.push('\n');
    }

    if !summary.top_pages.is_empty() {
        out.push_str("Most Affected Pages:\n");
        for (page, count) in summary.top_pages.iter().take(10) {
            out.push_str(&format!("  {} ({})\n", page, count));
        }
        out.push('\n');
    }

    let health = if summary.pages_crawled > 0 {
        let affected = summary.affected_pages.min(summary.pages_crawled);
        100.0 - (affected as f64 / summary.pages_crawled as f64) * 100.0
    } else {
        100.0
    };
    out.push_str(&format!(
        "Health: {:.1}% of crawled pages without findings ({} distinct broken targets)\n",
        health, summary.broken_targets
    ));

    out
}

/// Prints crawl statistics to stderr
pub fn print_statistics(summary: &CrawlSummary) {
    eprint!("{}", format_statistics(summary));
}

/// Prints a discovery preview to stderr
pub fn print_discovery(result: &DiscoveryResult) {
    eprintln!("=== Discovered Pages ===\n");
    eprintln!(
        "  Total: {} (sitemap: {}, pages scanned: {})\n",
        result.total, result.from_sitemap, result.pages_scanned
    );
    for link in result.links.iter().take(50) {
        eprintln!("  {}", link);
    }
    if result.links.len() > 50 {
        eprintln!("  ... and {} more", result.links.len() - 50);
    }
}
