//! Markdown report generation
//!
//! This module renders a finished crawl as a human-readable Markdown report:
//! headline counts, the status breakdown, the most affected pages and one
//! table per finding kind.

use crate::findings::Finding;
use crate::output::summary::{CrawlSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Rows shown per findings table before truncating
const MAX_ROWS: usize = 200;

/// Writes the Markdown report for a crawl
///
/// # Arguments
///
/// * `summary` - The crawl summary
/// * `findings` - Every finding of the run
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_report(
    summary: &CrawlSummary,
    findings: &[Finding],
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(summary, findings);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl as markdown
pub fn format_markdown_report(summary: &CrawlSummary, findings: &[Finding]) -> String {
    let mut md = String::new();

    md.push_str("# Site Audit Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Site**: {}\n", summary.start_url));
    md.push_str(&format!(
        "- **Generated**: {}\n\n",
        summary.generated_at.to_rfc3339()
    ));

    md.push_str("## Overview\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Pages crawled | {} |\n", summary.pages_crawled));
    md.push_str(&format!("| Broken links | {} |\n", summary.broken_links));
    md.push_str(&format!("| Broken images | {} |\n", summary.broken_images));
    md.push_str(&format!("| Console errors | {} |\n", summary.console_errors));
    md.push_str(&format!(
        "| Navigation issues | {} |\n",
        summary.navigation_issues
    ));
    md.push_str(&format!(
        "| Distinct broken targets | {} |\n\n",
        summary.broken_targets
    ));

    if summary.is_clean() {
        md.push_str("No problems found.\n");
        return md;
    }

    if !summary.status_breakdown.is_empty() {
        md.push_str("## Broken Links by Status\n\n");
        md.push_str("| Status | Links |\n");
        md.push_str("|--------|-------|\n");
        for (status, count) in &summary.status_breakdown {
            md.push_str(&format!("| {} | {} |\n", status, count));
        }
        md.push('\n');
    }

    if !summary.top_pages.is_empty() {
        md.push_str("## Most Affected Pages\n\n");
        md.push_str("| Page | Findings |\n");
        md.push_str("|------|----------|\n");
        for (page, count) in &summary.top_pages {
            md.push_str(&format!("| {} | {} |\n", page, count));
        }
        md.push('\n');
    }

    let links: Vec<_> = findings
        .iter()
        .filter_map(|f| match f {
            Finding::BrokenLink(l) => Some(l),
            _ => None,
        })
        .collect();
    if !links.is_empty() {
        md.push_str("## Broken Links\n\n");
        md.push_str("| URL | Status | Found on | Link text |\n");
        md.push_str("|-----|--------|----------|-----------|\n");
        for link in links.iter().take(MAX_ROWS) {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                link.url,
                link.status_code,
                link.found_on_page,
                cell(&link.link_text)
            ));
        }
        push_truncation(&mut md, links.len());
    }

    let images: Vec<_> = findings
        .iter()
        .filter_map(|f| match f {
            Finding::BrokenImage(i) => Some(i),
            _ => None,
        })
        .collect();
    if !images.is_empty() {
        md.push_str("## Broken Images\n\n");
        md.push_str("| Source | Reason | Found on | Alt text |\n");
        md.push_str("|--------|--------|----------|----------|\n");
        for image in images.iter().take(MAX_ROWS) {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                image.src,
                cell(&image.reason),
                image.found_on_page,
                cell(&image.alt_text)
            ));
        }
        push_truncation(&mut md, images.len());
    }

    let issues: Vec<_> = findings
        .iter()
        .filter_map(|f| match f {
            Finding::NavigationIssue(n) => Some(n),
            _ => None,
        })
        .collect();
    if !issues.is_empty() {
        md.push_str("## Navigation Issues\n\n");
        md.push_str("Pages that could not be loaded. These are often transient.\n\n");
        md.push_str("| URL | Reason | Found on |\n");
        md.push_str("|-----|--------|----------|\n");
        for issue in issues.iter().take(MAX_ROWS) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                issue.url,
                cell(&issue.reason),
                issue.found_on_page
            ));
        }
        push_truncation(&mut md, issues.len());
    }

    let console: Vec<_> = findings
        .iter()
        .filter_map(|f| match f {
            Finding::ConsoleError(c) => Some(c),
            _ => None,
        })
        .collect();
    if !console.is_empty() {
        md.push_str("## Console Errors\n\n");
        md.push_str("| Page | Type | Message |\n");
        md.push_str("|------|------|---------|\n");
        for error in console.iter().take(MAX_ROWS) {
            md.push_str(&format!(
                "| {} | {:?} | {} |\n",
                error.found_on_page,
                error.kind,
                cell(&error.message)
            ));
        }
        push_truncation(&mut md, console.len());
    }

    md
}

fn push_truncation(md: &mut String, total: usize) {
    if total > MAX_ROWS {
        md.push_str(&format!("\n... and {} more\n", total - MAX_ROWS));
    }
    md.push('\n');
}

/// Escapes text for a table cell
fn cell(text: &str) -> String {
    let text = text.replace('|', "\\|").replace(['\n', '\r'], " ");
    if text.is_empty() {
        "-".to_string()
    } else {
        text
    }
}
