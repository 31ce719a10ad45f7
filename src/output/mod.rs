//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Aggregating a finished crawl into a [`CrawlSummary`]
//! - Writing a Markdown report of every finding
//! - Printing end-of-run statistics

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{format_statistics, print_discovery, print_statistics};
pub use summary::{CrawlSummary, OutputError, OutputResult};
