//! Configuration module for Site-Auditor
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every key has a default, so running without a file is valid.
//!
//! # Example
//!
//! ```no_run
//! use site_auditor::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("auditor.toml")).unwrap();
//! println!("Navigation timeout: {:?}", config.crawler.navigation_timeout());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlerConfig, SitemapConfig, UserAgentConfig, ValidationConfig};

pub use parser::{load_config, load_config_or_default, parse_config};
pub use validation::validate;
