//! Site-Auditor main entry point
//!
//! This is the command-line interface for the Site-Auditor website health
//! auditor. Events are written to stdout as JSON lines; logs and statistics
//! go to stderr.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use site_auditor::config::{load_config_or_default, Config};
use site_auditor::driver::StaticLauncher;
use site_auditor::events::{CrawlDone, CrawlEvent, DiscoveryEvent, EventEmitter};
use site_auditor::output::{generate_markdown_report, print_discovery, print_statistics, CrawlSummary};
use site_auditor::probe::HttpProbe;
use site_auditor::{AuditSession, CrawlRequest, DiscoveryRequest, DiscoveryResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Site-Auditor: a website health auditor
///
/// Discovers the pages of a site from its sitemap or by following links,
/// then crawls them and reports broken links, broken images, script errors
/// and pages that fail to load.
#[derive(Parser, Debug)]
#[command(name = "site-auditor")]
#[command(version)]
#[command(about = "A website health auditor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the pages of a site without crawling them
    Discover(SiteArgs),

    /// Crawl a site, or a selection of its pages, and report problems
    Crawl {
        #[command(flatten)]
        site: SiteArgs,

        /// File with the pages to crawl, one URL per line (full crawl when omitted)
        #[arg(long, value_name = "FILE")]
        selected: Option<PathBuf>,

        /// File with previously discovered URLs, one per line
        #[arg(long, value_name = "FILE", requires = "selected")]
        discovered: Option<PathBuf>,

        /// Write a Markdown report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Discover, then crawl every discovered page
    Audit {
        #[command(flatten)]
        site: SiteArgs,

        /// Write a Markdown report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SiteArgs {
    /// URL the audit starts from
    #[arg(value_name = "START_URL")]
    start_url: String,

    /// Sitemap URL; discovery reads it instead of following links
    #[arg(long, value_name = "URL")]
    sitemap: Option<String>,

    /// CSS selector restricting which part of each page is audited
    #[arg(long, value_name = "CSS")]
    selector: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            let config = load_config_or_default(Some(path))
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded from {}", path.display());
            config
        }
        None => load_config_or_default(None).context("Invalid default configuration")?,
    };

    let mut session = build_session(config)?;

    match cli.command {
        Command::Discover(site) => {
            let result = handle_discover(&mut session, &site).await?;
            if !cli.quiet {
                print_discovery(&result);
            }
        }
        Command::Crawl {
            site,
            selected,
            discovered,
            report,
        } => {
            let mut request = crawl_request(&site);
            if let Some(path) = &selected {
                let discovered = match &discovered {
                    Some(path) => read_url_list(path)?,
                    None => Vec::new(),
                };
                request = request.with_selection(read_url_list(path)?, discovered);
            }
            let done = handle_crawl(&mut session, &request).await?;
            finish_crawl(&site.start_url, &done, report.as_deref(), cli.quiet)?;
        }
        Command::Audit { site, report } => {
            let preview = handle_discover(&mut session, &site).await?;
            tracing::info!("Crawling all {} discovered pages", preview.total);

            let request =
                crawl_request(&site).with_selection(preview.links.clone(), preview.links);
            let done = handle_crawl(&mut session, &request).await?;
            finish_crawl(&site.start_url, &done, report.as_deref(), cli.quiet)?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_auditor=info,warn"),
            1 => EnvFilter::new("site_auditor=debug,info"),
            2 => EnvFilter::new("site_auditor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn build_session(config: Config) -> anyhow::Result<AuditSession> {
    let launcher = StaticLauncher::new(&config.user_agent).context("Failed to build HTTP client")?;
    let probe = HttpProbe::new(&config.user_agent).context("Failed to build HTTP client")?;
    let session = AuditSession::new(config, Arc::new(launcher), Arc::new(probe))?;
    Ok(session)
}

fn crawl_request(site: &SiteArgs) -> CrawlRequest {
    CrawlRequest {
        start_url: site.start_url.clone(),
        sitemap_url: site.sitemap.clone(),
        selector: site.selector.clone(),
        ..Default::default()
    }
}

async fn handle_discover(
    session: &mut AuditSession,
    site: &SiteArgs,
) -> anyhow::Result<DiscoveryResult> {
    let request = DiscoveryRequest {
        start_url: site.start_url.clone(),
        sitemap_url: site.sitemap.clone(),
        selector: site.selector.clone(),
    };

    let (emitter, writer) = event_stream::<DiscoveryEvent>();
    let result = session.discover(&request, &emitter).await;
    drop(emitter);
    writer.await?;

    Ok(result?)
}

async fn handle_crawl(
    session: &mut AuditSession,
    request: &CrawlRequest,
) -> anyhow::Result<CrawlDone> {
    let (emitter, writer) = event_stream::<CrawlEvent>();
    let emitter = Arc::new(emitter);

    // Ctrl-C stops the crawl after the page in flight
    let interrupt = {
        let emitter = Arc::clone(&emitter);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after the current page");
                emitter.close();
            }
        })
    };

    let result = session.crawl(request, &emitter).await;
    interrupt.abort();
    drop(emitter);
    writer.await?;

    Ok(result?)
}

fn finish_crawl(
    start_url: &str,
    done: &CrawlDone,
    report: Option<&Path>,
    quiet: bool,
) -> anyhow::Result<()> {
    let summary = CrawlSummary::from_done(start_url, done);

    if let Some(path) = report {
        generate_markdown_report(&summary, &done.findings, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    if !quiet {
        print_statistics(&summary);
    }
    Ok(())
}

/// Creates an emitter whose events are printed to stdout as JSON lines
fn event_stream<E>() -> (EventEmitter<E>, JoinHandle<()>)
where
    E: Serialize + Send + 'static,
{
    let (emitter, rx) = EventEmitter::channel();
    (emitter, tokio::spawn(write_events(rx)))
}

async fn write_events<E: Serialize>(mut rx: UnboundedReceiver<E>) {
    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => {
                let mut stdout = std::io::stdout().lock();
                if writeln!(stdout, "{}", line).is_err() {
                    // Closing the receiver cancels the run
                    break;
                }
            }
            Err(e) => tracing::error!("Failed to serialize event: {}", e),
        }
    }
}

/// Reads one URL per line, skipping blank lines and `#` comments
fn read_url_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}
