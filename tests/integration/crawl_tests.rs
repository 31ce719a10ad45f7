//! Integration tests for the crawl engine
//!
//! These tests drive full crawls through an [`AuditSession`] against a
//! scripted in-memory site and a probe with canned answers.

mod common;

use common::{page_url, FakeLauncher, FakePage, FakeProbe, FakeSite, INVALID_SCOPE};
use site_auditor::config::Config;
use site_auditor::driver::{BrowserEvent, ConsoleLevel, DriverError, ResourceType};
use site_auditor::events::{CrawlDone, CrawlEvent, EventEmitter};
use site_auditor::findings::{Finding, FindingKind};
use site_auditor::probe::ProbeResult;
use site_auditor::{AuditError, AuditSession, CrawlRequest, Phase};
use std::sync::Arc;
use std::time::Duration;

fn create_session(launcher: FakeLauncher, probe: Arc<FakeProbe>, config: Config) -> AuditSession {
    AuditSession::new(config, Arc::new(launcher), probe).expect("Failed to create session")
}

/// Runs a crawl and collects every event it emitted
async fn run_crawl(
    session: &mut AuditSession,
    request: &CrawlRequest,
) -> (Result<CrawlDone, AuditError>, Vec<CrawlEvent>) {
    let (emitter, mut rx) = EventEmitter::channel();
    let result = session.crawl(request, &emitter).await;
    drop(emitter);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (result, events)
}

fn pages_of(findings: &[Finding], kind: FindingKind) -> Vec<String> {
    let mut pages: Vec<String> = findings
        .iter()
        .filter(|f| f.kind() == kind)
        .map(|f| f.found_on_page().to_string())
        .collect();
    pages.sort();
    pages
}

#[tokio::test]
async fn test_broken_link_reported_for_every_referrer() {
    let site = FakeSite::new()
        .page("/", FakePage::new().link("/a", "A").link("/b", "B").link("/c", "C"))
        .page("/a", FakePage::new().link("/gone", "Gone from A"))
        .page("/b", FakePage::new().link("/gone", "Gone from B"))
        .page("/c", FakePage::new().link("/gone", "Gone from C"));
    let launcher = FakeLauncher::new(site);
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());

    let (result, events) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    let done = result.expect("Crawl failed");

    assert_eq!(done.crawled, 5);
    assert_eq!(done.broken_links, 3);
    assert_eq!(
        pages_of(&done.findings, FindingKind::BrokenLink),
        vec![page_url("/a"), page_url("/b"), page_url("/c")]
    );
    for finding in &done.findings {
        match finding {
            Finding::BrokenLink(link) => {
                assert_eq!(link.url, page_url("/gone"));
                assert_eq!(link.status_code, 404);
            }
            other => panic!("Unexpected finding: {:?}", other),
        }
    }

    // The broken target itself is navigated once
    let gone_visits = log.visits().iter().filter(|v| **v == page_url("/gone")).count();
    assert_eq!(gone_visits, 1);

    // Findings are streamed as well as returned
    let streamed = events
        .iter()
        .filter(|e| matches!(e, CrawlEvent::BrokenLink(_)))
        .count();
    assert_eq!(streamed, 3);
    assert!(matches!(events.last(), Some(CrawlEvent::Done(_))));
}

#[tokio::test]
async fn test_referrer_found_after_failure_is_reported() {
    let site = FakeSite::new()
        .page("/", FakePage::new().link("/gone", "Gone").link("/a", "A"))
        .page("/a", FakePage::new().link("/gone", "Gone again"));
    let launcher = FakeLauncher::new(site);
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());

    let (result, _) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    let done = result.expect("Crawl failed");

    assert_eq!(done.broken_links, 2);
    assert_eq!(
        pages_of(&done.findings, FindingKind::BrokenLink),
        vec![page_url("/"), page_url("/a")]
    );
}

#[tokio::test]
async fn test_selected_dead_page_reported_only_for_its_referrers() {
    let site = FakeSite::new()
        .page("/", FakePage::new())
        .page("/gone", FakePage::status(404))
        .page("/x/y", FakePage::new().link("/gone", "Gone"));
    let launcher = FakeLauncher::new(site);
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());

    let selected = vec![page_url("/"), page_url("/gone"), page_url("/x/y")];
    let request = CrawlRequest::new(page_url("/")).with_selection(selected.clone(), selected);
    let (result, _) = run_crawl(&mut session, &request).await;
    let done = result.expect("Crawl failed");

    // /gone is navigated before /x/y links to it
    assert_eq!(
        log.visits(),
        vec![page_url("/"), page_url("/gone"), page_url("/x/y")]
    );
    assert_eq!(done.broken_links, 1);
    match &done.findings[..] {
        [Finding::BrokenLink(link)] => {
            assert_eq!(link.url, page_url("/gone"));
            assert_eq!(link.found_on_page, page_url("/x/y"));
            assert_eq!(link.link_text, "Gone");
        }
        other => panic!("Unexpected findings: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_start_page_is_a_navigation_issue() {
    let site = FakeSite::new().page("/", FakePage::unreachable("net::ERR_NAME_NOT_RESOLVED"));
    let launcher = FakeLauncher::new(site);
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());

    let (result, _) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    let done = result.expect("Crawl failed");

    assert_eq!(done.crawled, 1);
    assert_eq!(done.navigation_issues, 1);
    match &done.findings[0] {
        Finding::NavigationIssue(issue) => {
            assert_eq!(issue.url, page_url("/"));
            assert_eq!(issue.found_on_page, page_url("/"));
            assert!(issue.reason.contains("ERR_NAME_NOT_RESOLVED"));
        }
        other => panic!("Unexpected finding: {:?}", other),
    }
}

#[tokio::test]
async fn test_selective_crawl_trusts_discovered_links() {
    let site = FakeSite::new()
        .page(
            "/",
            FakePage::new()
                .link("/a", "Selected")
                .link("/b", "Discovered")
                .link("/c", "Unknown"),
        )
        .page("/a", FakePage::new())
        .page("/b", FakePage::status(404));
    let probe = Arc::new(
        FakeProbe::new()
            .answer("/b", ProbeResult::from_status(404))
            .answer("/c", ProbeResult::from_status(404)),
    );
    let launcher = FakeLauncher::new(site);
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::clone(&probe), Config::default());

    let request = CrawlRequest::new(page_url("/")).with_selection(
        vec![page_url("/"), page_url("/a")],
        vec![page_url("/"), page_url("/a"), page_url("/b")],
    );
    let (result, _) = run_crawl(&mut session, &request).await;
    let done = result.expect("Crawl failed");

    // Only selected pages are navigated, unknown links are probed
    assert_eq!(log.visits(), vec![page_url("/"), page_url("/a")]);
    assert_eq!(probe.checked(), vec![page_url("/c")]);
    assert_eq!(done.crawled, 2);
    assert_eq!(done.broken_links, 1);
    assert_eq!(done.findings[0].subject(), page_url("/c"));
}

#[tokio::test]
async fn test_selective_crawl_without_trust_checks_discovered_links() {
    let site = FakeSite::new()
        .page("/", FakePage::new().link("/b", "Discovered").link("/c", "Unknown"));
    let probe = Arc::new(
        FakeProbe::new()
            .answer("/b", ProbeResult::from_status(404))
            .answer("/c", ProbeResult::from_status(404)),
    );
    let mut config = Config::default();
    config.validation.trust_discovered = false;
    let mut session = create_session(FakeLauncher::new(site), Arc::clone(&probe), config);

    let request = CrawlRequest::new(page_url("/"))
        .with_selection(vec![page_url("/")], vec![page_url("/"), page_url("/b")]);
    let (result, _) = run_crawl(&mut session, &request).await;
    let done = result.expect("Crawl failed");

    assert_eq!(probe.checked(), vec![page_url("/b"), page_url("/c")]);
    assert_eq!(done.broken_links, 2);
}

#[tokio::test]
async fn test_selector_limits_audited_region() {
    let site = FakeSite::new().page(
        "/",
        FakePage::new()
            .link_in("/gone-main", "In content", "main")
            .link_in("/gone-footer", "In footer", "footer"),
    );
    let launcher = FakeLauncher::new(site);
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());

    let request = CrawlRequest::new(page_url("/")).with_selector("main");
    let (result, _) = run_crawl(&mut session, &request).await;
    let done = result.expect("Crawl failed");

    assert_eq!(done.broken_links, 1);
    assert_eq!(done.findings[0].subject(), page_url("/gone-main"));
    assert!(!log.visits().contains(&page_url("/gone-footer")));
}

#[tokio::test]
async fn test_invalid_selector_aborts_crawl() {
    let site = FakeSite::new().page("/", FakePage::new().link("/a", "A"));
    let launcher = FakeLauncher::new(site);
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());

    let request = CrawlRequest::new(page_url("/")).with_selector(format!("{}main", INVALID_SCOPE));
    let (result, events) = run_crawl(&mut session, &request).await;

    assert!(matches!(
        result,
        Err(AuditError::Driver(DriverError::InvalidSelector(_)))
    ));
    assert!(matches!(events.last(), Some(CrawlEvent::Error { .. })));
    assert_eq!(session.phase(), Phase::Idle);
    assert!(log.was_closed());
}

#[tokio::test]
async fn test_header_links_followed_only_without_sitemap() {
    let site = FakeSite::new()
        .page(
            "/",
            FakePage::new()
                .header_link("/about", "About")
                .link("/a", "A"),
        )
        .page("/a", FakePage::new().header_link("/contact", "Contact"))
        .page("/about", FakePage::new());

    let launcher = FakeLauncher::new(site.clone());
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());
    let (result, _) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    result.expect("Crawl failed");
    assert!(log.visits().contains(&page_url("/about")));
    assert!(!log.visits().contains(&page_url("/contact")));

    let launcher = FakeLauncher::new(site);
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());
    let request = CrawlRequest::new(page_url("/")).with_sitemap(page_url("/sitemap.xml"));
    let (result, _) = run_crawl(&mut session, &request).await;
    result.expect("Crawl failed");
    assert_eq!(log.visits(), vec![page_url("/"), page_url("/a")]);
}

#[tokio::test]
async fn test_external_links_are_probed() {
    let site = FakeSite::new().page(
        "/",
        FakePage::new()
            .link("https://other.test/missing", "Missing")
            .link("https://other.test/down", "Down")
            .link("https://www.facebook.com/site", "Facebook")
            .link("mailto:team@site.test", "Mail"),
    );
    let probe = Arc::new(
        FakeProbe::new()
            .answer("https://other.test/missing", ProbeResult::from_status(404))
            .answer("https://other.test/down", ProbeResult::failed("Connection refused")),
    );
    let launcher = FakeLauncher::new(site);
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::clone(&probe), Config::default());

    let (result, _) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    let done = result.expect("Crawl failed");

    assert_eq!(
        probe.checked(),
        vec!["https://other.test/missing", "https://other.test/down"]
    );
    assert_eq!(log.visits(), vec![page_url("/")]);
    assert_eq!(done.broken_links, 1);
    assert_eq!(done.navigation_issues, 1);
    assert_eq!(
        pages_of(&done.findings, FindingKind::NavigationIssue),
        vec![page_url("/")]
    );
}

#[tokio::test]
async fn test_images_reverified_before_reporting() {
    let site = FakeSite::new().page(
        "/",
        FakePage::new()
            .image("/ok.png", Some(true), Some(800))
            .image("/lazy.png", Some(false), None)
            .image("/missing.png", Some(false), None)
            .image("/icon.svg", Some(true), Some(0)),
    );
    let probe = Arc::new(FakeProbe::new().answer("/missing.png", ProbeResult::from_status(404)));
    let mut session = create_session(FakeLauncher::new(site), Arc::clone(&probe), Config::default());

    let (result, _) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    let done = result.expect("Crawl failed");

    assert_eq!(probe.checked(), vec![page_url("/lazy.png"), page_url("/missing.png")]);
    assert_eq!(done.broken_images, 1);
    match &done.findings[0] {
        Finding::BrokenImage(image) => {
            assert_eq!(image.src, page_url("/missing.png"));
            assert_eq!(image.reason, "HTTP 404");
            assert_eq!(image.found_on_page, page_url("/"));
        }
        other => panic!("Unexpected finding: {:?}", other),
    }
}

#[tokio::test]
async fn test_console_noise_suppressed() {
    let site = FakeSite::new().page(
        "/",
        FakePage::new()
            .event(BrowserEvent::Console {
                level: ConsoleLevel::Error,
                text: "Access to fetch at 'https://api.other.test/' from origin 'https://site.test' has been blocked by CORS policy".to_string(),
            })
            .event(BrowserEvent::Console {
                level: ConsoleLevel::Warning,
                text: "Deprecated API used".to_string(),
            })
            .event(BrowserEvent::PageError {
                message: "TypeError: boom is not a function".to_string(),
            })
            .event(BrowserEvent::Response {
                url: page_url("/style.css"),
                status: 404,
                resource_type: ResourceType::Stylesheet,
            }),
    );
    let mut session =
        create_session(FakeLauncher::new(site), Arc::new(FakeProbe::new()), Config::default());

    let (result, _) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    let done = result.expect("Crawl failed");

    assert_eq!(done.console_errors, 1);
    assert_eq!(done.broken_links, 0);
    match &done.findings[0] {
        Finding::ConsoleError(error) => {
            assert!(error.message.starts_with("TypeError"));
            assert_eq!(error.found_on_page, page_url("/"));
        }
        other => panic!("Unexpected finding: {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_sub_resource_attributed_to_referrers() {
    let site = FakeSite::new()
        .page("/", FakePage::new().link("/a", "A").link("/b", "B"))
        .page("/a", FakePage::new().image("/hero.png", Some(true), Some(1200)))
        .page(
            "/b",
            FakePage::new()
                .image("/hero.png", Some(true), Some(1200))
                .event(BrowserEvent::Response {
                    url: page_url("/hero.png"),
                    status: 404,
                    resource_type: ResourceType::Image,
                }),
        );
    let mut session =
        create_session(FakeLauncher::new(site), Arc::new(FakeProbe::new()), Config::default());

    let (result, _) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    let done = result.expect("Crawl failed");

    assert_eq!(done.broken_images, 2);
    assert_eq!(
        pages_of(&done.findings, FindingKind::BrokenImage),
        vec![page_url("/a"), page_url("/b")]
    );
}

#[tokio::test]
async fn test_consumer_disconnect_stops_crawl() {
    let mut home = FakePage::new();
    for i in 0..10 {
        home = home.link(&format!("/p{}", i), "Page");
    }
    let site = FakeSite::new().page("/", home);
    let launcher = FakeLauncher::new(site).with_delay(Duration::from_millis(20));
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());

    let (emitter, mut rx) = EventEmitter::channel();
    let consumer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if matches!(event, CrawlEvent::Progress(_)) {
                break;
            }
        }
        // rx dropped here
    });

    let result = session.crawl(&CrawlRequest::new(page_url("/")), &emitter).await;
    consumer.await.unwrap();

    assert!(matches!(result, Err(AuditError::Cancelled)));
    assert_eq!(session.phase(), Phase::Idle);
    assert!(log.was_closed());
    assert!(log.visits().len() < 11);
}

#[tokio::test]
async fn test_session_returns_to_idle_after_crawl() {
    let site = FakeSite::new().page("/", FakePage::new());
    let launcher = FakeLauncher::new(site);
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());

    assert!(session.cancel_preview().is_err());

    let (result, _) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    assert!(result.is_ok());
    assert_eq!(session.phase(), Phase::Idle);
    assert!(log.was_closed());

    // A second run launches a fresh browser session
    let (result, _) = run_crawl(&mut session, &CrawlRequest::new(page_url("/"))).await;
    assert!(result.is_ok());
    assert_eq!(log.launches(), 2);
}

#[tokio::test]
async fn test_invalid_start_url_rejected() {
    let launcher = FakeLauncher::new(FakeSite::new());
    let log = launcher.log();
    let mut session = create_session(launcher, Arc::new(FakeProbe::new()), Config::default());

    let (result, events) = run_crawl(&mut session, &CrawlRequest::new("not a url")).await;

    assert!(matches!(result, Err(AuditError::InvalidStartUrl { .. })));
    assert!(matches!(events.last(), Some(CrawlEvent::Error { .. })));
    assert_eq!(log.launches(), 0);
}
