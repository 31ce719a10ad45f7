//! Integration tests for the HTTP-backed components
//!
//! These tests use wiremock to serve sitemaps and pages, exercising the
//! sitemap reader, the existence probe and the static page driver over a
//! real connection.

use site_auditor::config::{Config, SitemapConfig, UserAgentConfig};
use site_auditor::driver::{
    build_http_client, BrowserDriver, DriverError, ExtractQuery, StaticLauncher, StaticPageDriver,
};
use site_auditor::events::EventEmitter;
use site_auditor::findings::Finding;
use site_auditor::probe::{ExistenceCheck, HttpProbe};
use site_auditor::sitemap::SitemapReader;
use site_auditor::{AuditSession, CrawlRequest, FetchError};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn reader() -> SitemapReader {
    let client = build_http_client(&UserAgentConfig::default(), 5).expect("Failed to build client");
    SitemapReader::with_client(client, SitemapConfig::default())
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><body>{}</body></html>", body))
}

async fn mount_get(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sitemap_reader_follows_redirects() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_get(
        &server,
        "/old-sitemap.xml",
        ResponseTemplate::new(301).insert_header("location", format!("{}/sitemap.xml", base).as_str()),
    )
    .await;
    mount_get(
        &server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_string(format!(
            "<urlset><url><loc>{base}/a</loc></url><url><loc>{base}/b</loc></url></urlset>"
        )),
    )
    .await;

    let contents = reader()
        .read(&format!("{}/old-sitemap.xml", base))
        .await
        .expect("Failed to read sitemap");

    assert_eq!(
        contents.page_urls,
        vec![format!("{}/a", base), format!("{}/b", base)]
    );
    assert_eq!(contents.sitemaps_read, 1);
}

#[tokio::test]
async fn test_sitemap_reader_stops_at_redirect_limit() {
    let server = MockServer::start().await;
    let base = server.uri();

    // r0 -> r1 -> ... -> r7, two hops past the client's limit of 5
    for hop in 0..7 {
        mount_get(
            &server,
            &format!("/r{}", hop),
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/r{}", base, hop + 1).as_str()),
        )
        .await;
    }
    mount_get(
        &server,
        "/r7",
        ResponseTemplate::new(200)
            .set_body_string(format!("<urlset><url><loc>{base}/a</loc></url></urlset>")),
    )
    .await;

    let result = reader().read(&format!("{}/r0", base)).await;

    match result {
        Err(FetchError::RedirectLimit { url }) => assert!(url.contains("/r")),
        other => panic!("Expected redirect limit error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sitemap_reader_skips_failed_children() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_get(
        &server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_string(format!(
            r#"<sitemapindex>
  <sitemap><loc>{base}/sitemap-1.xml</loc></sitemap>
  <sitemap><loc>{base}/sitemap-missing.xml</loc></sitemap>
</sitemapindex>"#
        )),
    )
    .await;
    mount_get(
        &server,
        "/sitemap-1.xml",
        ResponseTemplate::new(200)
            .set_body_string(format!("<urlset><url><loc>{base}/page</loc></url></urlset>")),
    )
    .await;
    // sitemap-missing.xml is not mounted and answers 404

    let contents = reader()
        .read(&format!("{}/sitemap.xml", base))
        .await
        .expect("Failed to read sitemap");

    assert_eq!(contents.page_urls, vec![format!("{}/page", base)]);
    assert_eq!(contents.sitemaps_read, 2);
    assert_eq!(contents.sitemaps_failed, 1);
}

#[tokio::test]
async fn test_sitemap_reader_root_failure_is_an_error() {
    let server = MockServer::start().await;

    let result = reader().read(&format!("{}/sitemap.xml", server.uri())).await;

    assert!(matches!(
        result,
        Err(FetchError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_probe_falls_back_to_get() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/no-head"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    mount_get(&server, "/no-head", ResponseTemplate::new(200)).await;

    let probe = HttpProbe::new(&UserAgentConfig::default()).expect("Failed to build probe");
    let result = probe
        .check(&format!("{}/no-head", server.uri()), TIMEOUT)
        .await;

    assert!(result.ok);
    assert_eq!(result.status, Some(200));
}

#[tokio::test]
async fn test_probe_reports_status_and_failures() {
    let server = MockServer::start().await;
    let probe = HttpProbe::new(&UserAgentConfig::default()).expect("Failed to build probe");

    let missing = probe
        .check(&format!("{}/missing", server.uri()), TIMEOUT)
        .await;
    assert!(missing.is_broken());
    assert_eq!(missing.status, Some(404));

    // Nothing listens on port 9
    let unreachable = probe.check("http://127.0.0.1:9/", TIMEOUT).await;
    assert!(!unreachable.ok);
    assert_eq!(unreachable.status, None);
    assert!(unreachable.error.is_some());
}

#[tokio::test]
async fn test_static_driver_extracts_scoped_elements() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_get(
        &server,
        "/",
        html(
            r#"<nav><a href="/about">About</a></nav>
<main>
  <a href="/post">Read <em>more</em></a>
  <img src="/hero.png" alt="Hero">
</main>
<footer><a href="https://other.test/">Partner</a></footer>"#,
        ),
    )
    .await;

    let client = build_http_client(&UserAgentConfig::default(), 5).expect("Failed to build client");
    let mut driver = StaticPageDriver::new(client);

    let response = driver
        .navigate(&format!("{}/", base), TIMEOUT)
        .await
        .expect("Navigation failed");
    assert_eq!(response.status, Some(200));

    let anchors = driver
        .evaluate(ExtractQuery::Anchors, None)
        .await
        .expect("Extraction failed");
    assert_eq!(anchors.len(), 3);
    assert!(anchors[0].is_header);
    assert_eq!(anchors[0].url, format!("{}/about", base));

    let scoped = driver
        .evaluate(ExtractQuery::Anchors, Some("main"))
        .await
        .expect("Extraction failed");
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].text, "Read more");

    let images = driver
        .evaluate(ExtractQuery::Images, Some("main"))
        .await
        .expect("Extraction failed");
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].text, "Hero");
    assert_eq!(images[0].complete, None);

    let invalid = driver.evaluate(ExtractQuery::Anchors, Some("main[[")).await;
    assert!(matches!(invalid, Err(DriverError::InvalidSelector(_))));
}

#[tokio::test]
async fn test_static_driver_reports_error_status() {
    let server = MockServer::start().await;

    let client = build_http_client(&UserAgentConfig::default(), 5).expect("Failed to build client");
    let mut driver = StaticPageDriver::new(client);

    let response = driver
        .navigate(&format!("{}/missing", server.uri()), TIMEOUT)
        .await
        .expect("Navigation failed");
    assert_eq!(response.status, Some(404));

    let anchors = driver
        .evaluate(ExtractQuery::Anchors, None)
        .await
        .expect("Extraction failed");
    assert!(anchors.is_empty());
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_get(
        &server,
        "/",
        html(
            r#"<header><nav><a href="/about">About</a></nav></header>
<main>
  <a href="/missing">Old post</a>
  <img src="/logo.png" alt="Logo">
  <img src="/gone.png" alt="Gone">
</main>"#,
        ),
    )
    .await;
    mount_get(&server, "/about", html(r#"<main><a href="/">Home</a></main>"#)).await;
    Mock::given(method("HEAD"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = Config::default();
    let launcher = StaticLauncher::new(&config.user_agent).expect("Failed to build launcher");
    let probe = HttpProbe::new(&config.user_agent).expect("Failed to build probe");
    let mut session = AuditSession::new(config, Arc::new(launcher), Arc::new(probe))
        .expect("Failed to create session");

    let (emitter, _rx) = EventEmitter::channel();
    let done = session
        .crawl(&CrawlRequest::new(format!("{}/", base)), &emitter)
        .await
        .expect("Crawl failed");

    assert_eq!(done.crawled, 3);
    assert_eq!(done.broken_links, 1);
    assert_eq!(done.broken_images, 1);

    for finding in &done.findings {
        match finding {
            Finding::BrokenLink(link) => {
                assert_eq!(link.url, format!("{}/missing", base));
                assert_eq!(link.link_text, "Old post");
                assert_eq!(link.found_on_page, format!("{}/", base));
            }
            Finding::BrokenImage(image) => {
                assert_eq!(image.src, format!("{}/gone.png", base));
                assert_eq!(image.alt_text, "Gone");
            }
            other => panic!("Unexpected finding: {:?}", other),
        }
    }
}
