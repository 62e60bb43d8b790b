//! Fetch engine behaviour against a live mock server

use crate::common::{html_page, html_response, test_config, test_profile, TEST_TIERS};
use signal_scan::config::ScannerConfig;
use signal_scan::crawler::{build_http_client, FetchAttemptPolicy, FetchEngine};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    engine: FetchEngine,
    client: reqwest::Client,
    policy: FetchAttemptPolicy,
}

fn harness(config: &ScannerConfig, tiers: &[f64]) -> Harness {
    let profile = test_profile(4);
    Harness {
        engine: FetchEngine::new(config),
        client: build_http_client(config, &profile).expect("Failed to build client"),
        policy: FetchAttemptPolicy::from_seconds(tiers, 1.0).expect("Invalid tiers"),
    }
}

fn page_url(server: &MockServer, page: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), page)).unwrap()
}

#[tokio::test]
async fn test_first_tier_success_makes_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html_page("Home", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&test_config(), TEST_TIERS);
    let page = h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/"), &h.policy, false)
        .await
        .expect("Home page should be fetched");

    assert_eq!(page.tier_index, 0);
    assert_eq!(page.tier_label, "ultra-fast");
    assert!(page.earlier_failures.is_empty());
    assert_eq!(page.status_code, 200);
    assert!(page.html.contains("<title>Home</title>"));
    assert!(!page.truncated);
}

#[tokio::test]
async fn test_slow_page_escalates_to_next_tier() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html_response(html_page("Slow", &[])).set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let h = harness(&test_config(), &[0.2, 1.0, 2.0]);
    let page = h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/"), &h.policy, false)
        .await
        .expect("Second tier should succeed");

    assert_eq!(page.tier_index, 1);
    assert_eq!(page.tier_label, "fast");
    assert_eq!(page.earlier_failures.len(), 1);
    assert_eq!(page.earlier_failures[0].tier, "ultra-fast");
    assert!(page.earlier_failures[0].reason.contains("timed out"));
}

#[tokio::test]
async fn test_server_error_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html_page("Recovered", &[])))
        .mount(&server)
        .await;

    let h = harness(&test_config(), TEST_TIERS);
    let page = h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/"), &h.policy, false)
        .await
        .expect("Second attempt should succeed");

    assert_eq!(page.tier_index, 1);
    assert_eq!(page.earlier_failures[0].reason, "HTTP 500");
}

#[tokio::test]
async fn test_every_tier_failing_reports_each_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(&test_config(), TEST_TIERS);
    let failure = h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/missing"), &h.policy, false)
        .await
        .expect_err("A 404 page never succeeds");

    assert_eq!(failure.failures.len(), 3);
    let reasons = failure.reasons();
    assert!(reasons.iter().all(|r| r.contains("HTTP 404")));
    assert!(reasons[0].starts_with("ultra-fast"));
}

#[tokio::test]
async fn test_empty_body_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("   "))
        .mount(&server)
        .await;

    let h = harness(&test_config(), &[0.3, 0.6]);
    let failure = h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/"), &h.policy, false)
        .await
        .expect_err("Whitespace is not a page");

    assert!(failure.reasons().iter().all(|r| r.contains("empty body")));
}

#[tokio::test]
async fn test_robots_denial_stops_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html_response(html_page("Secret", &[])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(html_response(html_page("Public", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&test_config(), TEST_TIERS);
    let private = page_url(&server, "/private");

    let failure = h
        .engine
        .fetch_page(&h.client, &private, &h.policy, true)
        .await
        .expect_err("robots.txt forbids /private");
    assert_eq!(failure.failures.len(), 1);
    assert!(failure.failures[0].reason.contains("robots.txt"));

    // Cached rules are reused: robots.txt is requested once overall
    assert!(h
        .engine
        .fetch_page(&h.client, &private, &h.policy, true)
        .await
        .is_err());
    assert!(h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/public"), &h.policy, true)
        .await
        .is_ok());
    assert_eq!(h.engine.robots_cache_len(), 1);
}

#[tokio::test]
async fn test_robots_ignored_when_not_respected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html_page("Home", &[])))
        .mount(&server)
        .await;

    let h = harness(&test_config(), TEST_TIERS);
    let result = h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/"), &h.policy, false)
        .await;

    assert!(result.is_ok());
    assert_eq!(h.engine.robots_cache_len(), 0);
}

#[tokio::test]
async fn test_failing_robots_allows_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html_page("Home", &[])))
        .mount(&server)
        .await;

    let h = harness(&test_config(), TEST_TIERS);
    let result = h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/"), &h.policy, true)
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_body_is_capped() {
    let server = MockServer::start().await;
    let big = format!("<html><body>{}</body></html>", "a".repeat(10_000));
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(big))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.fetch.max_html_bytes = 1024;

    let h = harness(&config, TEST_TIERS);
    let page = h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/"), &h.policy, false)
        .await
        .expect("Capped page is still a page");

    assert!(page.truncated);
    assert_eq!(page.bytes_read, 1024);
    assert!(page.html.len() <= 1024);
}

#[tokio::test]
async fn test_declared_charset_is_decoded() {
    let server = MockServer::start().await;
    // "Café" in ISO-8859-1
    let body = b"<html><head><title>Caf\xe9</title></head></html>".to_vec();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=iso-8859-1"))
        .mount(&server)
        .await;

    let h = harness(&test_config(), TEST_TIERS);
    let page = h
        .engine
        .fetch_page(&h.client, &page_url(&server, "/"), &h.policy, false)
        .await
        .unwrap();

    assert!(page.html.contains("Café"));
}
