//! End-to-end pipeline tests

use crate::common::{
    closed_port_domain, domain_of, html_page, html_response, mount_probe_ok, test_config,
    test_profile,
};
use serde_json::json;
use signal_scan::crawler::{BatchCoalescer, ScanOptions, Scanner};
use signal_scan::state::ScanStage;
use signal_scan::ScanError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scanner(concurrency: usize) -> Scanner {
    Scanner::new(test_config(), test_profile(concurrency)).expect("Valid test configuration")
}

/// A small company site: home page linking to careers, about, a missing
/// blog post, a blocklisted privacy page and an external site
async fn company_site() -> MockServer {
    let server = MockServer::start().await;
    mount_probe_ok(&server).await;

    let home = html_page(
        "Acme Robotics",
        &[
            "/careers",
            "/about",
            "/blog/launch",
            "/privacy",
            "https://elsewhere.test/partners",
        ],
    )
    .replace(
        "</head>",
        r#"<link rel="alternate" type="application/rss+xml" href="/feed.xml"></head>"#,
    );

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(home))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/careers"))
        .respond_with(html_response(html_page("Careers at Acme", &[])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_response(html_page("About Acme", &[])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/privacy"))
        .respond_with(html_response(html_page("Privacy", &[])))
        .expect(0)
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_full_scan_of_company_site() {
    let server = company_site().await;
    let domain = domain_of(&server);
    let scanner = scanner(2);

    let options = ScanOptions {
        max_pages: 6,
        ..Default::default()
    };
    let result = scanner.scan_domain(&domain, &options).await.unwrap();

    assert_eq!(result.stage, ScanStage::Done);
    assert!(result.resolution_validated);
    assert_eq!(result.resolved_origin, Some(server.uri()));
    assert!(result.home_fetched);
    assert_eq!(result.home_tier.as_deref(), Some("ultra-fast"));

    let base = server.uri();
    assert_eq!(result.pages_crawled[0], format!("{}/", base));
    assert!(result.pages_crawled.contains(&format!("{}/careers", base)));
    assert!(result.pages_crawled.contains(&format!("{}/about", base)));
    assert!(!result.pages_crawled.iter().any(|p| p.contains("privacy")));
    assert!(!result.pages_crawled.iter().any(|p| p.contains("elsewhere")));

    // The blog post is linked but missing
    assert!(result
        .pages_failed
        .iter()
        .any(|f| f.url.ends_with("/blog/launch")));

    // First title wins; feeds are collected from every page
    assert_eq!(result.partial_signals["title"], json!("Acme Robotics"));
    assert_eq!(
        result.partial_signals["feeds"],
        json!([format!("{}/feed.xml", base)])
    );
    assert!(result.extractor_failures.is_empty());
}

#[tokio::test]
async fn test_extra_urls_and_hints() {
    let server = company_site().await;
    Mock::given(method("GET"))
        .and(path("/investors"))
        .respond_with(html_response(html_page("Investors", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let options = ScanOptions {
        max_pages: 2,
        extra_urls: vec![format!("{}/investors", server.uri())],
        company_name: Some("  Acme   Robotics, Inc. ".to_string()),
        company_linkedin: Some("https://www.linkedin.com/company/acme".to_string()),
        ..Default::default()
    };

    let result = scanner(2).scan_domain(&domain, &options).await.unwrap();

    // Budget of two: the home page plus the explicit URL, which outranks discovered links
    assert_eq!(result.pages_crawled.len(), 2);
    assert!(result.pages_crawled[1].ends_with("/investors"));
    assert_eq!(result.partial_signals["company_name"], json!("Acme Robotics"));
    assert_eq!(
        result.partial_signals["linkedin"],
        json!("https://www.linkedin.com/company/acme")
    );
}

#[tokio::test]
async fn test_failed_home_uses_conventional_paths() {
    let server = MockServer::start().await;
    mount_probe_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_response(html_page("About Acme", &[])))
        .mount(&server)
        .await;

    let options = ScanOptions {
        max_pages: 3,
        ..Default::default()
    };
    let result = scanner(2)
        .scan_domain(&domain_of(&server), &options)
        .await
        .unwrap();

    assert_eq!(result.stage, ScanStage::Done);
    assert!(!result.home_fetched);
    assert_eq!(result.pages_crawled, vec![format!("{}/about", server.uri())]);
    assert_eq!(result.partial_signals["title"], json!("About Acme"));
    assert!(result.pages_failed[0].url.ends_with('/'));
    assert_eq!(result.pages_failed[0].reasons.len(), 3);
}

#[tokio::test]
async fn test_nothing_fetchable_is_fetch_exhausted() {
    let server = MockServer::start().await;
    mount_probe_ok(&server).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let options = ScanOptions {
        max_pages: 2,
        ..Default::default()
    };
    let error = scanner(2)
        .scan_domain(&domain_of(&server), &options)
        .await
        .expect_err("Every page is missing");

    match &error {
        ScanError::FetchExhausted {
            origin, failures, ..
        } => {
            assert_eq!(origin, &server.uri());
            assert_eq!(failures.len(), 3);
        }
        other => panic!("expected FetchExhausted, got {:?}", other),
    }

    let partial = error.partial().expect("Partial result is kept");
    assert_eq!(partial.stage, ScanStage::Error);
    assert!(partial.resolution_validated);
    assert!(!partial.home_fetched);
    assert_eq!(partial.pages_failed.len(), 3);
}

#[tokio::test]
async fn test_unreachable_domain_is_resolution_failure() {
    let domain = closed_port_domain();
    let options = ScanOptions {
        max_pages: 2,
        ..Default::default()
    };

    let error = scanner(2)
        .scan_domain(&domain, &options)
        .await
        .expect_err("Nothing listens on the port");

    match error {
        ScanError::DomainResolution {
            domain: failed,
            attempted,
            failures,
        } => {
            assert_eq!(failed, domain);
            assert_eq!(
                attempted,
                vec![format!("https://{}", domain), format!("http://{}", domain)]
            );
            assert!(failures.len() >= 2);

            // The home page and the conventional paths tried after it are reported too
            let home = format!("https://{}/: ", domain);
            let about = format!("https://{}/about: ", domain);
            assert!(failures.iter().any(|f| f.starts_with(&home)));
            assert!(failures.iter().any(|f| f.starts_with(&about)));
        }
        other => panic!("expected DomainResolution, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_host_reports_every_origin_variant() {
    // Names under .invalid never resolve
    let domain = "acme-robotics.invalid";
    let options = ScanOptions {
        max_pages: 1,
        ..Default::default()
    };

    let error = scanner(2)
        .scan_domain(domain, &options)
        .await
        .expect_err("The name does not exist");

    match error {
        ScanError::DomainResolution {
            domain: failed,
            attempted,
            failures,
        } => {
            assert_eq!(failed, domain);
            assert_eq!(
                attempted,
                vec![
                    "https://acme-robotics.invalid",
                    "https://www.acme-robotics.invalid",
                    "http://acme-robotics.invalid",
                    "http://www.acme-robotics.invalid",
                ]
            );
            assert!(failures.len() >= 4);
        }
        other => panic!("expected DomainResolution, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deadline_keeps_partial_result() {
    let server = MockServer::start().await;
    mount_probe_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html_response(html_page("Slow", &[])).set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let options = ScanOptions {
        timeout: Duration::from_millis(500),
        company_name: Some("Slowco".to_string()),
        ..Default::default()
    };
    let error = scanner(2)
        .scan_domain(&domain_of(&server), &options)
        .await
        .expect_err("The home page outlives the deadline");

    match &error {
        ScanError::Timeout {
            stage, elapsed_ms, ..
        } => {
            assert_eq!(*stage, ScanStage::FetchHome);
            assert!(*elapsed_ms >= 500);
        }
        other => panic!("expected Timeout, got {:?}", other),
    }

    let partial = error.partial().unwrap();
    assert!(partial.resolution_validated);
    assert_eq!(partial.resolved_origin, Some(server.uri()));
    assert_eq!(partial.partial_signals["company_name"], json!("Slowco"));
}

#[tokio::test]
async fn test_gate_bounds_concurrent_scans() {
    let server = MockServer::start().await;
    mount_probe_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html_response(html_page("Home", &[])).set_delay(Duration::from_millis(150)),
        )
        .mount(&server)
        .await;

    let config = test_config();
    let profile = test_profile(4).with_chunk_size(8);
    let scanner = Scanner::new(config, profile).unwrap();

    let domains: Vec<String> = (0..15).map(|_| domain_of(&server)).collect();
    let options = ScanOptions {
        max_pages: 1,
        ..Default::default()
    };

    let results = scanner.scan_many(&domains, &options).await;

    assert_eq!(results.len(), 15);
    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert!(scanner.gate().peak_in_flight() <= 4);
    assert!(scanner.gate().peak_in_flight() >= 2);
    assert_eq!(scanner.gate().in_flight(), 0);
    assert_eq!(scanner.gate().available(), 4);
}

#[tokio::test]
async fn test_one_failure_does_not_affect_siblings() {
    let server = company_site().await;
    let domains = vec![domain_of(&server), closed_port_domain()];
    let options = ScanOptions {
        max_pages: 2,
        ..Default::default()
    };

    let results = scanner(2).scan_many(&domains, &options).await;

    assert_eq!(results[0].0, domains[0]);
    assert!(results[0].1.is_ok());
    assert!(matches!(
        results[1].1,
        Err(ScanError::DomainResolution { .. })
    ));
}

#[tokio::test]
async fn test_coalescer_batches_concurrent_requests() {
    let server = company_site().await;
    let domain = domain_of(&server);

    let scanner = Arc::new(scanner(4));
    let mut batch = scanner.config().batch.clone();
    batch.min_size = 3;
    batch.wait_ms = 100;
    let coalescer = BatchCoalescer::new(Arc::clone(&scanner), &batch);

    let options = ScanOptions {
        max_pages: 1,
        ..Default::default()
    };
    let (a, b, c) = tokio::join!(
        coalescer.submit(domain.clone(), options.clone()),
        coalescer.submit(domain.clone(), options.clone()),
        coalescer.submit(domain.clone(), options.clone()),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    let stats = coalescer.stats();
    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.batches_dispatched, 1);
    assert_eq!(stats.individually_dispatched, 0);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn test_coalescer_lone_request_runs_individually() {
    let server = company_site().await;

    let scanner = Arc::new(scanner(2));
    let coalescer = BatchCoalescer::new(Arc::clone(&scanner), &scanner.config().batch);

    let options = ScanOptions {
        max_pages: 1,
        ..Default::default()
    };
    let result = coalescer.submit(domain_of(&server), options).await;

    assert!(result.is_ok());
    assert_eq!(coalescer.stats().individually_dispatched, 1);
    assert_eq!(coalescer.stats().batches_dispatched, 0);
}
