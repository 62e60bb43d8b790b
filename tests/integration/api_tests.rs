//! HTTP API tests against a locally served router

use crate::common::{
    closed_port_domain, domain_of, html_page, html_response, mount_probe_ok, test_config,
    test_profile,
};
use serde_json::{json, Value};
use signal_scan::api::{self, AppState};
use signal_scan::crawler::Scanner;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

/// Serves the API on an ephemeral port and returns its base URL
async fn start_api() -> String {
    let scanner = Arc::new(Scanner::new(test_config(), test_profile(4)).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let _ = api::serve(listener, AppState::new(scanner)).await;
    });

    base
}

async fn site() -> MockServer {
    let server = MockServer::start().await;
    mount_probe_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html_page("Acme", &[])))
        .mount(&server)
        .await;
    server
}

async fn post_scan(base: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/scan", base))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    let text = response.text().await.unwrap();
    (status, serde_json::from_str(&text).unwrap())
}

#[tokio::test]
async fn test_health_reports_profile_and_permits() {
    let base = start_api().await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["scanner"]["profile"]["tier"], "high");
    assert_eq!(body["scanner"]["permits_total"], 4);
    assert_eq!(body["scanner"]["permits_available"], 4);
    assert_eq!(body["scanner"]["domain_cache_entries"], 0);
    assert_eq!(body["coalescer"]["submitted"], 0);
}

#[tokio::test]
async fn test_conflicting_targets_are_rejected() {
    let base = start_api().await;

    let (status, body) = post_scan(
        &base,
        json!({"domain": "a.test", "domains": ["b.test"]}),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["kind"], "configuration_error");
}

#[tokio::test]
async fn test_out_of_range_pages_are_rejected() {
    let base = start_api().await;
    let (status, _) = post_scan(&base, json!({"domain": "a.test", "max_pages": 31})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_single_domain_scan() {
    let server = site().await;
    let base = start_api().await;

    let (status, body) = post_scan(
        &base,
        json!({"domain": domain_of(&server), "max_pages": 1, "company_name": ""}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["scan_type"], "single");
    assert_eq!(body["status"], "success");
    assert_eq!(body["result"]["stage"], "done");
    assert_eq!(body["result"]["partial_signals"]["title"], "Acme");
    assert!(body["result"]["partial_signals"].get("company_name").is_none());
    assert!(body.get("diagnostic").is_none());
}

#[tokio::test]
async fn test_batch_reports_each_domain() {
    let server = site().await;
    let base = start_api().await;
    let good = domain_of(&server);
    let bad = closed_port_domain();

    let (status, body) = post_scan(
        &base,
        json!({"domains": [&good, &bad], "max_pages": 2, "timeout_sec": 20}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["scan_type"], "batch");
    assert_eq!(body["total_domains"], 2);
    assert_eq!(body["successful"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["batch_id"].as_str().unwrap().len(), 16);

    assert_eq!(body["results"][good.as_str()]["status"], "success");

    let failed = &body["results"][bad.as_str()];
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["diagnostic"]["kind"], "domain_resolution_failure");
    assert_eq!(failed["diagnostic"]["stage"], "resolve");
    assert!(!failed["diagnostic"]["suggestions"].as_array().unwrap().is_empty());
}
