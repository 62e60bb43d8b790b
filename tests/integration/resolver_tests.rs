//! Domain resolution against live mock servers

use crate::common::{closed_port_domain, domain_of, mount_probe_ok, test_config, test_profile};
use signal_scan::crawler::{build_http_client, DomainResolver};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver_and_client() -> (DomainResolver, reqwest::Client) {
    let config = test_config();
    let profile = test_profile(4);
    (
        DomainResolver::new(&config.resolver, &profile),
        build_http_client(&config, &profile).expect("Failed to build client"),
    )
}

#[tokio::test]
async fn test_plain_http_origin_is_found_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let domain = domain_of(&server);
    let (resolver, client) = resolver_and_client();

    let first = resolver.resolve(&client, &domain).await.unwrap();
    assert!(first.validated);
    assert!(!first.from_cache);
    assert_eq!(first.origin, format!("http://{}", domain));
    // https is tried first; an IP literal has no www form
    assert_eq!(
        first.attempted,
        vec![format!("https://{}", domain), format!("http://{}", domain)]
    );
    assert_eq!(first.failures.len(), 1);

    let second = resolver.resolve(&client, &format!("HTTP://{}/about", domain)).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.origin, first.origin);
    assert_eq!(resolver.cache_len(), 1);
}

#[tokio::test]
async fn test_head_not_allowed_still_proves_existence() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    let (resolver, client) = resolver_and_client();
    let resolution = resolver.resolve(&client, &domain_of(&server)).await.unwrap();

    assert!(resolution.validated);
}

#[tokio::test]
async fn test_forbidden_still_proves_existence() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let (resolver, client) = resolver_and_client();
    let resolution = resolver.resolve(&client, &domain_of(&server)).await.unwrap();

    assert!(resolution.validated);
}

#[tokio::test]
async fn test_redirect_is_followed_to_final_origin() {
    let target = MockServer::start().await;
    mount_probe_ok(&target).await;

    let source = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/", target.uri()).as_str()),
        )
        .mount(&source)
        .await;

    let (resolver, client) = resolver_and_client();
    let resolution = resolver.resolve(&client, &domain_of(&source)).await.unwrap();

    assert!(resolution.validated);
    assert_eq!(resolution.origin, target.uri());
}

#[tokio::test]
async fn test_unreachable_domain_falls_back_unvalidated() {
    let domain = closed_port_domain();
    let (resolver, client) = resolver_and_client();

    let resolution = resolver.resolve(&client, &domain).await.unwrap();

    assert!(!resolution.validated);
    assert_eq!(resolution.origin, format!("https://{}", domain));
    assert_eq!(resolution.attempted.len(), 2);
    assert_eq!(resolution.failures.len(), 2);
    // Unvalidated origins are never cached
    assert_eq!(resolver.cached(&domain), None);
    assert_eq!(resolver.cache_len(), 0);
}

#[tokio::test]
async fn test_not_found_everywhere_is_unvalidated() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (resolver, client) = resolver_and_client();
    let resolution = resolver.resolve(&client, &domain_of(&server)).await.unwrap();

    assert!(!resolution.validated);
    assert!(resolution.failures.iter().any(|f| f.contains("HTTP 404")));
}
