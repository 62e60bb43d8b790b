use signal_scan::config::{ProfileTier, ResourceProfile, ScannerConfig};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Short, strictly increasing tiers so failures surface quickly
pub const TEST_TIERS: &[f64] = &[0.3, 0.8, 1.5];

/// Creates a configuration tuned for local mock servers
pub fn test_config() -> ScannerConfig {
    let mut config = ScannerConfig::default();
    config.fetch.tier_timeouts_secs = TEST_TIERS.to_vec();
    config.fetch.additional_page_tiers = 2;
    config.resolver.probe_timeout_ms = 1_000;
    config.batch.wait_ms = 50;
    config.user_agent = "SignalScanTest/1.0".to_string();
    config
}

/// A profile with no timeout scaling and the given gate size
pub fn test_profile(concurrency: usize) -> ResourceProfile {
    ResourceProfile::for_tier(ProfileTier::High).with_concurrency(concurrency)
}

/// `host:port` of a mock server, usable as a scan domain
pub fn domain_of(server: &MockServer) -> String {
    server.address().to_string()
}

/// A port with nothing listening on it
pub fn closed_port_domain() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    addr.to_string()
}

/// Answers every existence probe
pub async fn mount_probe_ok(server: &MockServer) {
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// An HTML page with a title and the given links
pub fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "<html><head><title>{}</title></head><body>\n{}\n</body></html>",
        title, anchors
    )
}

pub fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html; charset=utf-8")
}
