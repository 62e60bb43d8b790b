//! HTTP fetcher implementation
//!
//! This module handles all page requests for the scanner, including:
//! - Building HTTP clients with the configured user agent and pool limits
//! - Per-host robots.txt checks (cached, fail-open)
//! - Escalating-timeout GET attempts
//! - Byte-capped body reads and charset decoding

use crate::config::{ResourceProfile, ScannerConfig};
use crate::crawler::policy::{run_tiers, AttemptError, FetchAttemptPolicy, TierFailure, TierOutcome};
use crate::robots::{fetch_robots, robots_token, ParsedRobots, RobotsCache};
use crate::url::host_key;
use encoding_rs::{Encoding, UTF_8};
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client, Response};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// Upper bound for a robots.txt request
const MAX_ROBOTS_TIMEOUT: Duration = Duration::from_secs(5);

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: String,

    /// Final URL after redirects
    pub final_url: String,

    pub status_code: u16,

    /// Decoded page body
    pub html: String,

    /// Raw bytes read before decoding
    pub bytes_read: usize,

    /// Whether the body was cut at the byte cap
    pub truncated: bool,

    /// Index of the tier that succeeded
    pub tier_index: usize,

    /// Label of the tier that succeeded
    pub tier_label: String,

    /// Failures of the tiers tried before the winning one
    pub earlier_failures: Vec<TierFailure>,
}

/// Every tier failed for one URL
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub url: String,
    pub failures: Vec<TierFailure>,
}

impl FetchFailure {
    pub fn reasons(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.to_string()).collect()
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.url, self.reasons().join("; "))
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - Scanner configuration (user agent, pool limits, connect timeout)
/// * `profile` - Resource profile; its multiplier scales the connect timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &ScannerConfig,
    profile: &ResourceProfile,
) -> Result<Client, reqwest::Error> {
    let connect_timeout =
        Duration::from_millis(config.fetch.connect_timeout_ms).mul_f64(profile.timeout_multiplier);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(connect_timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .pool_max_idle_per_host(config.pool.pool_max_idle_per_host)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetch engine: robots compliance plus the tiered GET
///
/// The robots cache lives here, so every scan sharing an engine shares
/// robots.txt lookups.
#[derive(Debug)]
pub struct FetchEngine {
    robots: Mutex<RobotsCache>,
    agent_token: String,
    max_html_bytes: usize,
}

impl FetchEngine {
    pub fn new(config: &ScannerConfig) -> Self {
        let ttl = chrono::Duration::seconds(config.fetch.robots_ttl_secs as i64);
        Self {
            robots: Mutex::new(RobotsCache::new(config.fetch.robots_cache_size, ttl)),
            agent_token: robots_token(&config.user_agent),
            max_html_bytes: config.fetch.max_html_bytes,
        }
    }

    pub fn max_html_bytes(&self) -> usize {
        self.max_html_bytes
    }

    pub fn robots_cache_len(&self) -> usize {
        self.robots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Fetches one page, escalating through the policy tiers
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use
    /// * `url` - The page to fetch
    /// * `policy` - Tier timeouts, shortest first
    /// * `respect_robots` - Whether robots.txt is consulted
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - The first tier that produced a non-empty body
    /// * `Err(FetchFailure)` - One failure per attempted tier
    pub async fn fetch_page(
        &self,
        client: &Client,
        url: &Url,
        policy: &FetchAttemptPolicy,
        respect_robots: bool,
    ) -> Result<FetchedPage, FetchFailure> {
        let outcome = run_tiers(policy, |_, tier| async move {
            if respect_robots {
                let robots_timeout = (tier.timeout / 2).min(MAX_ROBOTS_TIMEOUT);
                if !self.robots_allows(client, url, robots_timeout).await {
                    return Err(AttemptError::Abort("disallowed by robots.txt".to_string()));
                }
            }
            self.attempt(client, url).await
        })
        .await;

        match outcome {
            TierOutcome::Succeeded {
                value: mut page,
                tier_index,
                tier,
                earlier_failures,
            } => {
                tracing::debug!(
                    "Fetched {} on tier {} ({} bytes{})",
                    url,
                    tier.label,
                    page.bytes_read,
                    if page.truncated { ", truncated" } else { "" }
                );
                page.tier_index = tier_index;
                page.tier_label = tier.label;
                page.earlier_failures = earlier_failures;
                Ok(page)
            }
            TierOutcome::Exhausted { failures } => {
                tracing::debug!("All {} tiers failed for {}", failures.len(), url);
                Err(FetchFailure {
                    url: url.to_string(),
                    failures,
                })
            }
        }
    }

    /// Checks robots.txt for `url`, fetching and caching it on a miss
    ///
    /// Any failure along the way permits the fetch.
    async fn robots_allows(&self, client: &Client, url: &Url, timeout: Duration) -> bool {
        let Some(key) = host_key(url) else {
            return true;
        };

        let cached = self
            .robots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key);

        let robots = match cached {
            Some(robots) => {
                tracing::trace!("robots.txt cache hit for {}", key);
                robots
            }
            None => {
                let robots = fetch_robots(client, url, timeout).await;
                self.robots
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key, robots.clone());
                robots
            }
        };

        robots_permits(&robots, url, &self.agent_token)
    }

    /// A single GET attempt
    async fn attempt(&self, client: &Client, url: &Url) -> Result<FetchedPage, AttemptError> {
        let response = client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| AttemptError::Retry(describe_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Retry(format!("HTTP {}", status.as_u16())));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let (bytes, truncated) = read_capped(response, self.max_html_bytes)
            .await
            .map_err(|e| AttemptError::Retry(describe_error(&e)))?;

        let html = decode_body(&bytes, content_type.as_deref());
        if html.trim().is_empty() {
            return Err(AttemptError::Retry("empty body".to_string()));
        }

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status_code: status.as_u16(),
            html,
            bytes_read: bytes.len(),
            truncated,
            tier_index: 0,
            tier_label: String::new(),
            earlier_failures: Vec::new(),
        })
    }
}

/// Robots rules checked for the agent's product token, then for `*`
fn robots_permits(robots: &ParsedRobots, url: &Url, agent_token: &str) -> bool {
    robots.is_allowed(url.as_str(), agent_token) || robots.is_allowed(url.as_str(), "*")
}

/// Reads a response body, stopping once `cap` bytes are accumulated
///
/// # Returns
///
/// The bytes read and whether the body was cut short
pub async fn read_capped(
    mut response: Response,
    cap: usize,
) -> Result<(Vec<u8>, bool), reqwest::Error> {
    let mut body = Vec::new();

    while let Some(chunk) = response.chunk().await? {
        let remaining = cap.saturating_sub(body.len());
        if chunk.len() > remaining {
            body.extend_from_slice(&chunk[..remaining]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
        if body.len() >= cap {
            break;
        }
    }

    Ok((body, false))
}

/// Decodes a body using the charset declared in `Content-Type`
///
/// Falls back to UTF-8 (a byte-order mark wins over both). Undecodable
/// bytes are dropped.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.replace('\u{FFFD}', "")
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').trim_matches('\''))
        } else {
            None
        }
    })
}

/// Short description of a transport error
pub fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_body() || error.is_decode() {
        format!("body read failed: {}", error)
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let config = ScannerConfig::default();
        let client = build_http_client(&config, &ResourceProfile::minimal());
        assert!(client.is_ok());
    }

    #[test]
    fn test_charset_label() {
        assert_eq!(charset_label("text/html; charset=ISO-8859-1"), Some("ISO-8859-1"));
        assert_eq!(charset_label("text/html;Charset=\"utf-8\""), Some("utf-8"));
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn test_decode_latin1() {
        let bytes = b"<p>Compa\xf1\xeda</p>";
        let text = decode_body(bytes, Some("text/html; charset=iso-8859-1"));
        assert_eq!(text, "<p>Compañía</p>");
    }

    #[test]
    fn test_decode_defaults_to_utf8() {
        let text = decode_body("<p>Compañía</p>".as_bytes(), None);
        assert_eq!(text, "<p>Compañía</p>");
    }

    #[test]
    fn test_decode_drops_undecodable_bytes() {
        // Body cut in the middle of a multi-byte character
        let mut bytes = "<p>caf".as_bytes().to_vec();
        bytes.push(0xC3);
        let text = decode_body(&bytes, Some("text/html; charset=utf-8"));
        assert_eq!(text, "<p>caf");
    }

    #[test]
    fn test_unknown_charset_falls_back() {
        let text = decode_body(b"hello", Some("text/html; charset=klingon"));
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_robots_permits_falls_back_to_wildcard() {
        let robots = ParsedRobots::from_content("User-agent: Mozilla\nDisallow: /\n\nUser-agent: *\nAllow: /");
        let url = Url::parse("https://example.com/about").unwrap();
        assert!(robots_permits(&robots, &url, "Mozilla"));

        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /private");
        let url = Url::parse("https://example.com/private/x").unwrap();
        assert!(!robots_permits(&robots, &url, "Mozilla"));
    }

    #[test]
    fn test_fetch_failure_display() {
        let failure = FetchFailure {
            url: "https://example.com/".to_string(),
            failures: vec![TierFailure {
                tier: "ultra-fast".to_string(),
                timeout_ms: 3000,
                reason: "HTTP 503".to_string(),
            }],
        };
        assert_eq!(
            failure.to_string(),
            "https://example.com/: ultra-fast (3000ms): HTTP 503"
        );
    }
}
