//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! Every failure mode fails open: a robots.txt that cannot be fetched or read
//! never blocks a page fetch.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::{robots_token, ParsedRobots};

use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches robots.txt for the origin of `page_url`
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `page_url` - Any URL on the host whose robots.txt is wanted
/// * `timeout` - Upper bound for the whole request
///
/// # Returns
///
/// The parsed rules on a 2xx response; an allow-all value on 4xx, 5xx,
/// transport errors and timeouts.
pub async fn fetch_robots(client: &Client, page_url: &Url, timeout: Duration) -> ParsedRobots {
    let robots_url = match page_url.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", page_url, e);
            return ParsedRobots::allow_all();
        }
    };

    let response = match client.get(robots_url.clone()).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {} (allowing)", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    let status = response.status();
    if status.is_client_error() {
        tracing::debug!("{} returned {}, treating as allow-all", robots_url, status);
        return ParsedRobots::allow_all();
    }
    if !status.is_success() {
        tracing::warn!("{} returned {} (allowing)", robots_url, status);
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::warn!("Failed to read {}: {} (allowing)", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}
