//! Scan submission request and its validation
//!
//! Validation happens before any network activity. A request names exactly
//! one domain or a list of domains, never both.

use crate::crawler::{ScanOptions, DEFAULT_MAX_PAGES, DEFAULT_SCAN_TIMEOUT, MAX_PAGES_LIMIT};
use crate::url::normalize_domain_input;
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Longest per-request deadline a caller may ask for
pub const MAX_TIMEOUT_SECS: f64 = 600.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanRequest {
    pub domain: Option<String>,
    pub domains: Option<Vec<String>>,
    pub max_pages: Option<usize>,
    pub extra_urls: Vec<String>,
    pub respect_robots: Option<bool>,
    pub timeout_sec: Option<f64>,
    pub company_name: Option<String>,
    pub company_linkedin: Option<String>,
}

/// What a validated request asks for
#[derive(Debug, Clone, PartialEq)]
pub enum ScanTarget {
    Single(String),
    Batch(Vec<String>),
}

/// A validated request
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    pub target: ScanTarget,
    pub options: ScanOptions,
}

impl ScanRequest {
    /// Checks the request and turns it into a plan
    ///
    /// # Arguments
    ///
    /// * `max_batch_domains` - Upper bound on the size of a domain list
    ///
    /// # Returns
    ///
    /// * `Ok(ScanPlan)` - Target and per-domain options
    /// * `Err(ConfigError)` - The combination of inputs is invalid
    pub fn validate(&self, max_batch_domains: usize) -> ConfigResult<ScanPlan> {
        let target = match (&self.domain, &self.domains) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "provide either 'domain' or 'domains', not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::Validation(
                    "one of 'domain' or 'domains' is required".to_string(),
                ))
            }
            (Some(domain), None) => ScanTarget::Single(checked_domain(domain)?),
            (None, Some(domains)) => ScanTarget::Batch(checked_domains(domains, max_batch_domains)?),
        };

        Ok(ScanPlan {
            target,
            options: self.options()?,
        })
    }

    fn options(&self) -> ConfigResult<ScanOptions> {
        let max_pages = self.max_pages.unwrap_or(DEFAULT_MAX_PAGES);
        if !(1..=MAX_PAGES_LIMIT).contains(&max_pages) {
            return Err(ConfigError::Validation(format!(
                "max_pages must be between 1 and {}, got {}",
                MAX_PAGES_LIMIT, max_pages
            )));
        }

        let timeout = match self.timeout_sec {
            None => DEFAULT_SCAN_TIMEOUT,
            Some(secs) if secs.is_finite() && secs > 0.0 && secs <= MAX_TIMEOUT_SECS => {
                Duration::from_secs_f64(secs)
            }
            Some(secs) => {
                return Err(ConfigError::Validation(format!(
                    "timeout_sec must be greater than 0 and at most {}, got {}",
                    MAX_TIMEOUT_SECS, secs
                )))
            }
        };

        let extra_urls = self
            .extra_urls
            .iter()
            .map(|raw| checked_url(raw))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(ScanOptions {
            max_pages,
            extra_urls,
            respect_robots: self.respect_robots.unwrap_or(true),
            timeout,
            company_name: non_blank(&self.company_name),
            company_linkedin: non_blank(&self.company_linkedin),
        })
    }
}

fn checked_domain(raw: &str) -> ConfigResult<String> {
    let domain = normalize_domain_input(raw);
    if domain.is_empty() {
        return Err(ConfigError::Validation("domain cannot be empty".to_string()));
    }
    if domain.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidUrl(format!("'{}' is not a domain", raw)));
    }
    Ok(domain)
}

/// Validates a domain list, dropping duplicates but keeping order
fn checked_domains(raw: &[String], max_batch_domains: usize) -> ConfigResult<Vec<String>> {
    if raw.is_empty() {
        return Err(ConfigError::Validation(
            "'domains' must contain at least one domain".to_string(),
        ));
    }
    if raw.len() > max_batch_domains {
        return Err(ConfigError::Validation(format!(
            "at most {} domains per batch, got {}",
            max_batch_domains,
            raw.len()
        )));
    }

    let mut domains: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let domain = checked_domain(entry)?;
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    Ok(domains)
}

fn checked_url(raw: &str) -> ConfigResult<String> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(ConfigError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            raw, other
        ))),
    }
}

/// Empty strings count as absent
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
