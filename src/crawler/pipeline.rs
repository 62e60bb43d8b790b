//! Single-domain scan pipeline
//!
//! `Scanner` owns every shared component (resolver cache, robots cache,
//! client pool, concurrency gate) and runs one pipeline per domain:
//!
//! ```text
//! INIT -> RESOLVE -> FETCH_HOME -> FRONTIER -> FETCH_ADDITIONAL -> AGGREGATE -> DONE
//!                         |
//!                         +-> FETCH_HOME_FAILED -> FRONTIER (fallback paths) ...
//!                                              \-> ERROR
//! ```

use crate::config::{validate, ResourceProfile, ScannerConfig};
use crate::crawler::fetcher::{FetchEngine, FetchedPage};
use crate::crawler::frontier::{
    build_frontier, fallback_frontier, merge_explicit, CrawlCandidate, SourceKind,
    MAX_DISCOVERED_LINKS,
};
use crate::crawler::gate::{ClientPool, ConcurrencyGate};
use crate::crawler::policy::FetchAttemptPolicy;
use crate::crawler::resolver::DomainResolver;
use crate::extract::ExtractorSet;
use crate::state::{ScanResult, ScanStage};
use crate::url::normalize_domain_input;
use crate::{ConfigError, ScanError, UrlError};
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Default overall deadline for one domain
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(90);

/// Default number of pages requested per domain
pub const DEFAULT_MAX_PAGES: usize = 12;

/// Hard upper bound on pages a caller may request
pub const MAX_PAGES_LIMIT: usize = 30;

/// Per-request scan options
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Pages requested, home page included
    pub max_pages: usize,

    /// Extra URLs fetched right after the home page
    pub extra_urls: Vec<String>,

    pub respect_robots: bool,

    /// Deadline for the whole pipeline (the wait for a gate permit excluded)
    pub timeout: Duration,

    /// Known company name, seeded as the `company_name` signal
    pub company_name: Option<String>,

    /// Known LinkedIn URL, seeded as the `linkedin` signal
    pub company_linkedin: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            extra_urls: Vec::new(),
            respect_robots: true,
            timeout: DEFAULT_SCAN_TIMEOUT,
            company_name: None,
            company_linkedin: None,
        }
    }
}

impl ScanOptions {
    /// Pages this request may fetch under `profile`
    pub fn page_budget(&self, profile: &ResourceProfile) -> usize {
        self.max_pages
            .clamp(1, MAX_PAGES_LIMIT)
            .min(profile.page_ceiling.max(1))
    }
}

/// Read-only snapshot of the scanner's shared state
#[derive(Debug, Clone, Serialize)]
pub struct ScannerStatus {
    pub profile: ResourceProfile,
    pub domain_cache_entries: usize,
    pub domain_cache_capacity: usize,
    pub robots_cache_entries: usize,
    pub client_pool_entries: usize,
    pub permits_total: usize,
    pub permits_available: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub extractors: Vec<String>,
}

/// How a pipeline ended without producing any page
enum Terminal {
    Unresolved {
        attempted: Vec<String>,
        failures: Vec<String>,
    },
    Exhausted {
        origin: String,
        failures: Vec<String>,
    },
    Failed(ScanError),
}

impl From<ScanError> for Terminal {
    fn from(e: ScanError) -> Self {
        Terminal::Failed(e)
    }
}

impl From<reqwest::Error> for Terminal {
    fn from(e: reqwest::Error) -> Self {
        Terminal::Failed(e.into())
    }
}

/// Domain scanner
///
/// One instance is shared by every caller; construct it once per process
/// (or once per test) and wrap it in an `Arc`.
#[derive(Debug)]
pub struct Scanner {
    config: ScannerConfig,
    profile: ResourceProfile,
    resolver: DomainResolver,
    fetcher: FetchEngine,
    gate: ConcurrencyGate,
    clients: ClientPool,
    home_policy: FetchAttemptPolicy,
    page_policy: FetchAttemptPolicy,
    extractors: ExtractorSet,
}

impl Scanner {
    /// Creates a scanner with the built-in extractors
    ///
    /// # Arguments
    ///
    /// * `config` - Validated scanner configuration
    /// * `profile` - Resource profile sizing the gate and scaling timeouts
    ///
    /// # Returns
    ///
    /// * `Ok(Scanner)` - Ready to scan
    /// * `Err(ScanError::Config)` - The configuration or tier policy is invalid
    pub fn new(config: ScannerConfig, profile: ResourceProfile) -> Result<Self, ScanError> {
        validate(&config)?;

        let home_policy = FetchAttemptPolicy::from_seconds(
            &config.fetch.tier_timeouts_secs,
            profile.timeout_multiplier,
        )?;
        let page_policy = home_policy.truncated(config.fetch.additional_page_tiers);

        tracing::info!(
            "Scanner ready: profile={} gate={} tiers={} (additional pages: {})",
            profile.tier,
            profile.max_concurrent_domains,
            home_policy.len(),
            page_policy.len()
        );

        Ok(Self {
            resolver: DomainResolver::new(&config.resolver, &profile),
            fetcher: FetchEngine::new(&config),
            gate: ConcurrencyGate::new(profile.max_concurrent_domains),
            clients: ClientPool::new(&config, &profile),
            home_policy,
            page_policy,
            extractors: ExtractorSet::builtin(),
            config,
            profile,
        })
    }

    /// Replaces the extractor set
    pub fn with_extractors(mut self, extractors: ExtractorSet) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn profile(&self) -> &ResourceProfile {
        &self.profile
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn resolver(&self) -> &DomainResolver {
        &self.resolver
    }

    pub fn status(&self) -> ScannerStatus {
        ScannerStatus {
            profile: self.profile,
            domain_cache_entries: self.resolver.cache_len(),
            domain_cache_capacity: self.resolver.cache_capacity(),
            robots_cache_entries: self.fetcher.robots_cache_len(),
            client_pool_entries: self.clients.len(),
            permits_total: self.gate.capacity(),
            permits_available: self.gate.available(),
            in_flight: self.gate.in_flight(),
            peak_in_flight: self.gate.peak_in_flight(),
            extractors: self.extractors.names(),
        }
    }

    /// Scans one domain under the concurrency gate
    ///
    /// # Returns
    ///
    /// * `Ok(ScanResult)` - At least one page was fetched
    /// * `Err(ScanError::DomainResolution)` - No origin answered and nothing could be fetched
    /// * `Err(ScanError::FetchExhausted)` - The origin answered probes but no page could be fetched
    /// * `Err(ScanError::Timeout)` - The deadline expired; carries what was gathered so far
    pub async fn scan_domain(
        &self,
        domain: &str,
        options: &ScanOptions,
    ) -> Result<ScanResult, ScanError> {
        let domain = normalize_domain_input(domain);
        if domain.is_empty() {
            return Err(ConfigError::InvalidUrl("empty domain".to_string()).into());
        }

        let _permit = self.gate.acquire().await?;
        tracing::info!("Scanning {}", domain);

        let mut result = ScanResult::new(&domain);
        seed_hints(&mut result, options);

        let outcome =
            tokio::time::timeout(options.timeout, self.run_pipeline(&domain, options, &mut result))
                .await;
        result.stamp_elapsed();

        match outcome {
            Ok(Ok(())) => {
                tracing::info!(
                    "Finished {}: {} pages, {} failed, {}ms",
                    domain,
                    result.pages_crawled.len(),
                    result.pages_failed.len(),
                    result.elapsed_ms
                );
                Ok(result)
            }
            Ok(Err(Terminal::Unresolved { attempted, failures })) => {
                tracing::warn!("Could not resolve {}", domain);
                Err(ScanError::DomainResolution {
                    domain,
                    attempted,
                    failures,
                })
            }
            Ok(Err(Terminal::Exhausted { origin, failures })) => {
                tracing::warn!("Nothing could be fetched from {} ({})", domain, origin);
                Err(ScanError::FetchExhausted {
                    domain,
                    origin,
                    failures,
                    partial: Box::new(result),
                })
            }
            Ok(Err(Terminal::Failed(e))) => Err(e),
            Err(_) => {
                tracing::warn!(
                    "Scan of {} timed out during {} after {}ms",
                    domain,
                    result.stage,
                    result.elapsed_ms
                );
                Err(ScanError::Timeout {
                    domain,
                    stage: result.stage,
                    elapsed_ms: result.elapsed_ms,
                    partial: Box::new(result),
                })
            }
        }
    }

    /// Scans many domains, delivering each result as soon as it is ready
    ///
    /// At most `batch_chunk_size` pipelines are started at a time; the gate
    /// still bounds how many run. One domain's failure never affects another.
    pub async fn scan_each<F>(&self, items: &[(String, ScanOptions)], mut deliver: F)
    where
        F: FnMut(usize, Result<ScanResult, ScanError>),
    {
        let chunk = self.profile.batch_chunk_size.max(1);

        let mut results = stream::iter(items.iter().cloned().enumerate())
            .map(|(index, (domain, options))| async move {
                (index, self.scan_domain(&domain, &options).await)
            })
            .buffer_unordered(chunk);

        while let Some((index, result)) = results.next().await {
            deliver(index, result);
        }
    }

    /// Scans many domains with shared options; results keep input order
    pub async fn scan_many(
        &self,
        domains: &[String],
        options: &ScanOptions,
    ) -> Vec<(String, Result<ScanResult, ScanError>)> {
        let items: Vec<(String, ScanOptions)> = domains
            .iter()
            .map(|d| (d.clone(), options.clone()))
            .collect();

        let mut slots: Vec<Option<Result<ScanResult, ScanError>>> =
            (0..items.len()).map(|_| None).collect();
        self.scan_each(&items, |index, result| slots[index] = Some(result))
            .await;

        domains
            .iter()
            .cloned()
            .zip(slots)
            .map(|(domain, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(ScanError::BatchDispatch(format!("no result for {}", domain)))
                });
                (domain, result)
            })
            .collect()
    }

    async fn run_pipeline(
        &self,
        domain: &str,
        options: &ScanOptions,
        result: &mut ScanResult,
    ) -> Result<(), Terminal> {
        result.transition(ScanStage::Resolve)?;
        let client = self.clients.client_for(domain)?;
        let resolution = self.resolver.resolve(&client, domain).await?;

        result.resolved_origin = Some(resolution.origin.clone());
        result.resolution_validated = resolution.validated;
        result.attempted_origins = resolution.attempted.clone();

        let origin = Url::parse(&resolution.origin)
            .map_err(|e| ScanError::from(UrlError::Parse(e.to_string())))?;
        let budget = options.page_budget(&self.profile);

        result.transition(ScanStage::FetchHome)?;
        let home = self
            .fetcher
            .fetch_page(&client, &origin, &self.home_policy, options.respect_robots)
            .await;

        let mut home_failures = Vec::new();
        let candidates: Vec<CrawlCandidate> = match home {
            Ok(page) => {
                result.home_fetched = true;
                result.home_tier = Some(page.tier_label.clone());
                self.process_page(result, &page);

                result.transition(ScanStage::Frontier)?;
                let base = Url::parse(&page.final_url).unwrap_or_else(|_| origin.clone());
                let frontier = build_frontier(
                    &base,
                    &page.html,
                    MAX_DISCOVERED_LINKS,
                    budget.saturating_sub(1),
                );
                merge_explicit(frontier, &options.extra_urls, budget)
                    .into_iter()
                    .filter(|c| c.source_kind != SourceKind::Home)
                    .collect()
            }
            Err(failure) => {
                tracing::warn!(
                    "Home page of {} failed on every tier, trying conventional paths",
                    domain
                );
                home_failures = failure.reasons();
                result.record_failure(failure.url.clone(), failure.reasons());

                result.transition(ScanStage::FetchHomeFailed)?;
                result.transition(ScanStage::Frontier)?;
                merge_explicit(fallback_frontier(&origin, budget), &options.extra_urls, budget)
            }
        };

        tracing::debug!("{}: {} additional pages queued", domain, candidates.len());

        result.transition(ScanStage::FetchAdditional)?;
        self.fetch_additional(&client, candidates, options, result).await;

        if result.pages_crawled.is_empty() {
            result.transition(ScanStage::Error)?;
            return Err(if resolution.validated {
                Terminal::Exhausted {
                    origin: resolution.origin,
                    failures: home_failures,
                }
            } else {
                let mut failures = resolution.failures;
                failures.extend(result.pages_failed.iter().flat_map(|page| {
                    page.reasons
                        .iter()
                        .map(move |reason| format!("{}: {}", page.url, reason))
                }));
                Terminal::Unresolved {
                    attempted: resolution.attempted,
                    failures,
                }
            });
        }

        result.transition(ScanStage::Aggregate)?;
        tracing::debug!(
            "{}: {} signals, {} extractor failures",
            domain,
            result.partial_signals.len(),
            result.extractor_failures.len()
        );
        result.transition(ScanStage::Done)?;

        Ok(())
    }

    /// Fetches the frontier with bounded per-domain concurrency
    ///
    /// Pages are handed to the extractors in frontier order as they complete,
    /// so a deadline hit halfway keeps everything processed so far.
    async fn fetch_additional(
        &self,
        client: &Client,
        candidates: Vec<CrawlCandidate>,
        options: &ScanOptions,
        result: &mut ScanResult,
    ) {
        let policy = &self.page_policy;
        let fetcher = &self.fetcher;
        let respect_robots = options.respect_robots;

        let mut pages = stream::iter(candidates)
            .map(|candidate| async move {
                let outcome = match Url::parse(&candidate.url) {
                    Ok(url) => fetcher
                        .fetch_page(client, &url, policy, respect_robots)
                        .await
                        .map_err(|f| f.reasons()),
                    Err(e) => Err(vec![format!("invalid URL: {}", e)]),
                };
                (candidate, outcome)
            })
            .buffered(self.config.fetch.page_concurrency.max(1));

        while let Some((candidate, outcome)) = pages.next().await {
            match outcome {
                Ok(page) => self.process_page(result, &page),
                Err(reasons) => {
                    tracing::debug!(
                        "Skipping {} ({:?}): {}",
                        candidate.url,
                        candidate.source_kind,
                        reasons.join("; ")
                    );
                    result.record_failure(candidate.url, reasons);
                }
            }
        }
    }

    /// Records a page and merges its extractor output
    fn process_page(&self, result: &mut ScanResult, page: &FetchedPage) {
        if !result.record_page(page.final_url.clone()) {
            tracing::debug!("{} already processed", page.final_url);
            return;
        }

        let Ok(url) = Url::parse(&page.final_url) else {
            return;
        };

        let extracted = self.extractors.run(&url, &page.html);
        for (name, signal) in extracted.signals {
            result.merge_signal(&name, signal);
        }
        for failure in extracted.failures {
            result.record_extractor_failure(failure);
        }
    }
}

/// Seeds caller-supplied hints before any page is processed
fn seed_hints(result: &mut ScanResult, options: &ScanOptions) {
    if let Some(name) = options.company_name.as_deref().and_then(normalize_company_name) {
        result.seed_signal("company_name", Value::String(name));
    }
    if let Some(linkedin) = options
        .company_linkedin
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        result.seed_signal("linkedin", Value::String(linkedin.to_string()));
    }
}

fn legal_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| {
        Regex::new(r"(?i)\b(inc|llc|s\.a\.|s\.l\.|ltd|corp|co)\.?$")
            .expect("Invalid legal suffix regex")
    })
}

/// Collapses whitespace and strips a trailing legal-entity suffix
///
/// # Examples
///
/// ```
/// use signal_scan::crawler::normalize_company_name;
///
/// assert_eq!(normalize_company_name("  Acme   Robotics, Inc. "), Some("Acme Robotics".to_string()));
/// assert_eq!(normalize_company_name("Inc."), None);
/// ```
pub fn normalize_company_name(name: &str) -> Option<String> {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = legal_suffix().replace(&collapsed, "");
    let cleaned = stripped.trim().trim_end_matches(',').trim();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
