//! Domain resolution
//!
//! Turns user input such as `Example.com/` into a working origin by probing
//! scheme and `www` variants. Resolution never hard-fails: when no candidate
//! answers, the primary `https://` candidate is returned unvalidated and the
//! fetch engine gets the final word.

use crate::config::{ResolverConfig, ResourceProfile};
use crate::url::{is_ip_literal, normalize_domain_input, origin_string, sibling_tld, strip_www};
use crate::{ConfigError, ScanError};
use lru::LruCache;
use reqwest::{Client, StatusCode};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How a candidate origin was derived from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    Direct,
    WwwVariant,
    PlainHttp,
    PlainHttpWww,
    /// Opt-in `.com` <-> `.es` swap
    SiblingTld,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionCandidate {
    pub origin: String,
    pub strategy: ResolutionStrategy,
}

impl ResolutionCandidate {
    /// The candidate as shown in attempted lists; heuristic candidates carry
    /// their label
    pub fn describe(&self) -> String {
        match self.strategy {
            ResolutionStrategy::SiblingTld => format!("{} (sibling-tld)", self.origin),
            _ => self.origin.clone(),
        }
    }
}

/// Outcome of resolving one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Normalized input domain
    pub input: String,

    /// Origin to fetch from, without trailing slash
    pub origin: String,

    /// True when a probe accepted the origin (or it came from the cache)
    pub validated: bool,

    /// Candidates probed, in order; empty on a cache hit
    pub attempted: Vec<String>,

    /// One entry per rejected candidate
    pub failures: Vec<String>,

    pub from_cache: bool,
}

/// Resolves domains to origins, caching validated results
///
/// The cache is read with `peek` only, so entries leave in insertion order
/// once it is full.
#[derive(Debug)]
pub struct DomainResolver {
    cache: Mutex<LruCache<String, String>>,
    probe_timeout: Duration,
    sibling_tld: bool,
}

impl DomainResolver {
    pub fn new(config: &ResolverConfig, profile: &ResourceProfile) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(config.domain_cache_size).unwrap_or(NonZeroUsize::MIN),
            )),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms)
                .mul_f64(profile.timeout_multiplier),
            sibling_tld: config.sibling_tld_fallback,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.lock_cache().cap().get()
    }

    /// Returns the cached origin for an input, if any
    pub fn cached(&self, input: &str) -> Option<String> {
        self.lock_cache().peek(&normalize_domain_input(input)).cloned()
    }

    fn lock_cache(&self) -> MutexGuard<'_, LruCache<String, String>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a validated origin; a known domain keeps its cache slot
    fn remember(&self, domain: &str, origin: &str) {
        let mut cache = self.lock_cache();
        if let Some(existing) = cache.peek_mut(domain) {
            *existing = origin.to_string();
        } else if let Some((evicted, _)) = cache.push(domain.to_string(), origin.to_string()) {
            tracing::trace!("Resolution cache full, evicted {}", evicted);
        }
    }

    /// Builds the ordered candidate list for a normalized domain
    ///
    /// `https` before `http`, the domain as given before its `www` toggle,
    /// and the sibling TLD last when enabled. IP literals get no `www` form.
    pub fn candidates(&self, domain: &str) -> Vec<ResolutionCandidate> {
        let primary = domain.to_string();
        let toggled = if is_ip_literal(domain) {
            None
        } else if domain.starts_with("www.") {
            Some(strip_www(domain).to_string())
        } else {
            Some(format!("www.{}", domain))
        };

        let mut candidates = vec![ResolutionCandidate {
            origin: format!("https://{}", primary),
            strategy: ResolutionStrategy::Direct,
        }];
        if let Some(toggled) = &toggled {
            candidates.push(ResolutionCandidate {
                origin: format!("https://{}", toggled),
                strategy: ResolutionStrategy::WwwVariant,
            });
        }
        candidates.push(ResolutionCandidate {
            origin: format!("http://{}", primary),
            strategy: ResolutionStrategy::PlainHttp,
        });
        if let Some(toggled) = &toggled {
            candidates.push(ResolutionCandidate {
                origin: format!("http://{}", toggled),
                strategy: ResolutionStrategy::PlainHttpWww,
            });
        }

        if self.sibling_tld {
            if let Some(sibling) = sibling_tld(domain) {
                candidates.push(ResolutionCandidate {
                    origin: format!("https://{}", sibling),
                    strategy: ResolutionStrategy::SiblingTld,
                });
            }
        }

        candidates
    }

    /// Resolves a domain to a working origin
    ///
    /// # Arguments
    ///
    /// * `client` - Client used for the existence probes
    /// * `input` - Domain as submitted; scheme, path and whitespace are stripped
    ///
    /// # Returns
    ///
    /// * `Ok(Resolution)` - Always, unless the input is empty
    /// * `Err(ScanError::Config)` - The input has no domain in it
    pub async fn resolve(&self, client: &Client, input: &str) -> Result<Resolution, ScanError> {
        let domain = normalize_domain_input(input);
        if domain.is_empty() {
            return Err(ConfigError::InvalidUrl(format!("no domain in '{}'", input)).into());
        }

        let cached = self.lock_cache().peek(&domain).cloned();
        if let Some(origin) = cached {
            tracing::trace!("Resolution cache hit: {} -> {}", domain, origin);
            return Ok(Resolution {
                input: domain,
                origin,
                validated: true,
                attempted: Vec::new(),
                failures: Vec::new(),
                from_cache: true,
            });
        }

        let candidates = self.candidates(&domain);
        let mut attempted = Vec::with_capacity(candidates.len());
        let mut failures = Vec::new();

        for candidate in &candidates {
            attempted.push(candidate.describe());

            match self.probe(client, &candidate.origin).await {
                Ok(origin) => {
                    tracing::debug!(
                        "Resolved {} -> {} via {:?}",
                        domain,
                        origin,
                        candidate.strategy
                    );
                    self.remember(&domain, &origin);
                    return Ok(Resolution {
                        input: domain,
                        origin,
                        validated: true,
                        attempted,
                        failures,
                        from_cache: false,
                    });
                }
                Err(reason) => {
                    tracing::debug!("Probe of {} failed: {}", candidate.origin, reason);
                    failures.push(format!("{}: {}", candidate.describe(), reason));
                }
            }
        }

        let fallback = candidates
            .first()
            .map(|c| c.origin.clone())
            .unwrap_or_else(|| format!("https://{}", domain));

        tracing::info!(
            "No origin candidate answered for {}, falling back to {}",
            domain,
            fallback
        );

        Ok(Resolution {
            input: domain,
            origin: fallback,
            validated: false,
            attempted,
            failures,
            from_cache: false,
        })
    }

    /// Lightweight existence check
    ///
    /// A HEAD request following redirects. Success, redirect, 403 (site
    /// blocks probes) and 405 (HEAD not allowed) all prove the site exists.
    /// Returns the origin of the final URL.
    async fn probe(&self, client: &Client, origin: &str) -> Result<String, String> {
        let response = client
            .head(origin)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| crate::crawler::fetcher::describe_error(&e))?;

        let status = response.status();
        if status.is_success()
            || status.is_redirection()
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::METHOD_NOT_ALLOWED
        {
            Ok(origin_string(response.url()))
        } else {
            Err(format!("HTTP {}", status.as_u16()))
        }
    }
}
