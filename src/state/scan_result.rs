//! Per-domain scan aggregate
//!
//! Built incrementally by the pipeline. When a scan ends early (timeout or
//! exhausted home page) the value gathered so far travels inside the error.

use crate::extract::{merge_signal, ExtractorFailure, PartialSignal};
use crate::state::ScanStage;
use crate::ScanError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A page that could not be fetched, with one reason per attempted tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub url: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Domain as submitted (normalized)
    pub domain: String,

    /// Origin the domain resolved to
    pub resolved_origin: Option<String>,

    /// False when the origin is the best-effort fallback
    pub resolution_validated: bool,

    /// Candidate origins probed by the resolver, in order
    pub attempted_origins: Vec<String>,

    /// Last stage reached
    pub stage: ScanStage,

    /// Whether the home page itself was fetched
    pub home_fetched: bool,

    /// Label of the tier that fetched the home page
    pub home_tier: Option<String>,

    /// Fetched pages (final URLs), in fetch order
    pub pages_crawled: Vec<String>,

    pub pages_failed: Vec<PageFailure>,

    /// Merged extractor output keyed by signal name
    pub partial_signals: BTreeMap<String, Value>,

    pub extractor_failures: Vec<ExtractorFailure>,

    pub started_at: DateTime<Utc>,

    pub elapsed_ms: u64,
}

impl ScanResult {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            resolved_origin: None,
            resolution_validated: false,
            attempted_origins: Vec::new(),
            stage: ScanStage::Init,
            home_fetched: false,
            home_tier: None,
            pages_crawled: Vec::new(),
            pages_failed: Vec::new(),
            partial_signals: BTreeMap::new(),
            extractor_failures: Vec::new(),
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    /// Moves the scan to `next`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The transition is legal
    /// * `Err(ScanError::InvalidTransition)` - `next` is not a successor of the current stage
    pub fn transition(&mut self, next: ScanStage) -> Result<(), ScanError> {
        if !self.stage.can_transition_to(next) {
            return Err(ScanError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        tracing::trace!("{}: {} -> {}", self.domain, self.stage, next);
        self.stage = next;
        Ok(())
    }

    /// Records a fetched page; duplicates (e.g. two links redirecting to the
    /// same page) are kept once
    pub fn record_page(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.pages_crawled.contains(&url) {
            return false;
        }
        self.pages_crawled.push(url);
        true
    }

    pub fn record_failure(&mut self, url: impl Into<String>, reasons: Vec<String>) {
        self.pages_failed.push(PageFailure {
            url: url.into(),
            reasons,
        });
    }

    /// Merges one extractor output into the aggregate
    pub fn merge_signal(&mut self, name: &str, signal: PartialSignal) {
        merge_signal(&mut self.partial_signals, name, signal);
    }

    /// Seeds a caller-supplied singleton signal
    ///
    /// Seeded values are set before any page is processed, so extracted
    /// values for the same name never replace them.
    pub fn seed_signal(&mut self, name: &str, value: Value) {
        self.merge_signal(name, PartialSignal::Single(value));
    }

    pub fn record_extractor_failure(&mut self, failure: ExtractorFailure) {
        self.extractor_failures.push(failure);
    }

    /// Stamps the elapsed time since `started_at`
    pub fn stamp_elapsed(&mut self) {
        let elapsed = Utc::now() - self.started_at;
        self.elapsed_ms = elapsed.num_milliseconds().max(0) as u64;
    }
}
