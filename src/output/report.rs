//! Per-domain outcomes and the batch report

use crate::config::ResourceProfile;
use crate::output::diagnostic::ScanDiagnostic;
use crate::state::ScanResult;
use crate::ScanError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// Length of the hex batch fingerprint
const BATCH_ID_LEN: usize = 16;

/// Errors raised while rendering or writing a report
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Success,
    Failed,
}

/// What one domain produced: a result, or a diagnostic plus whatever was
/// gathered before the failure
#[derive(Debug, Clone, Serialize)]
pub struct DomainOutcome {
    pub status: DomainStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<ScanDiagnostic>,
}

impl DomainOutcome {
    pub fn is_success(&self) -> bool {
        self.status == DomainStatus::Success
    }

    pub fn pages_crawled(&self) -> usize {
        self.result
            .as_ref()
            .map(|r| r.pages_crawled.len())
            .unwrap_or(0)
    }
}

impl From<Result<ScanResult, ScanError>> for DomainOutcome {
    fn from(outcome: Result<ScanResult, ScanError>) -> Self {
        match outcome {
            Ok(result) => Self {
                status: DomainStatus::Success,
                result: Some(result),
                diagnostic: None,
            },
            Err(error) => Self {
                status: DomainStatus::Failed,
                result: error.partial().cloned(),
                diagnostic: Some(ScanDiagnostic::from_error(&error)),
            },
        }
    }
}

/// Summary of an explicit batch, keyed by domain
#[derive(Debug, Clone, Serialize)]
pub struct BatchScanReport {
    pub batch_id: String,
    pub started_at: DateTime<Utc>,
    pub total_domains: usize,
    pub successful: usize,
    pub failed: usize,
    pub execution_ms: u64,
    pub resource_profile: ResourceProfile,
    pub results: BTreeMap<String, DomainOutcome>,
}

impl BatchScanReport {
    /// Opens a report for `domains`, stamping the start time
    pub fn new(domains: &[String], resource_profile: ResourceProfile) -> Self {
        let started_at = Utc::now();
        Self {
            batch_id: batch_fingerprint(domains, &started_at),
            started_at,
            total_domains: domains.len(),
            successful: 0,
            failed: 0,
            execution_ms: 0,
            resource_profile,
            results: BTreeMap::new(),
        }
    }

    /// Records one domain's outcome
    pub fn record(&mut self, domain: impl Into<String>, outcome: Result<ScanResult, ScanError>) {
        let outcome = DomainOutcome::from(outcome);
        if outcome.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.results.insert(domain.into(), outcome);
    }

    /// Stamps the execution time
    pub fn finish(&mut self) {
        let elapsed = Utc::now() - self.started_at;
        self.execution_ms = elapsed.num_milliseconds().max(0) as u64;
    }

    /// Percentage of domains that produced a result
    pub fn success_rate(&self) -> f64 {
        if self.total_domains == 0 {
            0.0
        } else {
            (self.successful as f64 / self.total_domains as f64) * 100.0
        }
    }

    /// Pages fetched across all domains, partial results included
    pub fn pages_crawled(&self) -> usize {
        self.results.values().map(DomainOutcome::pages_crawled).sum()
    }

    pub fn to_json(&self) -> OutputResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Short SHA-256 fingerprint of a domain list and its start time
///
/// # Arguments
///
/// * `domains` - Domains in submission order
/// * `started_at` - When the batch started
///
/// # Returns
///
/// The first 16 hex characters of the digest
pub fn batch_fingerprint(domains: &[String], started_at: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    for domain in domains {
        hasher.update(domain.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(started_at.to_rfc3339().as_bytes());

    let mut id = hex::encode(hasher.finalize());
    id.truncate(BATCH_ID_LEN);
    id
}
