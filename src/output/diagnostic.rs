//! Structured failure diagnostics
//!
//! Every user-visible failure says which stage was reached, what was
//! attempted and what went wrong, so a caller can decide whether a retry
//! with different options is worth it.

use crate::state::{ScanResult, ScanStage};
use crate::ScanError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanDiagnostic {
    /// Machine-readable error kind (see [`ScanError::kind`])
    pub kind: String,

    /// Stage the scan had reached when it failed
    pub stage: ScanStage,

    pub message: String,

    /// Origins and pages that were tried, in order
    pub attempted: Vec<String>,

    /// One entry per failed attempt
    pub errors: Vec<String>,

    pub suggestions: Vec<String>,
}

impl ScanDiagnostic {
    /// Builds the diagnostic for a failed scan
    pub fn from_error(error: &ScanError) -> Self {
        let mut diagnostic = Self {
            kind: error.kind().to_string(),
            stage: ScanStage::Init,
            message: error.to_string(),
            attempted: Vec::new(),
            errors: Vec::new(),
            suggestions: Vec::new(),
        };

        match error {
            ScanError::DomainResolution {
                attempted,
                failures,
                ..
            } => {
                diagnostic.stage = ScanStage::Resolve;
                diagnostic.attempted = attempted.clone();
                diagnostic.errors = failures.clone();
                diagnostic.suggest(&[
                    "Check the spelling of the domain",
                    "Verify the site is reachable from this network",
                    "Set SIGNALSCAN_SIBLING_TLD_FALLBACK=true if the company uses a .com/.es sibling",
                ]);
            }
            ScanError::FetchExhausted {
                origin,
                failures,
                partial,
                ..
            } => {
                diagnostic.stage = ScanStage::FetchHomeFailed;
                diagnostic.attempted.push(origin.clone());
                diagnostic.errors = failures.clone();
                diagnostic.absorb_pages(partial);
                diagnostic.suggest(&[
                    "The site may be rejecting automated clients; retry later",
                    "Increase timeout_sec to give slow origins more time",
                    "Pass extra_urls pointing at pages known to exist",
                ]);
            }
            ScanError::Timeout { stage, partial, .. } => {
                diagnostic.stage = *stage;
                diagnostic.attempted = partial.attempted_origins.clone();
                diagnostic.absorb_pages(partial);
                diagnostic.suggest(&[
                    "Increase timeout_sec",
                    "Lower max_pages to shorten the crawl",
                ]);
            }
            ScanError::BatchDispatch(_) => {
                diagnostic.suggest(&["Resubmit the request; other domains were not affected"]);
            }
            ScanError::Config(_) | ScanError::UrlError(_) => {
                diagnostic.suggest(&["Fix the request parameters and resubmit"]);
            }
            ScanError::InvalidTransition { from, .. } => {
                diagnostic.stage = *from;
            }
            ScanError::Http(_) => {
                diagnostic.suggest(&["Check the TLS and proxy settings of the host"]);
            }
        }

        diagnostic
    }

    fn absorb_pages(&mut self, partial: &ScanResult) {
        for failure in &partial.pages_failed {
            if !self.attempted.contains(&failure.url) {
                self.attempted.push(failure.url.clone());
            }
            for reason in &failure.reasons {
                self.errors.push(format!("{}: {}", failure.url, reason));
            }
        }
    }

    fn suggest(&mut self, suggestions: &[&str]) {
        self.suggestions
            .extend(suggestions.iter().map(|s| s.to_string()));
    }
}

impl From<&ScanError> for ScanDiagnostic {
    fn from(error: &ScanError) -> Self {
        Self::from_error(error)
    }
}
