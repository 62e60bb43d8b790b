//! Signal extractor contract
//!
//! Extractors are pure functions of `(url, html)`. They never perform network
//! I/O and must tolerate empty or malformed HTML. The pipeline runs every
//! registered extractor on every fetched page; a failing (or panicking)
//! extractor only loses its own signal for that page.

mod builtin;

pub use builtin::{FeedExtractor, TitleExtractor};

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors an extractor may report for a single page
#[derive(Debug, Clone, Error)]
pub enum ExtractorError {
    #[error("Unexpected page structure: {0}")]
    Malformed(String),

    #[error("Extractor failed: {0}")]
    Failed(String),
}

/// Output of one extractor for one page
#[derive(Debug, Clone, PartialEq)]
pub enum PartialSignal {
    /// A singleton field; the first value seen for a domain wins
    Single(Value),

    /// A repeatable field; values from all pages are unioned
    Many(Vec<Value>),
}

/// A signal extractor
///
/// Implementations must be cheap to share across tasks.
pub trait SignalExtractor: Send + Sync {
    /// Name under which the signal is stored in the aggregate
    fn name(&self) -> &str;

    /// Extracts a signal from one page
    ///
    /// # Returns
    ///
    /// * `Ok(Some(signal))` - The page carries the signal
    /// * `Ok(None)` - Nothing found on this page
    /// * `Err(ExtractorError)` - The extractor failed on this page
    fn extract(&self, url: &Url, html: &str) -> Result<Option<PartialSignal>, ExtractorError>;
}

/// Record of an extractor failure, kept in the scan result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractorFailure {
    pub extractor: String,
    pub url: String,
    pub message: String,
}

/// Everything the extractors produced for one page
#[derive(Debug, Default)]
pub struct PageSignals {
    pub signals: Vec<(String, PartialSignal)>,
    pub failures: Vec<ExtractorFailure>,
}

/// An ordered set of extractors run against every page
#[derive(Clone, Default)]
pub struct ExtractorSet {
    extractors: Vec<Arc<dyn SignalExtractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The extractors shipped with the crate
    pub fn builtin() -> Self {
        Self::new()
            .with(TitleExtractor::new())
            .with(FeedExtractor::new())
    }

    pub fn with<E: SignalExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractors.push(Arc::new(extractor));
        self
    }

    pub fn push(&mut self, extractor: Arc<dyn SignalExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.extractors.iter().map(|e| e.name().to_string()).collect()
    }

    /// Runs every extractor against one page
    ///
    /// Errors and panics are converted into [`ExtractorFailure`] records and
    /// logged; they never propagate.
    pub fn run(&self, url: &Url, html: &str) -> PageSignals {
        let mut page = PageSignals::default();

        for extractor in &self.extractors {
            let name = extractor.name().to_string();
            let outcome = catch_unwind(AssertUnwindSafe(|| extractor.extract(url, html)));

            let message = match outcome {
                Ok(Ok(Some(signal))) => {
                    page.signals.push((name, signal));
                    continue;
                }
                Ok(Ok(None)) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };

            tracing::warn!("Extractor '{}' failed on {}: {}", name, url, message);
            page.failures.push(ExtractorFailure {
                extractor: name,
                url: url.to_string(),
                message,
            });
        }

        page
    }
}

impl std::fmt::Debug for ExtractorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

/// Merges a partial signal into an aggregate
///
/// Singletons keep the first value stored under `name`. Repeatable signals
/// are unioned in first-seen order. A repeatable signal arriving under a name
/// that holds a singleton is ignored, and vice versa.
pub fn merge_signal(aggregate: &mut BTreeMap<String, Value>, name: &str, signal: PartialSignal) {
    match signal {
        PartialSignal::Single(value) => {
            if value.is_null() {
                return;
            }
            aggregate.entry(name.to_string()).or_insert(value);
        }
        PartialSignal::Many(values) => {
            let entry = aggregate
                .entry(name.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));

            if let Value::Array(existing) = entry {
                for value in values {
                    if !value.is_null() && !existing.contains(&value) {
                        existing.push(value);
                    }
                }
            } else {
                tracing::debug!("Signal '{}' is a singleton, ignoring list values", name);
            }
        }
    }
}
