//! Signal-Scan: a time-boxed company website scanner
//!
//! This crate resolves a company domain to a working origin, fetches a bounded
//! set of pages under an escalating timeout policy, and coalesces concurrent
//! single-domain requests into resource-aware batches. Signal extraction is
//! delegated to pluggable [`extract::SignalExtractor`] implementations.

pub mod api;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for scan operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not resolve {domain}: none of {} candidate origins responded", .attempted.len())]
    DomainResolution {
        domain: String,
        attempted: Vec<String>,
        failures: Vec<String>,
    },

    #[error("Home page of {domain} ({origin}) could not be fetched after {} attempts", .failures.len())]
    FetchExhausted {
        domain: String,
        origin: String,
        failures: Vec<String>,
        partial: Box<state::ScanResult>,
    },

    #[error("Scan of {domain} timed out after {elapsed_ms}ms during {stage}")]
    Timeout {
        domain: String,
        stage: state::ScanStage,
        elapsed_ms: u64,
        partial: Box<state::ScanResult>,
    },

    #[error("Batch dispatch failed: {0}")]
    BatchDispatch(String),

    #[error("Invalid stage transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::ScanStage,
        to: state::ScanStage,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),
}

impl ScanError {
    /// Returns the partial aggregate carried by the error, if any
    pub fn partial(&self) -> Option<&state::ScanResult> {
        match self {
            Self::FetchExhausted { partial, .. } | Self::Timeout { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::DomainResolution { .. } => "domain_resolution_failure",
            Self::FetchExhausted { .. } => "fetch_exhausted",
            Self::Timeout { .. } => "timeout",
            Self::BatchDispatch(_) => "batch_dispatch_failure",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Http(_) => "http_client_error",
            Self::UrlError(_) => "url_error",
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for scan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{ResourceProfile, ScannerConfig};
pub use crawler::{BatchCoalescer, ScanOptions, Scanner};
pub use state::{ScanResult, ScanStage};
