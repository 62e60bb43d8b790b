//! Configuration module for Signal-Scan
//!
//! Configuration is environment-style: every knob is read once at startup from
//! `SIGNALSCAN_*` variables, falls back to a safe default, and is validated
//! before any network activity happens.
//!
//! # Example
//!
//! ```no_run
//! use signal_scan::config::{ResourceProfile, ScannerConfig};
//!
//! let config = ScannerConfig::from_env().unwrap();
//! let profile = ResourceProfile::detect(&config.hints);
//! println!("Scanning up to {} domains at once", profile.max_concurrent_domains);
//! ```

mod parser;
mod profile;
mod types;
mod validation;

// Re-export types
pub use profile::{ProfileTier, ResourceHints, ResourceProfile};
pub use types::{
    BatchConfig, FetchConfig, PoolConfig, ResolverConfig, ScannerConfig, DEFAULT_USER_AGENT,
};

// Re-export loader helpers
pub use parser::{EnvReader, ENV_PREFIX};
pub use validation::validate;
