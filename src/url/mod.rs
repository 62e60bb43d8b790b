//! URL handling module for Signal-Scan
//!
//! This module provides URL normalization for frontier deduplication and the
//! host helpers used by the resolver and the frontier builder.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{
    extract_domain, host_key, is_ip_literal, is_same_site, normalize_domain_input,
    registrable_domain, sibling_tld, strip_www,
};
pub use normalize::{normalize_url, origin_string};
