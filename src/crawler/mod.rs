//! Crawler module: everything between a domain name and its scan result
//!
//! This module contains the core scanning logic, including:
//! - Escalating-timeout fetch policy
//! - HTTP fetching with robots.txt compliance and byte caps
//! - Domain resolution
//! - Frontier building and link scoring
//! - Concurrency gating and per-domain client reuse
//! - The single-domain pipeline and the batch coalescer

mod coalescer;
mod fetcher;
mod frontier;
mod gate;
mod pipeline;
mod policy;
mod resolver;

pub use coalescer::{BatchCoalescer, CoalescerStats, ScanDispatch};
pub use fetcher::{
    build_http_client, decode_body, read_capped, FetchEngine, FetchFailure, FetchedPage,
};
pub use frontier::{
    build_frontier, fallback_frontier, is_blocklisted, keyword_score, merge_explicit,
    CrawlCandidate, SourceKind, FALLBACK_PATHS, MAX_DISCOVERED_LINKS,
};
pub use gate::{ClientPool, ConcurrencyGate, GatePermit};
pub use pipeline::{
    normalize_company_name, ScanOptions, Scanner, ScannerStatus, DEFAULT_MAX_PAGES,
    DEFAULT_SCAN_TIMEOUT, MAX_PAGES_LIMIT,
};
pub use policy::{
    run_tiers, AttemptError, FetchAttemptPolicy, FetchTier, TierFailure, TierOutcome,
};
pub use resolver::{DomainResolver, Resolution, ResolutionCandidate, ResolutionStrategy};
