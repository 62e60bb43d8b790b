use crate::config::profile::ResourceHints;
use serde::Serialize;

/// Browser-like user agent; many company sites refuse obvious bot agents
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Signal-Scan
#[derive(Debug, Clone, Serialize)]
pub struct ScannerConfig {
    pub fetch: FetchConfig,
    pub resolver: ResolverConfig,
    pub pool: PoolConfig,
    pub batch: BatchConfig,

    /// User agent sent with every request
    pub user_agent: String,

    /// Runtime resource hints used to derive the resource profile
    pub hints: ResourceHints,
}

/// Page fetching behaviour
#[derive(Debug, Clone, Serialize)]
pub struct FetchConfig {
    /// Maximum number of body bytes read per page
    pub max_html_bytes: usize,

    /// Per-tier timeouts in seconds, before the profile multiplier is applied
    pub tier_timeouts_secs: Vec<f64>,

    /// Number of leading tiers that non-home pages may use
    pub additional_page_tiers: usize,

    /// TCP/TLS connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Concurrent page fetches inside one domain scan
    pub page_concurrency: usize,

    /// Maximum number of hosts whose robots.txt is cached
    pub robots_cache_size: usize,

    /// How long a cached robots.txt stays fresh (seconds)
    pub robots_ttl_secs: u64,
}

/// Domain resolution behaviour
#[derive(Debug, Clone, Serialize)]
pub struct ResolverConfig {
    /// Timeout for a single existence probe (milliseconds)
    pub probe_timeout_ms: u64,

    /// Capacity of the resolution cache
    pub domain_cache_size: usize,

    /// Whether to try the `.com` <-> `.es` sibling of the domain
    pub sibling_tld_fallback: bool,
}

/// Connection pool limits
#[derive(Debug, Clone, Serialize)]
pub struct PoolConfig {
    /// Idle keep-alive connections kept per host by each client
    pub pool_max_idle_per_host: usize,

    /// Maximum number of per-domain clients kept alive
    pub client_pool_size: usize,
}

/// Batch coalescing and explicit batch limits
#[derive(Debug, Clone, Serialize)]
pub struct BatchConfig {
    /// How long a window stays open after its first request (milliseconds)
    pub wait_ms: u64,

    /// Windows smaller than this are processed request by request
    pub min_size: usize,

    /// Windows flush immediately when they reach this size
    pub max_size: usize,

    /// Maximum number of domains in one explicit batch request
    pub max_batch_domains: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            resolver: ResolverConfig::default(),
            pool: PoolConfig::default(),
            batch: BatchConfig::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            hints: ResourceHints::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_html_bytes: 800_000,
            tier_timeouts_secs: vec![3.0, 5.0, 8.0, 12.0, 20.0],
            additional_page_tiers: 2,
            connect_timeout_ms: 2_000,
            page_concurrency: 4,
            robots_cache_size: 100,
            robots_ttl_secs: 3_600,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 3_000,
            domain_cache_size: 100,
            sibling_tld_fallback: false,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 10,
            client_pool_size: 64,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            wait_ms: 500,
            min_size: 3,
            max_size: 20,
            max_batch_domains: 50,
        }
    }
}
