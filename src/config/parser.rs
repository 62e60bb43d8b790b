use crate::config::profile::{ProfileTier, ResourceHints};
use crate::config::types::ScannerConfig;
use crate::config::validation::validate;
use crate::{ConfigError, ConfigResult};
use std::fmt::Display;
use std::str::FromStr;

/// Prefix shared by every configuration variable
pub const ENV_PREFIX: &str = "SIGNALSCAN_";

/// Reads prefixed configuration values from a key lookup
///
/// The lookup is usually `std::env::var`, but any function works, which keeps
/// tests away from the process environment.
pub struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Returns the trimmed value of `SIGNALSCAN_<key>`, treating blanks as unset
    pub fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{}{}", ENV_PREFIX, key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Parses a value, falling back to `default` when unset
    pub fn parse<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: format!("{}{}", ENV_PREFIX, key),
                value: raw.clone(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// Parses a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`)
    pub fn flag(&self, key: &str, default: bool) -> ConfigResult<bool> {
        match self.get(key) {
            Some(raw) => match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: format!("{}{}", ENV_PREFIX, key),
                    value: raw,
                    reason: "expected a boolean".to_string(),
                }),
            },
            None => Ok(default),
        }
    }

    /// Parses a comma-separated list of seconds
    pub fn seconds_list(&self, key: &str, default: Vec<f64>) -> ConfigResult<Vec<f64>> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };

        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<f64>().map_err(|e| ConfigError::InvalidValue {
                    key: format!("{}{}", ENV_PREFIX, key),
                    value: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Parses a value leniently: malformed input counts as absent
    pub fn hint<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|raw| raw.parse::<T>().ok())
    }
}

impl ScannerConfig {
    /// Loads the configuration from the process environment
    ///
    /// # Returns
    ///
    /// * `Ok(ScannerConfig)` - Loaded and validated configuration
    /// * `Err(ConfigError)` - A value failed to parse or validate
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary key lookup
    ///
    /// # Arguments
    ///
    /// * `lookup` - Maps a full variable name (e.g. `SIGNALSCAN_BATCH_WAIT_MS`) to its value
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader::new(lookup);
        let mut config = ScannerConfig::default();

        config.fetch.max_html_bytes = env.parse("MAX_HTML_BYTES", config.fetch.max_html_bytes)?;
        config.fetch.tier_timeouts_secs =
            env.seconds_list("TIER_TIMEOUTS", config.fetch.tier_timeouts_secs)?;
        config.fetch.additional_page_tiers =
            env.parse("ADDITIONAL_PAGE_TIERS", config.fetch.additional_page_tiers)?;
        config.fetch.connect_timeout_ms =
            env.parse("CONNECT_TIMEOUT_MS", config.fetch.connect_timeout_ms)?;
        config.fetch.page_concurrency = env.parse("PAGE_CONCURRENCY", config.fetch.page_concurrency)?;
        config.fetch.robots_cache_size =
            env.parse("ROBOTS_CACHE_SIZE", config.fetch.robots_cache_size)?;
        config.fetch.robots_ttl_secs = env.parse("ROBOTS_TTL_SECS", config.fetch.robots_ttl_secs)?;

        config.resolver.probe_timeout_ms =
            env.parse("PROBE_TIMEOUT_MS", config.resolver.probe_timeout_ms)?;
        config.resolver.domain_cache_size =
            env.parse("DOMAIN_CACHE_SIZE", config.resolver.domain_cache_size)?;
        config.resolver.sibling_tld_fallback =
            env.flag("SIBLING_TLD_FALLBACK", config.resolver.sibling_tld_fallback)?;

        config.pool.pool_max_idle_per_host =
            env.parse("POOL_MAX_IDLE_PER_HOST", config.pool.pool_max_idle_per_host)?;
        config.pool.client_pool_size = env.parse("CLIENT_POOL_SIZE", config.pool.client_pool_size)?;

        config.batch.wait_ms = env.parse("BATCH_WAIT_MS", config.batch.wait_ms)?;
        config.batch.min_size = env.parse("BATCH_MIN_SIZE", config.batch.min_size)?;
        config.batch.max_size = env.parse("BATCH_MAX_SIZE", config.batch.max_size)?;
        config.batch.max_batch_domains =
            env.parse("MAX_BATCH_DOMAINS", config.batch.max_batch_domains)?;

        if let Some(agent) = env.get("USER_AGENT") {
            config.user_agent = agent;
        }

        // Resource hints never fail: anything unreadable is simply ignored
        config.hints = ResourceHints {
            memory_mb: env.hint::<u64>("MEMORY_MB").filter(|mb| *mb > 0),
            cpu_count: env.hint::<usize>("CPU_COUNT").filter(|n| *n > 0),
            forced_tier: env.hint::<ProfileTier>("PROFILE"),
        };

        validate(&config)?;

        Ok(config)
    }
}
