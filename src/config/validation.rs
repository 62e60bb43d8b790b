use crate::config::types::{BatchConfig, FetchConfig, PoolConfig, ResolverConfig, ScannerConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &ScannerConfig) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_resolver_config(&config.resolver)?;
    validate_pool_config(&config.pool)?;
    validate_batch_config(&config.batch)?;
    validate_user_agent(&config.user_agent)?;
    Ok(())
}

/// Validates page fetching configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_html_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_html_bytes must be >= 1024, got {}",
            config.max_html_bytes
        )));
    }

    validate_tier_timeouts(&config.tier_timeouts_secs)?;

    if config.additional_page_tiers < 1
        || config.additional_page_tiers > config.tier_timeouts_secs.len()
    {
        return Err(ConfigError::Validation(format!(
            "additional_page_tiers must be between 1 and {}, got {}",
            config.tier_timeouts_secs.len(),
            config.additional_page_tiers
        )));
    }

    if config.page_concurrency < 1 || config.page_concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "page_concurrency must be between 1 and 32, got {}",
            config.page_concurrency
        )));
    }

    if config.robots_cache_size < 1 {
        return Err(ConfigError::Validation(
            "robots_cache_size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Tier timeouts must be positive and strictly increasing
fn validate_tier_timeouts(timeouts: &[f64]) -> Result<(), ConfigError> {
    if timeouts.is_empty() {
        return Err(ConfigError::Validation(
            "at least one fetch tier timeout is required".to_string(),
        ));
    }

    if let Some(bad) = timeouts.iter().find(|t| !t.is_finite() || **t <= 0.0) {
        return Err(ConfigError::Validation(format!(
            "tier timeouts must be positive, got {}",
            bad
        )));
    }

    if let Some(pair) = timeouts.windows(2).find(|pair| pair[1] <= pair[0]) {
        return Err(ConfigError::Validation(format!(
            "tier timeouts must be strictly increasing, got {} followed by {}",
            pair[0], pair[1]
        )));
    }

    Ok(())
}

/// Validates domain resolution configuration
fn validate_resolver_config(config: &ResolverConfig) -> Result<(), ConfigError> {
    if config.probe_timeout_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "probe_timeout_ms must be >= 10ms, got {}ms",
            config.probe_timeout_ms
        )));
    }

    if config.domain_cache_size < 1 {
        return Err(ConfigError::Validation(
            "domain_cache_size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates connection pool configuration
fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.client_pool_size < 1 {
        return Err(ConfigError::Validation(
            "client_pool_size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates batch coalescing configuration
fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.min_size < 1 {
        return Err(ConfigError::Validation(
            "batch min_size must be >= 1".to_string(),
        ));
    }

    if config.max_size < config.min_size {
        return Err(ConfigError::Validation(format!(
            "batch max_size ({}) must be >= min_size ({})",
            config.max_size, config.min_size
        )));
    }

    if config.max_batch_domains < 1 || config.max_batch_domains > 500 {
        return Err(ConfigError::Validation(format!(
            "max_batch_domains must be between 1 and 500, got {}",
            config.max_batch_domains
        )));
    }

    Ok(())
}

fn validate_user_agent(user_agent: &str) -> Result<(), ConfigError> {
    if user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}
