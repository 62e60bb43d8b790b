//! Resource profile detection
//!
//! The profile is derived once at startup from runtime hints and never changes
//! afterwards. Every component that needs a concurrency or timeout budget reads
//! it from the same immutable value.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Coarse resource class of the host the scanner runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileTier {
    Low,
    Medium,
    High,
}

impl ProfileTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Picks a tier from available memory in megabytes
    pub fn for_memory(memory_mb: u64) -> Self {
        match memory_mb {
            0..=1023 => Self::Low,
            1024..=4095 => Self::Medium,
            _ => Self::High,
        }
    }
}

impl fmt::Display for ProfileTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown profile tier '{}'", other)),
        }
    }
}

/// Runtime hints about the resources available to the process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceHints {
    /// Memory available to the process, in megabytes
    pub memory_mb: Option<u64>,

    /// Number of usable CPUs
    pub cpu_count: Option<usize>,

    /// Explicit tier override
    pub forced_tier: Option<ProfileTier>,
}

/// Concurrency and timeout budget derived from [`ResourceHints`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceProfile {
    pub tier: ProfileTier,

    /// Size of the concurrency gate; always at least 1
    pub max_concurrent_domains: usize,

    /// Factor applied to every network timeout
    pub timeout_multiplier: f64,

    /// Number of domains started together in an explicit batch
    pub batch_chunk_size: usize,

    /// Upper bound on pages fetched for one domain
    pub page_ceiling: usize,
}

impl ResourceProfile {
    /// The profile used whenever hints are missing or unusable
    pub fn minimal() -> Self {
        Self::for_tier(ProfileTier::Low)
    }

    /// Returns the fixed profile for a tier
    pub fn for_tier(tier: ProfileTier) -> Self {
        match tier {
            ProfileTier::Low => Self {
                tier,
                max_concurrent_domains: 2,
                timeout_multiplier: 1.5,
                batch_chunk_size: 2,
                page_ceiling: 8,
            },
            ProfileTier::Medium => Self {
                tier,
                max_concurrent_domains: 4,
                timeout_multiplier: 1.2,
                batch_chunk_size: 4,
                page_ceiling: 12,
            },
            ProfileTier::High => Self {
                tier,
                max_concurrent_domains: 8,
                timeout_multiplier: 1.0,
                batch_chunk_size: 8,
                page_ceiling: 20,
            },
        }
    }

    /// Derives a profile from runtime hints
    ///
    /// A forced tier wins over the memory hint. A CPU hint caps the gate at
    /// two scans per CPU. Without usable hints the minimal profile is returned.
    pub fn detect(hints: &ResourceHints) -> Self {
        let tier = hints
            .forced_tier
            .or_else(|| hints.memory_mb.map(ProfileTier::for_memory))
            .unwrap_or(ProfileTier::Low);

        let mut profile = Self::for_tier(tier);
        if let Some(cpus) = hints.cpu_count.filter(|n| *n > 0) {
            profile.max_concurrent_domains = profile.max_concurrent_domains.min(cpus * 2);
        }

        tracing::debug!(
            "Resource profile {} (hints: memory={:?}MB cpus={:?} forced={:?})",
            profile.tier,
            hints.memory_mb,
            hints.cpu_count,
            hints.forced_tier
        );

        profile
    }

    /// Returns a copy with a different gate size, clamped to at least 1
    pub fn with_concurrency(mut self, max_concurrent_domains: usize) -> Self {
        self.max_concurrent_domains = max_concurrent_domains.max(1);
        self
    }

    /// Returns a copy with a different chunk size, clamped to at least 1
    pub fn with_chunk_size(mut self, batch_chunk_size: usize) -> Self {
        self.batch_chunk_size = batch_chunk_size.max(1);
        self
    }
}

impl Default for ResourceProfile {
    fn default() -> Self {
        Self::minimal()
    }
}
