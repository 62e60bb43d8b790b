//! Escalating timeout policy
//!
//! A fetch is attempted once per tier, each tier with a longer timeout than
//! the last. The runner stops at the first tier that succeeds and reports
//! either the winning tier or every per-tier failure.

use crate::{ConfigError, ConfigResult};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Labels for the default five tiers; extra tiers are named `tier-N`
const TIER_LABELS: [&str; 5] = ["ultra-fast", "fast", "normal", "patient", "last-resort"];

/// One attempt budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTier {
    pub label: String,
    pub timeout: Duration,
}

/// Ordered list of tiers with strictly increasing timeouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttemptPolicy {
    tiers: Vec<FetchTier>,
}

impl FetchAttemptPolicy {
    /// Builds a policy from unscaled timeouts in seconds
    ///
    /// # Arguments
    ///
    /// * `seconds` - Per-tier timeouts, strictly increasing
    /// * `multiplier` - Resource profile timeout multiplier
    ///
    /// # Returns
    ///
    /// * `Ok(FetchAttemptPolicy)` - The scaled policy
    /// * `Err(ConfigError)` - Empty, non-positive or non-increasing timeouts
    pub fn from_seconds(seconds: &[f64], multiplier: f64) -> ConfigResult<Self> {
        if seconds.is_empty() {
            return Err(ConfigError::Validation(
                "a fetch policy needs at least one tier".to_string(),
            ));
        }
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "timeout multiplier must be positive, got {}",
                multiplier
            )));
        }

        let mut tiers: Vec<FetchTier> = Vec::with_capacity(seconds.len());
        for (index, secs) in seconds.iter().enumerate() {
            if !secs.is_finite() || *secs <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "tier timeouts must be positive, got {}",
                    secs
                )));
            }

            let timeout = Duration::from_secs_f64(secs * multiplier);
            if let Some(previous) = tiers.last() {
                if timeout <= previous.timeout {
                    return Err(ConfigError::Validation(format!(
                        "tier timeouts must be strictly increasing ({:?} after {:?})",
                        timeout, previous.timeout
                    )));
                }
            }

            let label = TIER_LABELS
                .get(index)
                .map(|l| l.to_string())
                .unwrap_or_else(|| format!("tier-{}", index + 1));

            tiers.push(FetchTier { label, timeout });
        }

        Ok(Self { tiers })
    }

    /// Keeps only the first `count` tiers (at least one)
    pub fn truncated(&self, count: usize) -> Self {
        let count = count.clamp(1, self.tiers.len());
        Self {
            tiers: self.tiers[..count].to_vec(),
        }
    }

    pub fn tiers(&self) -> &[FetchTier] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Sum of all tier timeouts: the worst case for one fetch
    pub fn total_budget(&self) -> Duration {
        self.tiers.iter().map(|t| t.timeout).sum()
    }
}

/// Why a single tier failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierFailure {
    pub tier: String,
    pub timeout_ms: u64,
    pub reason: String,
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}ms): {}", self.tier, self.timeout_ms, self.reason)
    }
}

/// Error returned by one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Try the next tier
    Retry(String),

    /// Stop; later tiers would fail the same way
    Abort(String),
}

/// Tagged result of running a policy
#[derive(Debug)]
pub enum TierOutcome<T> {
    Succeeded {
        value: T,
        tier_index: usize,
        tier: FetchTier,
        earlier_failures: Vec<TierFailure>,
    },
    Exhausted {
        failures: Vec<TierFailure>,
    },
}

impl<T> TierOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Runs `attempt` once per tier until one succeeds
///
/// Each attempt runs under its tier's timeout; an attempt that overruns is
/// dropped and recorded as a failure. Nothing from a failed attempt is
/// carried into the next one.
pub async fn run_tiers<T, F, Fut>(policy: &FetchAttemptPolicy, mut attempt: F) -> TierOutcome<T>
where
    F: FnMut(usize, FetchTier) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut failures = Vec::new();

    for (index, tier) in policy.tiers().iter().enumerate() {
        let timeout_ms = tier.timeout.as_millis() as u64;
        let failure = |reason: String| TierFailure {
            tier: tier.label.clone(),
            timeout_ms,
            reason,
        };

        match tokio::time::timeout(tier.timeout, attempt(index, tier.clone())).await {
            Ok(Ok(value)) => {
                return TierOutcome::Succeeded {
                    value,
                    tier_index: index,
                    tier: tier.clone(),
                    earlier_failures: failures,
                };
            }
            Ok(Err(AttemptError::Retry(reason))) => {
                tracing::debug!("Tier {} failed: {}", tier.label, reason);
                failures.push(failure(reason));
            }
            Ok(Err(AttemptError::Abort(reason))) => {
                tracing::debug!("Tier {} aborted: {}", tier.label, reason);
                failures.push(failure(reason));
                break;
            }
            Err(_) => {
                tracing::debug!("Tier {} timed out after {}ms", tier.label, timeout_ms);
                failures.push(failure(format!("timed out after {}ms", timeout_ms)));
            }
        }
    }

    TierOutcome::Exhausted { failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(seconds: &[f64]) -> FetchAttemptPolicy {
        FetchAttemptPolicy::from_seconds(seconds, 1.0).unwrap()
    }

    #[test]
    fn test_labels_and_scaling() {
        let policy = FetchAttemptPolicy::from_seconds(&[3.0, 5.0, 8.0, 12.0, 20.0, 30.0], 1.5).unwrap();
        let labels: Vec<_> = policy.tiers().iter().map(|t| t.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["ultra-fast", "fast", "normal", "patient", "last-resort", "tier-6"]
        );
        assert_eq!(policy.tiers()[0].timeout, Duration::from_millis(4500));
        assert_eq!(policy.total_budget(), Duration::from_secs_f64(78.0 * 1.5));
    }

    #[test]
    fn test_rejects_non_increasing() {
        assert!(FetchAttemptPolicy::from_seconds(&[], 1.0).is_err());
        assert!(FetchAttemptPolicy::from_seconds(&[2.0, 2.0], 1.0).is_err());
        assert!(FetchAttemptPolicy::from_seconds(&[3.0, 1.0], 1.0).is_err());
        assert!(FetchAttemptPolicy::from_seconds(&[-1.0, 1.0], 1.0).is_err());
        assert!(FetchAttemptPolicy::from_seconds(&[1.0], 0.0).is_err());
    }

    #[test]
    fn test_truncated_keeps_leading_tiers() {
        let policy = policy(&[1.0, 2.0, 3.0]);
        assert_eq!(policy.truncated(2).len(), 2);
        assert_eq!(policy.truncated(2).tiers()[1].label, "fast");
        assert_eq!(policy.truncated(0).len(), 1);
        assert_eq!(policy.truncated(10).len(), 3);
    }

    #[tokio::test]
    async fn test_first_success_stops_escalation() {
        let calls = AtomicUsize::new(0);
        let outcome = run_tiers(&policy(&[1.0, 2.0, 3.0]), |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AttemptError>("body") }
        })
        .await;

        match outcome {
            TierOutcome::Succeeded {
                value,
                tier_index,
                earlier_failures,
                ..
            } => {
                assert_eq!(value, "body");
                assert_eq!(tier_index, 0);
                assert!(earlier_failures.is_empty());
            }
            TierOutcome::Exhausted { .. } => panic!("expected success"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_escalates_past_timeouts() {
        let policy = policy(&[0.02, 0.04, 0.06, 0.08, 2.0]);
        let outcome = run_tiers(&policy, |index, _| async move {
            if index < 4 {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok::<_, AttemptError>(index)
        })
        .await;

        match outcome {
            TierOutcome::Succeeded {
                value,
                tier,
                earlier_failures,
                ..
            } => {
                assert_eq!(value, 4);
                assert_eq!(tier.label, "last-resort");
                assert_eq!(earlier_failures.len(), 4);
                assert!(earlier_failures[0].reason.contains("timed out"));
            }
            TierOutcome::Exhausted { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_exhausted_collects_every_reason() {
        let outcome = run_tiers(&policy(&[1.0, 2.0, 3.0]), |index, _| async move {
            Err::<(), _>(AttemptError::Retry(format!("HTTP 50{}", index)))
        })
        .await;

        match outcome {
            TierOutcome::Exhausted { failures } => {
                let reasons: Vec<_> = failures.iter().map(|f| f.reason.as_str()).collect();
                assert_eq!(reasons, vec!["HTTP 500", "HTTP 501", "HTTP 502"]);
                assert_eq!(failures[2].tier, "normal");
            }
            TierOutcome::Succeeded { .. } => panic!("expected exhaustion"),
        }
    }

    #[tokio::test]
    async fn test_abort_skips_remaining_tiers() {
        let calls = AtomicUsize::new(0);
        let outcome = run_tiers(&policy(&[1.0, 2.0, 3.0]), |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(AttemptError::Abort("disallowed by robots.txt".to_string())) }
        })
        .await;

        assert!(!outcome.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
