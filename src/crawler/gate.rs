//! Concurrency gate and per-domain client pool
//!
//! The gate bounds how many domain scans run at once. Each scan holds one
//! permit for its whole duration; the permit is returned when it is dropped,
//! whatever way the scan ends.

use crate::config::{ResourceProfile, ScannerConfig};
use crate::crawler::fetcher::build_http_client;
use crate::ScanError;
use lru::LruCache;
use reqwest::Client;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting semaphore with in-flight accounting
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// Permission to run one domain scan
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGate {
    /// Creates a gate admitting `capacity` scans at once (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits for a permit
    ///
    /// Waiters are admitted in FIFO order.
    pub async fn acquire(&self) -> Result<GatePermit, ScanError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScanError::BatchDispatch("concurrency gate is closed".to_string()))?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Ok(GatePermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously held permits so far
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Reusable HTTP clients keyed by domain
///
/// Pages of one domain share a client and therefore its keep-alive
/// connections. The pool is bounded; the oldest client is dropped first.
#[derive(Debug)]
pub struct ClientPool {
    clients: Mutex<LruCache<String, Client>>,
    config: ScannerConfig,
    profile: ResourceProfile,
}

impl ClientPool {
    pub fn new(config: &ScannerConfig, profile: &ResourceProfile) -> Self {
        Self {
            clients: Mutex::new(LruCache::new(
                NonZeroUsize::new(config.pool.client_pool_size).unwrap_or(NonZeroUsize::MIN),
            )),
            config: config.clone(),
            profile: *profile,
        }
    }

    /// Returns the client for `domain`, building it on first use
    pub fn client_for(&self, domain: &str) -> Result<Client, reqwest::Error> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.peek(domain) {
            return Ok(client.clone());
        }

        let client = build_http_client(&self.config, &self.profile)?;
        if let Some((evicted, _)) = clients.push(domain.to_string(), client.clone()) {
            tracing::trace!("Client pool full, dropped client for {}", evicted);
        }
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Pooled domains, oldest first
    pub fn domains(&self) -> Vec<String> {
        let clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let mut domains: Vec<String> = clients.iter().map(|(domain, _)| domain.clone()).collect();
        domains.reverse();
        domains
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
