//! Batch coalescer
//!
//! Single-domain requests that arrive close together are collected into a
//! window. The window is flushed when its timer fires or when it reaches the
//! maximum size. A flushed window below the minimum size is dispatched request
//! by request; otherwise it goes out as one batch and each result is handed
//! back to its own caller as soon as it is ready.
//!
//! The window lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Dispatch runs on a spawned task, so a caller that goes away does
//! not strand the other requests of its window.

use crate::config::BatchConfig;
use crate::crawler::pipeline::{ScanOptions, Scanner};
use crate::state::ScanResult;
use crate::ScanError;
use async_trait::async_trait;
use futures::future::{join_all, FutureExt};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Callback a batch dispatcher uses to hand back one result by index
pub type Deliver<'a> = &'a (dyn Fn(usize, Result<ScanResult, ScanError>) + Send + Sync);

/// Executes scans on behalf of the coalescer
#[async_trait]
pub trait ScanDispatch: Send + Sync + 'static {
    /// Scans one domain on its own
    async fn scan_one(&self, domain: &str, options: &ScanOptions) -> Result<ScanResult, ScanError>;

    /// Scans a batch, calling `deliver` once per finished item
    ///
    /// An `Err` is a failure of the batch itself; items already delivered
    /// keep their results.
    async fn scan_batch(
        &self,
        items: &[(String, ScanOptions)],
        deliver: Deliver<'_>,
    ) -> Result<(), ScanError>;
}

#[async_trait]
impl ScanDispatch for Scanner {
    async fn scan_one(&self, domain: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        self.scan_domain(domain, options).await
    }

    async fn scan_batch(
        &self,
        items: &[(String, ScanOptions)],
        deliver: Deliver<'_>,
    ) -> Result<(), ScanError> {
        self.scan_each(items, |index, result| deliver(index, result))
            .await;
        Ok(())
    }
}

type ResultHandle = oneshot::Sender<Result<ScanResult, ScanError>>;

struct PendingScanRequest {
    domain: String,
    options: ScanOptions,
    enqueued_at: Instant,
    handle: ResultHandle,
}

#[derive(Default)]
struct BatchWindow {
    pending: Vec<PendingScanRequest>,
    timer_armed: bool,
    /// Bumped on every flush so a stale timer cannot flush a newer window
    generation: u64,
}

impl BatchWindow {
    fn take(&mut self) -> Vec<PendingScanRequest> {
        self.timer_armed = false;
        self.generation += 1;
        std::mem::take(&mut self.pending)
    }
}

/// Counters exposed for health reporting and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoalescerStats {
    pub submitted: u64,
    pub batches_dispatched: u64,
    pub individually_dispatched: u64,
    pub pending: usize,
}

struct Inner<D> {
    dispatcher: Arc<D>,
    window: Mutex<BatchWindow>,
    wait: Duration,
    min_size: usize,
    max_size: usize,
    submitted: AtomicU64,
    batches: AtomicU64,
    individual: AtomicU64,
}

/// Groups single-domain requests into batches
pub struct BatchCoalescer<D: ScanDispatch> {
    inner: Arc<Inner<D>>,
}

impl<D: ScanDispatch> Clone for BatchCoalescer<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: ScanDispatch> BatchCoalescer<D> {
    pub fn new(dispatcher: Arc<D>, config: &BatchConfig) -> Self {
        let min_size = config.min_size.max(1);
        Self {
            inner: Arc::new(Inner {
                dispatcher,
                window: Mutex::new(BatchWindow::default()),
                wait: Duration::from_millis(config.wait_ms),
                min_size,
                max_size: config.max_size.max(min_size),
                submitted: AtomicU64::new(0),
                batches: AtomicU64::new(0),
                individual: AtomicU64::new(0),
            }),
        }
    }

    pub fn stats(&self) -> CoalescerStats {
        let pending = self
            .inner
            .window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len();

        CoalescerStats {
            submitted: self.inner.submitted.load(Ordering::SeqCst),
            batches_dispatched: self.inner.batches.load(Ordering::SeqCst),
            individually_dispatched: self.inner.individual.load(Ordering::SeqCst),
            pending,
        }
    }

    /// Submits one domain and waits for its result
    ///
    /// Must be called from within a tokio runtime.
    pub async fn submit(
        &self,
        domain: impl Into<String>,
        options: ScanOptions,
    ) -> Result<ScanResult, ScanError> {
        let (handle, receiver) = oneshot::channel();
        let request = PendingScanRequest {
            domain: domain.into(),
            options,
            enqueued_at: Instant::now(),
            handle,
        };
        self.inner.submitted.fetch_add(1, Ordering::SeqCst);

        let (full_window, arm_generation) = {
            let mut window = self
                .inner
                .window
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            window.pending.push(request);

            if window.pending.len() >= self.inner.max_size {
                (Some(window.take()), None)
            } else if !window.timer_armed {
                window.timer_armed = true;
                (None, Some(window.generation))
            } else {
                (None, None)
            }
        };

        if let Some(batch) = full_window {
            tracing::debug!("Batch window full ({} requests), flushing", batch.len());
            tokio::spawn(flush(Arc::clone(&self.inner), batch));
        }

        if let Some(generation) = arm_generation {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(inner.wait).await;
                let batch = {
                    let mut window = inner.window.lock().unwrap_or_else(PoisonError::into_inner);
                    if window.timer_armed && window.generation == generation {
                        Some(window.take())
                    } else {
                        None
                    }
                };
                if let Some(batch) = batch {
                    flush(inner, batch).await;
                }
            });
        }

        receiver.await.unwrap_or_else(|_| {
            Err(ScanError::BatchDispatch(
                "request was dropped before it completed".to_string(),
            ))
        })
    }
}

/// Dispatches a flushed window and resolves every handle exactly once
async fn flush<D: ScanDispatch>(inner: Arc<Inner<D>>, batch: Vec<PendingScanRequest>) {
    if batch.is_empty() {
        return;
    }

    if let Some(oldest) = batch.iter().map(|r| r.enqueued_at).min() {
        tracing::debug!(
            "Flushing window of {} (oldest waited {}ms)",
            batch.len(),
            oldest.elapsed().as_millis()
        );
    }

    if batch.len() < inner.min_size {
        inner
            .individual
            .fetch_add(batch.len() as u64, Ordering::SeqCst);

        join_all(batch.into_iter().map(|request| {
            let dispatcher = Arc::clone(&inner.dispatcher);
            async move {
                let result = AssertUnwindSafe(dispatcher.scan_one(&request.domain, &request.options))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(ScanError::BatchDispatch(format!(
                            "scan of {} panicked",
                            request.domain
                        )))
                    });
                let _ = request.handle.send(result);
            }
        }))
        .await;
        return;
    }

    inner.batches.fetch_add(1, Ordering::SeqCst);
    tracing::info!("Dispatching coalesced batch of {} domains", batch.len());

    let mut items = Vec::with_capacity(batch.len());
    let mut handles = Vec::with_capacity(batch.len());
    for request in batch {
        items.push((request.domain, request.options));
        handles.push(Mutex::new(Some(request.handle)));
    }

    let deliver = |index: usize, result: Result<ScanResult, ScanError>| {
        let handle = handles
            .get(index)
            .and_then(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).take());
        if let Some(handle) = handle {
            let _ = handle.send(result);
        }
    };

    let outcome = AssertUnwindSafe(inner.dispatcher.scan_batch(&items, &deliver))
        .catch_unwind()
        .await;

    let reason = match outcome {
        Ok(Ok(())) => "batch finished without a result for this domain".to_string(),
        Ok(Err(e)) => e.to_string(),
        Err(_) => "batch execution panicked".to_string(),
    };

    let mut unresolved = 0;
    for (slot, (domain, _)) in handles.iter().zip(&items) {
        let handle = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            unresolved += 1;
            let _ = handle.send(Err(ScanError::BatchDispatch(format!("{}: {}", domain, reason))));
        }
    }

    if unresolved > 0 {
        tracing::warn!("{} requests failed with the batch: {}", unresolved, reason);
    }
}
