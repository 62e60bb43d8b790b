//! Scan submission surface
//!
//! Request validation, response bodies, and the HTTP service that exposes
//! the scanner.

mod request;
mod response;
mod server;

pub use request::{ScanPlan, ScanRequest, ScanTarget, MAX_TIMEOUT_SECS};
pub use response::{ErrorResponse, HealthResponse, ScanResponse};
pub use server::{build_router, serve, ApiError, AppState};

use crate::crawler::{ScanOptions, Scanner};
use crate::output::BatchScanReport;

/// Runs an explicit batch and collects every outcome into a report
///
/// One domain's failure never affects another; each is recorded with its
/// own status and diagnostic.
pub async fn run_batch(
    scanner: &Scanner,
    domains: &[String],
    options: &ScanOptions,
) -> BatchScanReport {
    let mut report = BatchScanReport::new(domains, *scanner.profile());

    for (domain, result) in scanner.scan_many(domains, options).await {
        report.record(domain, result);
    }
    report.finish();

    tracing::info!(
        "Batch {} finished: {}/{} successful in {}ms",
        report.batch_id,
        report.successful,
        report.total_domains,
        report.execution_ms
    );

    report
}
