use crate::config::ResourceProfile;
use crate::crawler::{CoalescerStats, ScannerStatus};
use crate::output::{BatchScanReport, DomainOutcome};
use serde::Serialize;

/// Body returned by `POST /scan`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "scan_type", rename_all = "snake_case")]
pub enum ScanResponse {
    Single {
        domain: String,
        resource_profile: ResourceProfile,
        #[serde(flatten)]
        outcome: DomainOutcome,
    },
    Batch(BatchScanReport),
}

/// Body returned by `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub scanner: ScannerStatus,
    pub coalescer: CoalescerStats,
}

/// Body returned when a request is rejected before scanning
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}
