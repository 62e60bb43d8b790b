//! State module for tracking scan progress
//!
//! # Components
//!
//! - `ScanStage`: The stage machine a single-domain scan moves through
//! - `ScanResult`: The incrementally built per-domain aggregate

mod scan_result;
mod scan_stage;

// Re-export main types
pub use scan_result::{PageFailure, ScanResult};
pub use scan_stage::ScanStage;
