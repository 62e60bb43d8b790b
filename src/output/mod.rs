//! Output module for scan reports
//!
//! This module handles:
//! - Turning scan results and errors into per-domain outcomes
//! - Structured failure diagnostics
//! - Batch reports with summary statistics
//! - JSON and markdown rendering

mod diagnostic;
mod markdown;
mod report;

pub use diagnostic::ScanDiagnostic;
pub use markdown::{format_batch_markdown, format_outcome_markdown};
pub use report::{
    batch_fingerprint, BatchScanReport, DomainOutcome, DomainStatus, OutputError, OutputResult,
};

use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Report rendering format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
}

/// Renders a batch report
pub fn render_batch(report: &BatchScanReport, format: ReportFormat) -> OutputResult<String> {
    match format {
        ReportFormat::Json => report.to_json(),
        ReportFormat::Markdown => Ok(format_batch_markdown(report)),
    }
}

/// Renders one domain's outcome
pub fn render_outcome(
    domain: &str,
    outcome: &DomainOutcome,
    format: ReportFormat,
) -> OutputResult<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        ReportFormat::Markdown => Ok(format_outcome_markdown(domain, outcome)),
    }
}

/// Writes rendered output to a file
///
/// # Arguments
///
/// * `rendered` - Report text
/// * `output_path` - Path where the report should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the file
pub fn write_report(rendered: &str, output_path: &Path) -> OutputResult<()> {
    let mut file = File::create(output_path)?;
    file.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    Ok(())
}
