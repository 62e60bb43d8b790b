//! Markdown rendering
//!
//! Turns a batch report or a single outcome into a human-readable summary
//! with per-domain status, signals and failure diagnostics.

use crate::output::diagnostic::ScanDiagnostic;
use crate::output::report::{BatchScanReport, DomainOutcome};
use crate::state::ScanResult;
use serde_json::Value;

/// Longest signal value printed before it is cut short
const MAX_SIGNAL_CHARS: usize = 120;

/// Formats a batch report as markdown
///
/// # Arguments
///
/// * `report` - The finished batch report
///
/// # Returns
///
/// A formatted markdown string
pub fn format_batch_markdown(report: &BatchScanReport) -> String {
    let mut md = String::new();

    md.push_str("# Signal-Scan Batch Report\n\n");

    md.push_str("## Batch Information\n\n");
    md.push_str(&format!("- **Batch ID**: {}\n", report.batch_id));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {}ms ({:.2} seconds)\n",
        report.execution_ms,
        report.execution_ms as f64 / 1000.0
    ));
    md.push_str(&format!(
        "- **Resource Profile**: {} ({} concurrent domains)\n\n",
        report.resource_profile.tier, report.resource_profile.max_concurrent_domains
    ));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Domains**: {}\n", report.total_domains));
    md.push_str(&format!("- **Successful**: {}\n", report.successful));
    md.push_str(&format!("- **Failed**: {}\n", report.failed));
    md.push_str(&format!("- **Pages Crawled**: {}\n", report.pages_crawled()));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    md.push_str("## Domains\n\n");
    md.push_str("| Domain | Status | Origin | Pages | Elapsed |\n");
    md.push_str("|--------|--------|--------|-------|---------|\n");
    for (domain, outcome) in &report.results {
        let origin = outcome
            .result
            .as_ref()
            .and_then(|r| r.resolved_origin.as_deref())
            .unwrap_or("-");
        let elapsed = outcome
            .result
            .as_ref()
            .map(|r| format!("{}ms", r.elapsed_ms))
            .unwrap_or_else(|| "-".to_string());
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            domain,
            status_label(outcome),
            origin,
            outcome.pages_crawled(),
            elapsed
        ));
    }
    md.push('\n');

    for (domain, outcome) in &report.results {
        md.push_str(&format!("## {}\n\n", domain));
        push_outcome(&mut md, outcome);
    }

    md
}

/// Formats a single-domain outcome as markdown
pub fn format_outcome_markdown(domain: &str, outcome: &DomainOutcome) -> String {
    let mut md = format!("# Signal-Scan: {}\n\n", domain);
    md.push_str(&format!("- **Status**: {}\n\n", status_label(outcome)));
    push_outcome(&mut md, outcome);
    md
}

fn status_label(outcome: &DomainOutcome) -> &'static str {
    if outcome.is_success() {
        "success"
    } else {
        "failed"
    }
}

fn push_outcome(md: &mut String, outcome: &DomainOutcome) {
    if let Some(result) = &outcome.result {
        push_result(md, result);
    }
    if let Some(diagnostic) = &outcome.diagnostic {
        push_diagnostic(md, diagnostic);
    }
}

fn push_result(md: &mut String, result: &ScanResult) {
    if let Some(origin) = &result.resolved_origin {
        let validated = if result.resolution_validated {
            ""
        } else {
            " (unvalidated)"
        };
        md.push_str(&format!("- **Origin**: {}{}\n", origin, validated));
    }
    md.push_str(&format!("- **Stage**: {}\n", result.stage));
    match &result.home_tier {
        Some(tier) => md.push_str(&format!("- **Home Page**: fetched ({})\n", tier)),
        None => md.push_str("- **Home Page**: not fetched\n"),
    }
    md.push_str(&format!(
        "- **Pages**: {} crawled, {} failed\n\n",
        result.pages_crawled.len(),
        result.pages_failed.len()
    ));

    if !result.partial_signals.is_empty() {
        md.push_str("### Signals\n\n");
        md.push_str("| Signal | Value |\n");
        md.push_str("|--------|-------|\n");
        for (name, value) in &result.partial_signals {
            md.push_str(&format!("| {} | {} |\n", name, signal_text(value)));
        }
        md.push('\n');
    }

    if !result.pages_crawled.is_empty() {
        md.push_str("### Pages Crawled\n\n");
        for page in &result.pages_crawled {
            md.push_str(&format!("- {}\n", page));
        }
        md.push('\n');
    }

    if !result.extractor_failures.is_empty() {
        md.push_str("### Extractor Failures\n\n");
        for failure in &result.extractor_failures {
            md.push_str(&format!(
                "- `{}` on {}: {}\n",
                failure.extractor, failure.url, failure.message
            ));
        }
        md.push('\n');
    }
}

fn push_diagnostic(md: &mut String, diagnostic: &ScanDiagnostic) {
    md.push_str("### Diagnostic\n\n");
    md.push_str(&format!(
        "- **Error**: {} ({})\n",
        diagnostic.message, diagnostic.kind
    ));
    md.push_str(&format!("- **Stage Reached**: {}\n\n", diagnostic.stage));

    if !diagnostic.attempted.is_empty() {
        md.push_str("Attempted:\n\n");
        for attempt in &diagnostic.attempted {
            md.push_str(&format!("- {}\n", attempt));
        }
        md.push('\n');
    }

    if !diagnostic.errors.is_empty() {
        md.push_str("Errors:\n\n");
        for error in &diagnostic.errors {
            md.push_str(&format!("- {}\n", error));
        }
        md.push('\n');
    }

    if !diagnostic.suggestions.is_empty() {
        md.push_str("Suggestions:\n\n");
        for suggestion in &diagnostic.suggestions {
            md.push_str(&format!("- {}\n", suggestion));
        }
        md.push('\n');
    }
}

/// Renders a signal value on one table line
fn signal_text(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    };

    let text = text.replace('|', "\\|").replace('\n', " ");
    if text.chars().count() > MAX_SIGNAL_CHARS {
        let cut: String = text.chars().take(MAX_SIGNAL_CHARS).collect();
        format!("{}...", cut)
    } else {
        text
    }
}
