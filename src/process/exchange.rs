//! Stdout exchange protocol with the inference process.
//!
//! Parsing here is deliberately tolerant: the contract makes every JSON
//! field optional, and malformed JSON during failure interpretation must
//! never escalate into a crash of its own. The generic message always
//! wins over a parse error.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

// =============================================================================
// Wire Types
// =============================================================================

/// JSON object the child may emit on stdout after a successful exit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct SuccessReport {
    /// Number of polygons the model produced
    #[serde(default)]
    pub n_polygons: Option<u64>,

    /// Model wall time in seconds
    #[serde(default)]
    pub runtime_sec: Option<f64>,
}

/// JSON object the child may emit on stdout after a failed exit.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FailureReport {
    /// User-facing reason for the failure
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Interpretation
// =============================================================================

/// Interpreted success-path stdout.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessSummary {
    /// One-line message for the user
    pub message: String,

    /// Polygon count, when the child reported one
    pub polygon_count: Option<u64>,

    /// Model runtime in seconds, when the child reported one
    pub runtime_sec: Option<f64>,
}

/// Interpret stdout after a zero exit.
///
/// The specific "found N polygons" message requires both optional fields;
/// anything else, including empty or invalid JSON, yields the generic
/// success message. This path never fails.
pub fn success_summary(stdout: &str) -> SuccessSummary {
    let report = match serde_json::from_str::<SuccessReport>(stdout) {
        Ok(report) => report,
        Err(err) => {
            if !stdout.trim().is_empty() {
                debug!("Could not parse success JSON: {}", err);
            }
            SuccessReport::default()
        }
    };

    let message = match (report.n_polygons, report.runtime_sec) {
        (Some(n), Some(runtime)) => format!("Found {n} polygon(s) in {runtime:.3}s."),
        _ => "Inference complete.".to_string(),
    };

    SuccessSummary {
        message,
        polygon_count: report.n_polygons,
        runtime_sec: report.runtime_sec,
    }
}

/// Classify stdout after a non-zero exit into a user-facing reason.
///
/// Prefers the child's own `message`; empty stdout or JSON without a
/// message falls back to a generic reason referencing the log file, and
/// non-JSON stdout is noted as such. Parse failures are logged at a low
/// severity and never escalate.
pub fn failure_reason(stdout: &str, log_file: &Path) -> String {
    if stdout.trim().is_empty() {
        return format!("Inference run failed. Check log file: {}", log_file.display());
    }

    match serde_json::from_str::<FailureReport>(stdout) {
        Ok(FailureReport {
            message: Some(message),
        }) => message,
        Ok(FailureReport { message: None }) => {
            format!("Inference run failed. Check log file: {}", log_file.display())
        }
        Err(err) => {
            warn!("Could not parse error JSON: {}", err);
            format!(
                "Inference failed with non-JSON output. Check log file: {}",
                log_file.display()
            )
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
