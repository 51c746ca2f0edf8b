//! Validation metric extraction from trainer output.

use std::fs;
use std::path::Path;

use tracing::debug;

use et_types::{quantize, Metric, UnknownCause};

/// Substring identifying a validation result line in trainer output.
pub const METRIC_MARKER: &str = "Validation bpb";

/// Scans trainer output for validation lines and keeps the minimum value.
pub struct MetricExtractor {
    marker: String,
}

impl MetricExtractor {
    pub fn new() -> Self {
        Self {
            marker: METRIC_MARKER.to_string(),
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Minimum finite value over all marker lines, parsed from the text after
    /// the last colon and rounded to table precision so the value survives a
    /// ledger round-trip. Lines that fail to parse are skipped.
    pub fn scan(&self, text: &str) -> Option<f64> {
        let mut best: Option<f64> = None;
        for line in text.lines() {
            if !line.contains(self.marker.as_str()) {
                continue;
            }
            let field = match line.rsplit(':').next() {
                Some(field) => field.trim(),
                None => continue,
            };
            if let Ok(value) = field.parse::<f64>() {
                let value = quantize(value);
                if value.is_finite() {
                    best = Some(match best {
                        Some(current) if current <= value => current,
                        _ => value,
                    });
                }
            }
        }
        best
    }

    /// Metric for one finished trial. The report file is authoritative when it
    /// exists and contains a marker line; otherwise the captured job output is
    /// scanned.
    pub fn extract(&self, report_path: &Path, log_text: &str) -> Metric {
        if let Ok(report) = fs::read_to_string(report_path) {
            if let Some(value) = self.scan(&report) {
                debug!(path = %report_path.display(), value, "metric taken from report file");
                return Metric::Value(value);
            }
        }
        match self.scan(log_text) {
            Some(value) => {
                debug!(value, "metric taken from captured job output");
                Metric::Value(value)
            }
            None => Metric::Unknown(UnknownCause::MarkerMissing),
        }
    }
}

impl Default for MetricExtractor {
    fn default() -> Self {
        Self::new()
    }
}
