//! Campaign report and machine-readable summary.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use et_runner::{TrialLedger, LEDGER_HEADER};
use et_types::{CampaignConfig, EtResult, Metric, Stage, TrialRecord};

/// File name of the campaign summary, written into the log directory.
pub const SUMMARY_NAME: &str = "eve_summary.json";

/// Everything a finished campaign produced.
pub struct CampaignReport {
    pub config: CampaignConfig,
    mechanism: TrialLedger,
    baseline: TrialLedger,
    runtimes: HashMap<(Stage, String), Duration>,
}

impl CampaignReport {
    pub fn new(
        config: CampaignConfig,
        mechanism: TrialLedger,
        baseline: TrialLedger,
        runtimes: HashMap<(Stage, String), Duration>,
    ) -> Self {
        Self {
            config,
            mechanism,
            baseline,
            runtimes,
        }
    }

    /// Ledger of mechanism-on trials.
    pub fn mechanism(&self) -> &TrialLedger {
        &self.mechanism
    }

    /// Ledger of the mechanism-off baseline.
    pub fn baseline(&self) -> &TrialLedger {
        &self.baseline
    }

    /// True when any trial in either ledger produced a finite metric.
    pub fn has_finite_result(&self) -> bool {
        self.mechanism
            .records()
            .iter()
            .chain(self.baseline.records())
            .any(|r| r.metric.is_finite())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.config.log_dir.join(SUMMARY_NAME)
    }

    /// Prints the ranked trial tables and, when a trial succeeded, the
    /// recommended settings.
    pub fn print(&self) {
        for line in self.render_lines() {
            println!("{line}");
        }
    }

    /// Report body, one printed line per element. Empty ledgers render no
    /// table, so a baseline-only campaign shows only the baseline.
    fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if !self.mechanism.is_empty() {
            lines.push(String::new());
            lines.push("Trials ranked by validation bpb:".to_string());
            lines.push(LEDGER_HEADER.join("\t"));
            for record in self.mechanism.ranked_view() {
                lines.push(TrialLedger::row(record).join("\t"));
            }
        }

        if !self.baseline.is_empty() {
            lines.push(String::new());
            lines.push("Baseline (mechanism off):".to_string());
            lines.push(LEDGER_HEADER.join("\t"));
            for record in self.baseline.ranked_view() {
                lines.push(TrialLedger::row(record).join("\t"));
            }
        }

        if let Some(best) = self.mechanism.best() {
            lines.push(String::new());
            lines.push("Recommended Eve settings:".to_string());
            lines.push(format!("  beta1 = {:.4}", best.params.beta1));
            lines.push(format!("  beta2 = {:.6}", best.params.beta2));
            lines.push(format!("  eta   = {:.3}", best.params.eta));
            if let Metric::Value(value) = best.metric {
                lines.push(format!(
                    "  min bpb observed = {value:.4} ({}, {} iters)",
                    best.stage, best.iters
                ));
            }
            lines.push(format!(
                "  summary written to {}",
                self.summary_path().display()
            ));
        }

        lines
    }

    /// Writes the JSON summary and returns its path.
    pub fn write_summary(&self) -> EtResult<PathBuf> {
        let best = self.mechanism.best().map(|record| {
            json!({
                "beta1": record.params.beta1,
                "beta2": record.params.beta2,
                "eta": record.params.eta,
                "min_bpb": metric_json(record.metric),
                "stage": record.stage.as_str(),
                "iterations": record.iters,
            })
        });
        let trials: Vec<serde_json::Value> = self
            .mechanism
            .records()
            .iter()
            .filter(|r| r.metric.is_finite())
            .map(|r| self.trial_json(r))
            .collect();
        let baseline = self.baseline.records().first().map(|r| self.trial_json(r));

        let summary = json!({
            "campaign_id": self.config.id,
            "profile": self.config.profile.as_str(),
            "seed": self.config.seed,
            "best": best,
            "trials": trials,
            "baseline": baseline,
        });

        let path = self.summary_path();
        fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        info!(path = %path.display(), "summary written");
        Ok(path)
    }

    fn trial_json(&self, record: &TrialRecord) -> serde_json::Value {
        let runtime_minutes = self
            .runtimes
            .get(&(record.stage, record.trial.clone()))
            .map(|d| d.as_secs_f64() / 60.0);
        json!({
            "stage": record.stage.as_str(),
            "trial": record.trial,
            "beta1": record.params.beta1,
            "beta2": record.params.beta2,
            "eta": record.params.eta,
            "min_bpb": metric_json(record.metric),
            "iterations": record.iters,
            "runtime_minutes": runtime_minutes,
            "report_path": record.report_path.display().to_string(),
        })
    }
}

fn metric_json(metric: Metric) -> serde_json::Value {
    match metric {
        Metric::Value(value) => json!(value),
        Metric::Unknown(_) => serde_json::Value::Null,
    }
}
