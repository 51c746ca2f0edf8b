//! Single-trial execution.

use std::fs;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};

use et_types::{CampaignConfig, EtResult, HyperParams, Metric, Stage, TrialRecord, UnknownCause};

use crate::job::{JobLauncher, JobSpec};
use crate::ledger::TrialLedger;
use crate::metrics::MetricExtractor;

/// Captured job output, written into every trial directory.
pub const JOB_LOG_NAME: &str = "job.log";
/// Report file the trainer may write, advertised through the environment.
pub const REPORT_NAME: &str = "report.md";

const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// A finished trial: its ledger record plus the wall-clock runtime.
#[derive(Debug, Clone)]
pub struct CompletedTrial {
    pub record: TrialRecord,
    pub runtime: Duration,
}

/// Runs one trial at a time: creates the artifact directory, launches the
/// job, extracts the metric, and appends the outcome to the ledger.
///
/// A job that fails to launch or exits non-zero is recorded with an unknown
/// metric; only filesystem and ledger problems abort the campaign.
pub struct TrialRunner {
    launcher: Box<dyn JobLauncher>,
    extractor: MetricExtractor,
}

impl TrialRunner {
    pub fn new(launcher: Box<dyn JobLauncher>) -> Self {
        Self {
            launcher,
            extractor: MetricExtractor::new(),
        }
    }

    pub fn run(
        &self,
        config: &CampaignConfig,
        stage: Stage,
        trial: &str,
        params: HyperParams,
        iterations: u32,
        ledger: &mut TrialLedger,
    ) -> EtResult<CompletedTrial> {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let trial_dir = config.log_dir.join(format!("{stage}_{trial}_{stamp}"));
        fs::create_dir_all(&trial_dir)?;
        let report_path = trial_dir.join(REPORT_NAME);

        let spec = JobSpec {
            run_name: format!("autotune_{stage}_{trial}"),
            profile: config.profile,
            params,
            iterations,
            eval_tokens: config.eval_tokens,
            mechanism_enabled: stage != Stage::Baseline,
            extra_flags: config.extra_flags.clone(),
        };

        info!(
            stage = %stage,
            trial,
            beta1 = params.beta1,
            beta2 = params.beta2,
            eta = params.eta,
            iterations,
            "starting trial"
        );

        let started = Instant::now();
        let launch = self.launcher.launch(&spec, &report_path);
        let runtime = started.elapsed();

        let (metric, combined) = match launch {
            Ok(output) => {
                let metric = if output.success {
                    self.extractor.extract(&report_path, &output.combined_output)
                } else {
                    warn!(
                        stage = %stage,
                        trial,
                        exit_code = ?output.exit_code,
                        "trainer job exited with failure"
                    );
                    Metric::Unknown(UnknownCause::JobFailed)
                };
                (metric, output.combined_output)
            }
            Err(err) => {
                warn!(stage = %stage, trial, error = %err, "trainer job could not be launched");
                (Metric::Unknown(UnknownCause::JobFailed), String::new())
            }
        };

        fs::write(trial_dir.join(JOB_LOG_NAME), &combined)?;

        if let Metric::Unknown(cause) = metric {
            warn!(
                stage = %stage,
                trial,
                cause = %cause,
                tail = %tail(&combined, DIAGNOSTIC_TAIL_LINES),
                "trial produced no usable metric"
            );
        }

        let record = TrialRecord {
            stage,
            trial: trial.to_string(),
            params,
            metric,
            iters: iterations,
            report_path: trial_dir,
        };
        ledger.append(record.clone())?;
        info!("{}", format_result(&record, runtime));

        Ok(CompletedTrial { record, runtime })
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

fn format_result(record: &TrialRecord, runtime: Duration) -> String {
    let metric = match record.metric {
        Metric::Value(value) => format!("{value:.4}"),
        Metric::Unknown(_) => "inf".to_string(),
    };
    format!(
        "[{}] {}: min_bpb={}, beta1={:.4}, beta2={:.6}, eta={:.3}, iters={}, runtime={:.1}m",
        record.stage,
        record.trial,
        metric,
        record.params.beta1,
        record.params.beta2,
        record.params.eta,
        record.iters,
        runtime.as_secs_f64() / 60.0
    )
}
