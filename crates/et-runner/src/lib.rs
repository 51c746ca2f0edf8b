//! # et-runner
//!
//! Trial execution layer for EveTune campaigns.
//!
//! Builds trainer job invocations, launches them as subprocesses, extracts the
//! validation metric from their output, and records every trial in an
//! append-only tab-separated ledger.

mod job;
mod ledger;
mod metrics;
mod runner;

pub use job::{
    JobError, JobLauncher, JobOutput, JobResult, JobSpec, ProcessLauncher, DEFAULT_LAUNCH_PREFIX,
    REPORT_PATH_ENV,
};
pub use ledger::{TrialLedger, LEDGER_HEADER};
pub use metrics::{MetricExtractor, METRIC_MARKER};
pub use runner::{CompletedTrial, TrialRunner, JOB_LOG_NAME, REPORT_NAME};
