//! Trainer job construction and subprocess launching.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

use et_types::{GpuProfile, HyperParams};

/// Launch prefix for real trainer jobs. Overridable for harness setups that
/// wrap or replace `torchrun`.
pub const DEFAULT_LAUNCH_PREFIX: &[&str] = &[
    "torchrun",
    "--standalone",
    "--nproc_per_node=1",
    "-m",
    "scripts.base_train",
    "--",
];

/// Environment variable telling the trainer where to write its report file.
pub const REPORT_PATH_ENV: &str = "EVETUNE_REPORT";

/// Samples accumulated per optimizer step, independent of the device batch.
const TOTAL_BATCH_SIZE: u32 = 49_152;
/// Transformer depth used for every tuning job.
const MODEL_DEPTH: u32 = 12;
const MODEL_TAG: &str = "autotune_eve";
const EVE_EPS: &str = "1e-8";

/// One trainer invocation, fully described.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub run_name: String,
    pub profile: GpuProfile,
    pub params: HyperParams,
    pub iterations: u32,
    pub eval_tokens: u64,
    /// When false the mechanism flags are omitted and the trainer runs its
    /// stock optimizer.
    pub mechanism_enabled: bool,
    pub extra_flags: Vec<String>,
}

impl JobSpec {
    /// Trainer arguments, not including the launch prefix.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--depth={MODEL_DEPTH}"),
            format!("--device_batch_size={}", self.profile.device_batch_size()),
            format!("--total_batch_size={TOTAL_BATCH_SIZE}"),
            format!("--num_iterations={}", self.iterations),
            format!("--eval_tokens={}", self.eval_tokens),
            "--core_metric_every=-1".to_string(),
            "--sample_every=-1".to_string(),
            format!("--run={}", self.run_name),
            format!("--model_tag={MODEL_TAG}"),
        ];
        if self.mechanism_enabled {
            args.push("--eve".to_string());
            args.push("True".to_string());
            args.push(format!("--eve_beta1={:.6}", self.params.beta1));
            args.push(format!("--eve_beta2={:.6}", self.params.beta2));
            args.push(format!("--eve_eta={:.6}", self.params.eta));
            args.push(format!("--eve_eps={EVE_EPS}"));
        }
        args.extend(self.extra_flags.iter().cloned());
        args
    }
}

/// Captured outcome of a finished job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Stdout and stderr, concatenated in that order.
    pub combined_output: String,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to collect output from {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

pub type JobResult<T> = Result<T, JobError>;

/// Launches trainer jobs. Implemented by [`ProcessLauncher`] for real
/// subprocesses and by scripted launchers in tests.
pub trait JobLauncher {
    fn launch(&self, spec: &JobSpec, report_path: &Path) -> JobResult<JobOutput>;
}

/// Runs each job as a blocking subprocess with captured output.
pub struct ProcessLauncher {
    launch_prefix: Vec<String>,
    workdir: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new() -> Self {
        Self {
            launch_prefix: DEFAULT_LAUNCH_PREFIX
                .iter()
                .map(|s| s.to_string())
                .collect(),
            workdir: None,
        }
    }

    pub fn with_launch_prefix(mut self, prefix: Vec<String>) -> Self {
        self.launch_prefix = prefix;
        self
    }

    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Full argv for a job: launch prefix followed by the trainer arguments.
    pub fn argv(&self, spec: &JobSpec) -> Vec<String> {
        let mut argv = self.launch_prefix.clone();
        argv.extend(spec.args());
        argv
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl JobLauncher for ProcessLauncher {
    fn launch(&self, spec: &JobSpec, report_path: &Path) -> JobResult<JobOutput> {
        let argv = self.argv(spec);
        debug!(argv = ?argv, "launching trainer job");

        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }
        // Inherited values win over the defaults.
        if std::env::var_os("WANDB_RUN").is_none() {
            command.env("WANDB_RUN", "dummy");
        }
        if std::env::var_os("OMP_NUM_THREADS").is_none() {
            command.env("OMP_NUM_THREADS", "1");
        }
        command.env(REPORT_PATH_ENV, report_path);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let child = command.spawn().map_err(|source| JobError::Spawn {
            program: argv[0].clone(),
            source,
        })?;
        let output = child.wait_with_output().map_err(|source| JobError::Wait {
            program: argv[0].clone(),
            source,
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        Ok(JobOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            combined_output: combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(mechanism_enabled: bool) -> JobSpec {
        JobSpec {
            run_name: "autotune_stage1_1".to_string(),
            profile: GpuProfile::H100,
            params: HyperParams::new(0.8925, 0.999, 1.05),
            iterations: 2500,
            eval_tokens: 16_384,
            mechanism_enabled,
            extra_flags: Vec::new(),
        }
    }

    #[test]
    fn args_with_mechanism_enabled() {
        let args = spec(true).args();
        assert_eq!(
            args,
            vec![
                "--depth=12",
                "--device_batch_size=24",
                "--total_batch_size=49152",
                "--num_iterations=2500",
                "--eval_tokens=16384",
                "--core_metric_every=-1",
                "--sample_every=-1",
                "--run=autotune_stage1_1",
                "--model_tag=autotune_eve",
                "--eve",
                "True",
                "--eve_beta1=0.892500",
                "--eve_beta2=0.999000",
                "--eve_eta=1.050000",
                "--eve_eps=1e-8",
            ]
        );
    }

    #[test]
    fn args_without_mechanism_omit_eve_flags() {
        let args = spec(false).args();
        assert!(!args.iter().any(|a| a.starts_with("--eve")));
        assert!(!args.contains(&"True".to_string()));
        assert_eq!(args.len(), 9);
    }

    #[test]
    fn extra_flags_come_last() {
        let mut spec = spec(true);
        spec.extra_flags = vec!["--compile=0".to_string(), "--val_loss_every=250".to_string()];
        let args = spec.args();
        assert_eq!(args[args.len() - 2], "--compile=0");
        assert_eq!(args[args.len() - 1], "--val_loss_every=250");
    }

    #[test]
    fn profile_changes_device_batch() {
        let mut spec = spec(true);
        spec.profile = GpuProfile::Rtx5090;
        assert!(spec.args().contains(&"--device_batch_size=12".to_string()));
    }

    #[test]
    fn argv_starts_with_launch_prefix() {
        let launcher = ProcessLauncher::new();
        let argv = launcher.argv(&spec(true));
        assert_eq!(argv[0], "torchrun");
        assert_eq!(argv[5], "--");
        assert_eq!(argv[6], "--depth=12");
    }

    #[test]
    fn launch_captures_output_on_success() {
        let launcher = ProcessLauncher::new().with_launch_prefix(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 'Validation bpb: 0.9123'".to_string(),
        ]);
        let output = launcher
            .launch(&spec(true), Path::new("/tmp/unused_report.md"))
            .unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert!(output.combined_output.contains("Validation bpb: 0.9123"));
    }

    #[test]
    fn launch_reports_nonzero_exit() {
        let launcher = ProcessLauncher::new().with_launch_prefix(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo boom >&2; exit 3".to_string(),
        ]);
        let output = launcher
            .launch(&spec(true), Path::new("/tmp/unused_report.md"))
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert!(output.combined_output.contains("boom"));
    }

    #[test]
    fn launch_missing_program_is_spawn_error() {
        let launcher = ProcessLauncher::new()
            .with_launch_prefix(vec!["definitely-not-a-real-program-4f1a".to_string()]);
        let err = launcher
            .launch(&spec(true), Path::new("/tmp/unused_report.md"))
            .unwrap_err();
        assert!(matches!(err, JobError::Spawn { .. }));
    }

    #[test]
    fn launch_exports_report_path() {
        let launcher = ProcessLauncher::new().with_launch_prefix(vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf '%s' \"$EVETUNE_REPORT\"".to_string(),
        ]);
        let output = launcher
            .launch(&spec(true), Path::new("/tmp/trial_dir/report.md"))
            .unwrap();
        assert_eq!(output.combined_output, "/tmp/trial_dir/report.md");
    }
}
