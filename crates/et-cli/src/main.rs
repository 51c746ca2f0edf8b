//! Command-line entry point for EveTune campaigns.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use et_runner::ProcessLauncher;
use et_search::SearchController;
use et_types::{CampaignConfig, ConfigError, GpuProfile};

/// Staged hyperparameter search for the Eve update mechanism.
#[derive(Debug, Parser)]
#[command(name = "evetune", version, about)]
struct Cli {
    /// GPU profile sizing each trainer job.
    #[arg(long, default_value = "h100", value_parser = parse_profile)]
    profile: GpuProfile,

    /// Random exploration trials in stage 1.
    #[arg(long, default_value_t = 4)]
    stage1_trials: usize,

    /// Trainer iterations per stage 1 trial.
    #[arg(long, default_value_t = 2500)]
    stage1_iters: u32,

    /// Candidates promoted to stage 2 refinement.
    #[arg(long, default_value_t = 2)]
    stage2_trials: usize,

    /// Trainer iterations per stage 2 trial.
    #[arg(long, default_value_t = 5000)]
    stage2_iters: u32,

    /// Trainer iterations for the mechanism-off baseline.
    #[arg(long, default_value_t = 5000)]
    baseline_iters: u32,

    /// Tokens evaluated per validation pass.
    #[arg(long, default_value_t = 16_384)]
    eval_tokens: u64,

    /// Seed driving all campaign sampling.
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Directory receiving ledgers, trial artifacts, and the summary.
    #[arg(long, default_value = "autotune_logs")]
    log_dir: PathBuf,

    /// Run trainer jobs from this directory.
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Extra flag passed through to every trainer job; repeatable.
    #[arg(long, allow_hyphen_values = true)]
    extra_flag: Vec<String>,

    /// Skip the search stages and run only the mechanism-off baseline.
    #[arg(long)]
    baseline_only: bool,
}

fn parse_profile(raw: &str) -> Result<GpuProfile, ConfigError> {
    raw.parse()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "evetune starting");

    let config = CampaignConfig::new(cli.profile)
        .with_stage1(cli.stage1_trials, cli.stage1_iters)
        .with_stage2(cli.stage2_trials, cli.stage2_iters)
        .with_baseline_iters(cli.baseline_iters)
        .with_eval_tokens(cli.eval_tokens)
        .with_seed(cli.seed)
        .with_log_dir(cli.log_dir)
        .with_extra_flags(cli.extra_flag)
        .with_baseline_only(cli.baseline_only);
    config.validate().context("invalid campaign configuration")?;

    let mut launcher = ProcessLauncher::new();
    if let Some(dir) = cli.workdir {
        launcher = launcher.with_workdir(dir);
    }

    let log_dir = config.log_dir.clone();
    let report = SearchController::new(config, Box::new(launcher)).run()?;
    if !report.has_finite_result() {
        bail!(
            "all trials failed; please inspect logs in {}",
            log_dir.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_trainer_expectations() {
        let cli = Cli::try_parse_from(["evetune"]).unwrap();
        assert_eq!(cli.profile, GpuProfile::H100);
        assert_eq!(cli.stage1_trials, 4);
        assert_eq!(cli.stage1_iters, 2500);
        assert_eq!(cli.stage2_trials, 2);
        assert_eq!(cli.stage2_iters, 5000);
        assert_eq!(cli.baseline_iters, 5000);
        assert_eq!(cli.eval_tokens, 16_384);
        assert_eq!(cli.seed, 1337);
        assert_eq!(cli.log_dir, PathBuf::from("autotune_logs"));
        assert!(cli.workdir.is_none());
        assert!(cli.extra_flag.is_empty());
        assert!(!cli.baseline_only);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "evetune",
            "--profile",
            "rtx5090",
            "--stage1-trials",
            "8",
            "--stage2-trials",
            "3",
            "--seed",
            "7",
            "--log-dir",
            "/tmp/campaign",
            "--workdir",
            "/srv/trainer",
            "--baseline-only",
        ])
        .unwrap();
        assert_eq!(cli.profile, GpuProfile::Rtx5090);
        assert_eq!(cli.stage1_trials, 8);
        assert_eq!(cli.stage2_trials, 3);
        assert_eq!(cli.seed, 7);
        assert_eq!(cli.log_dir, PathBuf::from("/tmp/campaign"));
        assert_eq!(cli.workdir, Some(PathBuf::from("/srv/trainer")));
        assert!(cli.baseline_only);
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert!(Cli::try_parse_from(["evetune", "--profile", "tpu"]).is_err());
    }

    #[test]
    fn extra_flags_accumulate_in_order() {
        let cli = Cli::try_parse_from([
            "evetune",
            "--extra-flag",
            "--compile=0",
            "--extra-flag",
            "--val_loss_every=250",
        ])
        .unwrap();
        assert_eq!(cli.extra_flag, vec!["--compile=0", "--val_loss_every=250"]);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["evetune", "--bogus"]).is_err());
    }
}
