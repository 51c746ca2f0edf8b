//! Campaign configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ConfigError;
use crate::params::{HyperParams, JitterWindow, SearchSpace};

/// Unique campaign identifier
pub type CampaignId = Uuid;

/// Accelerator profile a campaign is sized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuProfile {
    H100,
    Rtx5090,
}

impl GpuProfile {
    /// Micro-batch size the trainer sustains on one device of this kind.
    pub fn device_batch_size(&self) -> u32 {
        match self {
            GpuProfile::H100 => 24,
            GpuProfile::Rtx5090 => 12,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GpuProfile::H100 => "h100",
            GpuProfile::Rtx5090 => "rtx5090",
        }
    }
}

impl fmt::Display for GpuProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GpuProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "h100" => Ok(GpuProfile::H100),
            "rtx5090" => Ok(GpuProfile::Rtx5090),
            other => Err(ConfigError::UnknownProfile {
                name: other.to_string(),
            }),
        }
    }
}

/// Full configuration of one search campaign.
///
/// Built once at startup, validated eagerly, then read-only; every component
/// receives it by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub id: CampaignId,
    pub profile: GpuProfile,

    /// Number of random exploration trials.
    pub stage1_trials: usize,
    /// Iteration budget per exploration trial.
    pub stage1_iters: u32,
    /// Number of candidates promoted to refinement.
    pub stage2_trials: usize,
    /// Iteration budget per refinement trial.
    pub stage2_iters: u32,
    /// Iteration budget for the mechanism-off baseline trial.
    pub baseline_iters: u32,

    /// Tokens evaluated per validation pass.
    pub eval_tokens: u64,
    /// Seed driving all campaign sampling.
    pub seed: u64,
    /// Skip exploration and refinement; run only the baseline trial.
    pub baseline_only: bool,

    /// Exploration sampling intervals.
    pub space: SearchSpace,
    /// Perturbation half-widths for refinement jitter.
    pub jitter: JitterWindow,
    /// Parameters recorded for the baseline trial (the trainer defaults).
    pub baseline_params: HyperParams,

    /// Directory receiving trial artifacts, ledgers, and the summary.
    pub log_dir: PathBuf,
    /// Flags passed through verbatim to every trainer job.
    pub extra_flags: Vec<String>,

    pub created_at: DateTime<Utc>,
}

impl CampaignConfig {
    pub fn new(profile: GpuProfile) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile,
            stage1_trials: 4,     // broad exploration passes
            stage1_iters: 2500,   // short budget per exploration trial
            stage2_trials: 2,     // candidates promoted to refinement
            stage2_iters: 5000,   // longer budget per refinement trial
            baseline_iters: 5000,
            eval_tokens: 16_384,
            seed: 1337,
            baseline_only: false,
            space: SearchSpace::default(),
            jitter: JitterWindow::default(),
            baseline_params: HyperParams::default(),
            log_dir: PathBuf::from("autotune_logs"),
            extra_flags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_stage1(mut self, trials: usize, iters: u32) -> Self {
        self.stage1_trials = trials;
        self.stage1_iters = iters;
        self
    }

    pub fn with_stage2(mut self, trials: usize, iters: u32) -> Self {
        self.stage2_trials = trials;
        self.stage2_iters = iters;
        self
    }

    pub fn with_baseline_iters(mut self, iters: u32) -> Self {
        self.baseline_iters = iters;
        self
    }

    pub fn with_eval_tokens(mut self, tokens: u64) -> Self {
        self.eval_tokens = tokens;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_baseline_only(mut self, baseline_only: bool) -> Self {
        self.baseline_only = baseline_only;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_extra_flags(mut self, flags: Vec<String>) -> Self {
        self.extra_flags = flags;
        self
    }

    /// Rejects malformed configurations before any trial runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage1_trials == 0 && !self.baseline_only {
            return Err(ConfigError::ZeroCount {
                field: "stage1-trials",
            });
        }
        if self.stage1_iters == 0 {
            return Err(ConfigError::ZeroCount {
                field: "stage1-iters",
            });
        }
        if self.stage2_iters == 0 {
            return Err(ConfigError::ZeroCount {
                field: "stage2-iters",
            });
        }
        if self.baseline_iters == 0 {
            return Err(ConfigError::ZeroCount {
                field: "baseline-iters",
            });
        }
        if self.eval_tokens == 0 {
            return Err(ConfigError::ZeroCount {
                field: "eval-tokens",
            });
        }

        for (param, interval) in [
            ("beta1", &self.space.beta1),
            ("beta2", &self.space.beta2),
            ("eta", &self.space.eta),
        ] {
            if !interval.is_valid() {
                return Err(ConfigError::InvalidInterval {
                    param,
                    low: interval.low,
                    high: interval.high,
                });
            }
        }
        if !self.space.is_within_hard_bounds() {
            return Err(ConfigError::IntervalOutOfBounds { param: "space" });
        }

        for (param, width) in [
            ("beta1", self.jitter.beta1),
            ("beta2", self.jitter.beta2),
            ("eta", self.jitter.eta),
        ] {
            if !width.is_finite() || width < 0.0 {
                return Err(ConfigError::InvalidJitter { param, width });
            }
        }

        Ok(())
    }
}
