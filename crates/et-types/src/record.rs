//! Trial records, campaign stages, and metric outcomes.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::params::HyperParams;

/// Campaign phase a trial belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Stage1,
    Stage2,
    Baseline,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Stage1 => "stage1",
            Stage::Stage2 => "stage2",
            Stage::Baseline => "baseline",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "stage1" => Some(Stage::Stage1),
            "stage2" => Some(Stage::Stage2),
            "baseline" => Some(Stage::Baseline),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a trial carries no usable metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCause {
    /// The job exited non-zero or never launched; parsed values from its
    /// output are not trusted.
    JobFailed,
    /// Neither the report artifact nor the raw log contained a usable
    /// marker line.
    MarkerMissing,
    /// Loaded from a persisted table, which does not keep the cause.
    Unrecorded,
}

impl fmt::Display for UnknownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnknownCause::JobFailed => "job failed",
            UnknownCause::MarkerMissing => "metric marker missing",
            UnknownCause::Unrecorded => "cause not recorded",
        };
        f.write_str(text)
    }
}

/// Metric outcome of one trial.
///
/// An unknown outcome ranks strictly worse than any finite value. Its cause
/// is diagnostic metadata and does not participate in equality, so a record
/// persisted and re-read compares equal to the original.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Metric {
    Value(f64),
    Unknown(UnknownCause),
}

impl Metric {
    pub fn is_finite(&self) -> bool {
        matches!(self, Metric::Value(_))
    }

    /// Ranking order: finite values ascending, unknown outcomes after every
    /// finite value, unknowns tied with each other.
    pub fn rank_cmp(&self, other: &Metric) -> Ordering {
        match (self, other) {
            (Metric::Value(a), Metric::Value(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Metric::Value(_), Metric::Unknown(_)) => Ordering::Less,
            (Metric::Unknown(_), Metric::Value(_)) => Ordering::Greater,
            (Metric::Unknown(_), Metric::Unknown(_)) => Ordering::Equal,
        }
    }
}

impl PartialEq for Metric {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Metric::Value(a), Metric::Value(b)) => a == b,
            (Metric::Unknown(_), Metric::Unknown(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v:.6}"),
            Metric::Unknown(_) => f.write_str("inf"),
        }
    }
}

/// One completed trial. Immutable once written to a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub stage: Stage,
    /// Identifier unique within the stage. Refinement trials decorate their
    /// seed's identifier with `_anchor` or `_jitter`.
    pub trial: String,
    pub params: HyperParams,
    pub metric: Metric,
    pub iters: u32,
    /// Trial artifact directory holding the captured log and any report.
    pub report_path: PathBuf,
}
