//! # et-search
//!
//! Staged campaign orchestration for EveTune.
//!
//! Drives the full search: uniform exploration, top-K selection, local
//! refinement around the survivors, and a mechanism-off baseline, then
//! produces the ranked report and machine-readable summary.

mod controller;
mod report;
mod sampler;

pub use controller::{SearchController, BASELINE_LEDGER_NAME, EVE_LEDGER_NAME};
pub use report::{CampaignReport, SUMMARY_NAME};
pub use sampler::ParamSampler;
