//! Campaign orchestration.

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use tracing::{info, warn};

use et_runner::{JobLauncher, TrialLedger, TrialRunner};
use et_types::{CampaignConfig, EtResult, Stage, TrialRecord};

use crate::report::CampaignReport;
use crate::sampler::ParamSampler;

/// Ledger of mechanism-on trials.
pub const EVE_LEDGER_NAME: &str = "eve_trials.tsv";
/// Ledger of the mechanism-off baseline.
pub const BASELINE_LEDGER_NAME: &str = "baseline_trials.tsv";

/// Runs a full campaign: exploration, selection, refinement, baseline,
/// then reporting.
///
/// Trial failures are recorded and the campaign moves on; only configuration,
/// filesystem, and ledger problems abort it.
pub struct SearchController {
    config: CampaignConfig,
    runner: TrialRunner,
    sampler: ParamSampler,
}

impl SearchController {
    pub fn new(config: CampaignConfig, launcher: Box<dyn JobLauncher>) -> Self {
        let sampler = ParamSampler::new(config.seed);
        Self {
            config,
            runner: TrialRunner::new(launcher),
            sampler,
        }
    }

    pub fn run(mut self) -> EtResult<CampaignReport> {
        self.config.validate()?;
        fs::create_dir_all(&self.config.log_dir)?;

        let mut eve = TrialLedger::create(self.config.log_dir.join(EVE_LEDGER_NAME))?;
        let mut baseline = TrialLedger::create(self.config.log_dir.join(BASELINE_LEDGER_NAME))?;
        let mut runtimes: HashMap<(Stage, String), Duration> = HashMap::new();

        info!(
            campaign = %self.config.id,
            profile = %self.config.profile,
            seed = self.config.seed,
            "campaign starting"
        );

        if !self.config.baseline_only {
            self.run_stage1(&mut eve, &mut runtimes)?;
            let seeds = self.select_seeds(&eve);
            self.run_stage2(&seeds, &mut eve, &mut runtimes)?;
        }
        self.run_baseline(&mut baseline, &mut runtimes)?;

        let report = CampaignReport::new(self.config, eve, baseline, runtimes);
        let summary_path = report.write_summary()?;
        report.print();
        info!(path = %summary_path.display(), "campaign complete");
        Ok(report)
    }

    fn run_stage1(
        &mut self,
        ledger: &mut TrialLedger,
        runtimes: &mut HashMap<(Stage, String), Duration>,
    ) -> EtResult<()> {
        info!(
            trials = self.config.stage1_trials,
            iters = self.config.stage1_iters,
            "stage 1: evaluating random candidates"
        );
        for index in 1..=self.config.stage1_trials {
            let trial = index.to_string();
            let params = self.sampler.sample(&self.config.space);
            let done = self.runner.run(
                &self.config,
                Stage::Stage1,
                &trial,
                params,
                self.config.stage1_iters,
                ledger,
            )?;
            runtimes.insert((Stage::Stage1, trial), done.runtime);
        }
        Ok(())
    }

    /// Top finite-metric exploration results, best first.
    fn select_seeds(&self, ledger: &TrialLedger) -> Vec<TrialRecord> {
        let seeds: Vec<TrialRecord> = ledger
            .ranked_view()
            .into_iter()
            .filter(|r| r.metric.is_finite())
            .take(self.config.stage2_trials)
            .cloned()
            .collect();
        for seed in &seeds {
            info!(trial = %seed.trial, metric = %seed.metric, "selected for refinement");
        }
        seeds
    }

    fn run_stage2(
        &mut self,
        seeds: &[TrialRecord],
        ledger: &mut TrialLedger,
        runtimes: &mut HashMap<(Stage, String), Duration>,
    ) -> EtResult<()> {
        if seeds.is_empty() {
            if self.config.stage2_trials > 0 {
                warn!("no exploration trial produced a usable metric; skipping refinement");
            }
            return Ok(());
        }
        info!(
            candidates = seeds.len(),
            iters = self.config.stage2_iters,
            "stage 2: refining candidates"
        );
        for seed in seeds {
            let anchor = format!("{}_anchor", seed.trial);
            let done = self.runner.run(
                &self.config,
                Stage::Stage2,
                &anchor,
                seed.params,
                self.config.stage2_iters,
                ledger,
            )?;
            runtimes.insert((Stage::Stage2, anchor), done.runtime);

            let jittered = self.sampler.jitter(seed.params, &self.config.jitter);
            let jitter = format!("{}_jitter", seed.trial);
            let done = self.runner.run(
                &self.config,
                Stage::Stage2,
                &jitter,
                jittered,
                self.config.stage2_iters,
                ledger,
            )?;
            runtimes.insert((Stage::Stage2, jitter), done.runtime);
        }
        Ok(())
    }

    fn run_baseline(
        &mut self,
        ledger: &mut TrialLedger,
        runtimes: &mut HashMap<(Stage, String), Duration>,
    ) -> EtResult<()> {
        info!(
            iters = self.config.baseline_iters,
            "baseline: mechanism off"
        );
        let done = self.runner.run(
            &self.config,
            Stage::Baseline,
            "1",
            self.config.baseline_params,
            self.config.baseline_iters,
            ledger,
        )?;
        runtimes.insert((Stage::Baseline, "1".to_string()), done.runtime);
        Ok(())
    }
}
