//! Campaign runner: many seeds, one report.
//!
//! Each seed gets a fresh scenario and a fresh CRM. The first failing seed
//! is reported separately so it can be replayed with [`replay_seed`].

use std::ops::Range;

use anyhow::{Result, bail};
use mpsync_core::config::DealsConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::crm::SimCrm;
use crate::oracle::{ConvergenceOracle, OracleResult};
use crate::scenario::{Scenario, ScenarioConfig, ScenarioGenerator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub seed_range: Range<u64>,
    /// Engine runs allowed before a seed counts as non-converging.
    pub max_runs: usize,
    pub scenario: ScenarioConfig,
    pub deals: DealsConfig,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            seed_range: 0..100,
            max_runs: 4,
            scenario: ScenarioConfig::default(),
            deals: DealsConfig::default(),
        }
    }
}

impl CampaignConfig {
    /// # Errors
    ///
    /// Returns an error if any parameter is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.max_runs == 0 {
            bail!("max_runs must be > 0");
        }
        if self.scenario.groups == 0 {
            bail!("scenario.groups must be > 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    /// First seed that failed, for replay.
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
    /// Seeds whose runs hit duplicates with activity on more than one deal.
    pub unresolved_duplicate_seeds: usize,
    /// Most engine runs any seed needed to converge.
    pub max_runs_to_fixpoint: usize,
}

impl CampaignReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A single seed's scenario and oracle verdict.
#[derive(Debug, Clone)]
pub struct DetailedTrace {
    pub scenario: Scenario,
    pub oracle: OracleResult,
}

/// Run every seed in `config.seed_range`.
///
/// # Errors
///
/// Returns an error if the config is invalid or the simulated CRM rejects
/// an outcome.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        first_failure: None,
        failures: Vec::new(),
        unresolved_duplicate_seeds: 0,
        max_runs_to_fixpoint: 0,
    };

    for seed in config.seed_range.clone() {
        report.seeds_run += 1;
        let trace = replay_seed(seed, config)?;
        let oracle = &trace.oracle;

        if oracle.runs.iter().any(|r| r.unresolved > 0) {
            report.unresolved_duplicate_seeds += 1;
        }
        if let Some(run) = oracle.fixpoint_run {
            report.max_runs_to_fixpoint = report.max_runs_to_fixpoint.max(run + 1);
        }

        if oracle.passed {
            report.seeds_passed += 1;
        } else {
            warn!(seed, violations = oracle.violations.len(), "seed failed");
            if report.first_failure.is_none() {
                report.first_failure = Some(seed);
            }
            report.failures.push(SeedFailure {
                seed,
                violations: oracle.violations.iter().map(ToString::to_string).collect(),
            });
        }
    }

    Ok(report)
}

/// Generate and check one seed, keeping everything for inspection.
///
/// # Errors
///
/// Returns an error if the config is invalid or the simulated CRM rejects
/// an outcome.
pub fn replay_seed(seed: u64, config: &CampaignConfig) -> Result<DetailedTrace> {
    config.validate()?;

    let scenario = ScenarioGenerator::new(config.scenario.clone()).generate(seed);
    let mut crm = SimCrm::new(config.deals.clone());
    crm.seed(scenario.seeded_deals.iter().cloned());

    let oracle = ConvergenceOracle::new(config.max_runs).check_all(&scenario, &mut crm)?;
    Ok(DetailedTrace { scenario, oracle })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_bad_ranges() {
        let empty = CampaignConfig {
            seed_range: 5..5,
            ..CampaignConfig::default()
        };
        assert!(empty.validate().is_err());

        let no_runs = CampaignConfig {
            max_runs: 0,
            ..CampaignConfig::default()
        };
        assert!(run_campaign(&no_runs).is_err());
    }

    #[test]
    fn small_campaign_passes() {
        let config = CampaignConfig {
            seed_range: 0..25,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign");
        assert_eq!(report.seeds_run, 25);
        assert!(report.all_passed(), "{:?}", report.failures);
        assert_eq!(report.first_failure, None);
        assert!(report.max_runs_to_fixpoint >= 2);
        assert!(report.max_runs_to_fixpoint <= config.max_runs);
    }

    #[test]
    fn tight_run_budget_reports_first_failure() {
        let config = CampaignConfig {
            seed_range: 10..14,
            max_runs: 1,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign");
        assert!(!report.all_passed());
        assert_eq!(report.first_failure, Some(10));
        assert!(report.failures[0].violations[0].starts_with("NoFixpoint"));
    }

    #[test]
    fn replay_matches_campaign_verdict() {
        let config = CampaignConfig::default();
        let trace = replay_seed(7, &config).expect("replay");
        assert!(trace.oracle.passed);
        assert_eq!(trace.scenario.seed, 7);
        assert!(!trace.oracle.runs.is_empty());
    }
}
