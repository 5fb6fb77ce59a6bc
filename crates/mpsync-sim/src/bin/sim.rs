#![forbid(unsafe_code)]

use anyhow::Result;
use mpsync_core::config::EngineConfig;
use mpsync_core::telemetry::init_tracing;
use mpsync_sim::{CampaignConfig, run_campaign};

fn main() -> Result<()> {
    init_tracing(&EngineConfig::default().log);

    let report = run_campaign(&CampaignConfig::default())?;
    println!(
        "campaign complete: seeds={} passed={} max_runs_to_fixpoint={} unresolved_duplicate_seeds={}",
        report.seeds_run,
        report.seeds_passed,
        report.max_runs_to_fixpoint,
        report.unresolved_duplicate_seeds
    );

    if let Some(seed) = report.first_failure {
        println!("{}", serde_json::to_string_pretty(&report.failures)?);
        anyhow::bail!("seed {seed} failed; replay it with replay_seed({seed}, ..)");
    }
    Ok(())
}
