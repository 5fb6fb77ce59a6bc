use mpsync_sim::{CampaignConfig, ScenarioConfig, replay_seed, run_campaign};

#[test]
fn default_campaign_converges() {
    let report = run_campaign(&CampaignConfig::default()).unwrap();
    assert_eq!(report.seeds_run, 100);
    assert!(report.all_passed(), "{:#?}", report.failures);
}

#[test]
fn messy_crm_still_converges() {
    let config = CampaignConfig {
        seed_range: 100..160,
        scenario: ScenarioConfig {
            groups: 20,
            duplicate_percent: 100,
            refund_percent: 100,
            upgrade_percent: 50,
            ..ScenarioConfig::default()
        },
        ..CampaignConfig::default()
    };
    let report = run_campaign(&config).unwrap();
    assert!(report.all_passed(), "{:#?}", report.failures);
    assert!(report.unresolved_duplicate_seeds > 0);
    assert!(report.max_runs_to_fixpoint <= config.max_runs);
}

#[test]
fn replay_is_deterministic() {
    let config = CampaignConfig::default();
    let a = replay_seed(42, &config).unwrap();
    let b = replay_seed(42, &config).unwrap();
    assert_eq!(a.oracle, b.oracle);
    assert_eq!(a.scenario.groups, b.scenario.groups);
}
