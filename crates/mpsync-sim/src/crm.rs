//! A CRM stand-in that applies generation outcomes the way the sync layer
//! would.

use std::collections::BTreeSet;

use anyhow::{Result, bail};
use mpsync_core::config::DealsConfig;
use mpsync_core::deals::{
    Action, ActionGenerator, DealSet, GenerationOutcome, InMemoryDealManager,
};
use mpsync_core::events::DealRelevantEvent;
use mpsync_core::model::{Deal, DealComputed, DealData, DealId, DealStage};
use serde::Serialize;
use tracing::debug;

/// Counts from applying one outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

#[derive(Debug)]
pub struct SimCrm {
    manager: InMemoryDealManager,
    config: DealsConfig,
    next_id: u64,
    deleted: BTreeSet<DealId>,
}

impl SimCrm {
    #[must_use]
    pub fn new(config: DealsConfig) -> Self {
        Self {
            manager: InMemoryDealManager::new(),
            config,
            next_id: 0,
            deleted: BTreeSet::new(),
        }
    }

    /// Load deals that existed before the first run.
    pub fn seed(&mut self, deals: impl IntoIterator<Item = Deal>) {
        for deal in deals {
            self.manager.insert(deal);
        }
    }

    /// Generate actions against the current CRM state.
    pub fn generate(&mut self, events: &[DealRelevantEvent]) -> GenerationOutcome {
        ActionGenerator::new(&mut self.manager, &self.config).generate_from(events)
    }

    /// Carry out `outcome`: create deals, write updates and delete the
    /// duplicates the run scheduled.
    ///
    /// # Errors
    ///
    /// Returns an error if an update targets a deal the CRM never had.
    pub fn apply(&mut self, outcome: &GenerationOutcome) -> Result<ApplyStats> {
        let mut stats = ApplyStats::default();

        for action in &outcome.actions {
            match action {
                Action::Create { properties, .. } => {
                    self.next_id += 1;
                    let id = DealId::new(format!("D{}", self.next_id));
                    debug!(deal_id = %id, stage = %properties.stage, "sim crm: create");
                    self.manager.insert(Deal {
                        id,
                        data: properties.clone(),
                        computed: DealComputed {
                            has_activity: progressed(&properties.stage),
                        },
                    });
                    stats.created += 1;
                }
                Action::Update {
                    deal_id, changes, ..
                } => {
                    let Some(mut deal) = self.manager.get(deal_id).cloned() else {
                        if outcome.duplicates.contains_key(deal_id) {
                            debug!(%deal_id, "sim crm: update for a deal deleted in the same run");
                            continue;
                        }
                        bail!("update targets unknown deal {deal_id}");
                    };
                    deal.data.apply(changes);
                    deal.computed.has_activity |= progressed(&deal.data.stage);
                    self.manager.insert(deal);
                    stats.updated += 1;
                }
                Action::Noop { .. } => {}
            }
        }

        for id in self.manager.take_duplicates_to_delete().into_keys() {
            self.manager.remove(&id);
            if self.deleted.insert(id) {
                stats.deleted += 1;
            }
        }

        Ok(stats)
    }

    #[must_use]
    pub fn snapshot(&self) -> DealSet {
        self.manager
            .deals()
            .map(|d| (d.id.clone(), d.clone()))
            .collect()
    }

    #[must_use]
    pub fn deal_ids(&self) -> BTreeSet<DealId> {
        self.manager.deals().map(|d| d.id.clone()).collect()
    }

    #[must_use]
    pub fn get(&self, id: &DealId) -> Option<&DealData> {
        self.manager.get(id).map(|d| &d.data)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.manager.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manager.is_empty()
    }

    #[must_use]
    pub const fn deleted(&self) -> &BTreeSet<DealId> {
        &self.deleted
    }
}

fn progressed(stage: &DealStage) -> bool {
    !matches!(stage, DealStage::Eval | DealStage::ClosedLost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ScenarioConfig, ScenarioGenerator};
    use mpsync_core::events::classify_all;

    #[test]
    fn first_run_creates_and_second_run_writes_nothing_new() {
        let scenario = ScenarioGenerator::new(ScenarioConfig {
            groups: 5,
            refund_percent: 0,
            duplicate_percent: 0,
            ..ScenarioConfig::default()
        })
        .generate(11);
        let events = classify_all(&scenario.groups);
        let mut crm = SimCrm::new(DealsConfig::default());

        let first = crm.generate(&events);
        let stats = crm.apply(&first).expect("apply");
        assert_eq!(stats.created, first.count_creates());
        assert_eq!(crm.len(), stats.created);

        let second = crm.generate(&events);
        assert_eq!(second.count_creates(), 0);
    }

    #[test]
    fn duplicates_are_deleted_once() {
        let scenario = ScenarioGenerator::new(ScenarioConfig {
            groups: 4,
            duplicate_percent: 100,
            ..ScenarioConfig::default()
        })
        .generate(2);
        let seeded = scenario.seeded_deals.len();
        let mut crm = SimCrm::new(DealsConfig::default());
        crm.seed(scenario.seeded_deals.clone());
        assert_eq!(crm.len(), seeded);

        let events = classify_all(&scenario.groups);
        let outcome = crm.generate(&events);
        let stats = crm.apply(&outcome).expect("apply");
        assert_eq!(stats.deleted, seeded - scenario.groups.len());
        assert_eq!(crm.deleted().len(), stats.deleted);

        let again = crm.generate(&events);
        assert!(again.duplicates.is_empty());
        assert_eq!(crm.apply(&again).expect("apply").deleted, 0);
    }

    #[test]
    fn update_for_unknown_deal_is_rejected() {
        let mut crm = SimCrm::new(DealsConfig::default());
        let scenario = ScenarioGenerator::new(ScenarioConfig::default()).generate(1);
        let mut outcome = GenerationOutcome::default();
        let data = mpsync_core::deals::deal_creation_properties(
            mpsync_core::model::Record::License(&scenario.groups[0].licenses[0]),
            mpsync_core::deals::DealCreation {
                stage: DealStage::Eval,
                addon_license_id: Some("L0".into()),
                transaction_id: None,
            },
            &DealsConfig::default(),
        );
        outcome.actions.push(Action::Update {
            group: scenario.groups[0].clone(),
            deal_id: DealId::new("nope"),
            data: data.clone(),
            changes: data.changes_from(&data),
        });
        assert!(crm.apply(&outcome).is_err());
    }
}
