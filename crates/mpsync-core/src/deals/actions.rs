//! Action generation: turning deal-relevant events into deal mutations.
//!
//! Each event is matched against live CRM deals through the [`DealManager`]
//! and produces zero or more [`Action`]s, in event order.
//!
//! # Per-event policy
//!
//! | Event              | Lookup                     | No match                 | Match                                   |
//! |--------------------|----------------------------|--------------------------|-----------------------------------------|
//! | eval               | licenses                   | create EVAL/CLOSED_LOST  | update; restage only if still EVAL      |
//! | purchase           | transaction + licenses     | create CLOSED_WON        | update; EVAL becomes CLOSED_WON         |
//! | renewal / upgrade  | transaction                | create CLOSED_WON        | update, stage untouched                 |
//! | refund             | refunded transactions      | nothing                  | CLOSED_LOST for every non-lost deal     |
//!
//! # Duplicates
//!
//! When a lookup returns several deals, one is kept and the rest are evicted
//! from the manager and scheduled for remote deletion. Deals with activity
//! are preferred; when more than one has activity the extras cannot be
//! safely discarded, so they are reported as unresolved (and, as before,
//! still scheduled for deletion).
//!
//! # Run state
//!
//! All per-run bookkeeping lives in a `RunContext` created by
//! [`ActionGenerator::generate_from`]. Live deals are never mutated: each
//! touched deal gets a working copy that later events in the same run see,
//! and every update is diffed against the deal's last-synced data.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use crate::config::DealsConfig;
use crate::deals::manager::{DealManager, DealSet, DuplicateMap, record_duplicates};
use crate::deals::records::{DealCreation, apply_record, deal_creation_properties};
use crate::events::{DealRelevantEvent, EventSummary, latest_license};
use crate::model::{
    Deal, DealChanges, DealData, DealId, DealStage, License, Record, RelatedRecordGroup,
    Transaction,
};

/// One mutation for the sync layer to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create {
        group: Arc<RelatedRecordGroup>,
        properties: DealData,
    },
    Update {
        group: Arc<RelatedRecordGroup>,
        deal_id: DealId,
        /// Full desired state after this update.
        data: DealData,
        /// Only the properties that differ from the last-synced data.
        changes: DealChanges,
    },
    Noop {
        group: Arc<RelatedRecordGroup>,
        deal_id: DealId,
    },
}

impl Action {
    #[must_use]
    pub const fn group(&self) -> &Arc<RelatedRecordGroup> {
        match self {
            Self::Create { group, .. } | Self::Update { group, .. } | Self::Noop { group, .. } => {
                group
            }
        }
    }

    #[must_use]
    pub const fn deal_id(&self) -> Option<&DealId> {
        match self {
            Self::Create { .. } => None,
            Self::Update { deal_id, .. } | Self::Noop { deal_id, .. } => Some(deal_id),
        }
    }

    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::Noop { .. })
    }
}

/// Several duplicate deals with activity; only one could be kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedDuplicates {
    pub kept: DealId,
    pub others: Vec<DealId>,
    pub event: EventSummary,
}

/// A deal selected for mutation by two events in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleUpdate {
    pub deal_id: DealId,
    pub first: EventSummary,
    pub second: EventSummary,
}

/// Everything one generation run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub actions: Vec<Action>,
    /// Duplicates evicted during this run → the deal(s) they duplicated.
    pub duplicates: DuplicateMap,
    pub unresolved: Vec<UnresolvedDuplicates>,
    pub double_updates: Vec<DoubleUpdate>,
}

impl GenerationOutcome {
    /// Nothing to write: every action is a no-op and no duplicates were found.
    #[must_use]
    pub fn is_fixpoint(&self) -> bool {
        self.duplicates.is_empty() && self.actions.iter().all(Action::is_noop)
    }

    #[must_use]
    pub fn count_creates(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Create { .. }))
            .count()
    }

    #[must_use]
    pub fn count_updates(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Update { .. }))
            .count()
    }
}

#[derive(Debug, Default)]
struct RunContext {
    /// First event that touched each deal this run.
    handled: HashMap<DealId, EventSummary>,
    /// Working copy of each touched deal.
    pending: HashMap<DealId, DealData>,
    duplicates: DuplicateMap,
    unresolved: Vec<UnresolvedDuplicates>,
    double_updates: Vec<DoubleUpdate>,
}

impl RunContext {
    fn current<'a>(&'a self, deal: &'a Deal) -> &'a DealData {
        self.pending.get(&deal.id).unwrap_or(&deal.data)
    }

    /// Remember the first event per deal; every later collision is logged
    /// and recorded but does not replace it.
    fn record_seen(&mut self, deal: &Deal, event: &DealRelevantEvent) {
        let summary = event.summary();
        if let Some(first) = self.handled.get(&deal.id) {
            error!(
                target: "mpsync::deals",
                deal_id = %deal.id,
                first_event = %first,
                second_event = %summary,
                deal_data = ?self.current(deal),
                "updating deal twice in one run"
            );
            self.double_updates.push(DoubleUpdate {
                deal_id: deal.id.clone(),
                first: first.clone(),
                second: summary,
            });
        } else {
            self.handled.insert(deal.id.clone(), summary);
        }
    }

    fn into_outcome(self, actions: Vec<Action>) -> GenerationOutcome {
        GenerationOutcome {
            actions,
            duplicates: self.duplicates,
            unresolved: self.unresolved,
            double_updates: self.double_updates,
        }
    }
}

pub struct ActionGenerator<'a, M: DealManager + ?Sized> {
    manager: &'a mut M,
    config: &'a DealsConfig,
}

impl<'a, M: DealManager + ?Sized> ActionGenerator<'a, M> {
    pub fn new(manager: &'a mut M, config: &'a DealsConfig) -> Self {
        Self { manager, config }
    }

    /// Produce actions for `events`, preserving event order.
    #[instrument(skip_all, fields(events = events.len()))]
    pub fn generate_from(&mut self, events: &[DealRelevantEvent]) -> GenerationOutcome {
        let mut run = RunContext::default();
        let mut actions = Vec::with_capacity(events.len());
        for event in events {
            actions.extend(self.actions_for(&mut run, event));
        }
        let outcome = run.into_outcome(actions);
        debug!(
            target: "mpsync::deals",
            actions = outcome.actions.len(),
            creates = outcome.count_creates(),
            updates = outcome.count_updates(),
            duplicates = outcome.duplicates.len(),
            "deal generation finished"
        );
        outcome
    }

    fn actions_for(&mut self, run: &mut RunContext, event: &DealRelevantEvent) -> Vec<Action> {
        match event {
            DealRelevantEvent::Eval { licenses, .. } => {
                self.action_for_eval(run, event, licenses).into_iter().collect()
            }
            DealRelevantEvent::Purchase {
                licenses,
                transaction,
                ..
            } => self
                .action_for_purchase(run, event, licenses, transaction.as_ref())
                .into_iter()
                .collect(),
            DealRelevantEvent::Renewal { transaction, .. }
            | DealRelevantEvent::Upgrade { transaction, .. } => {
                vec![self.action_for_renewal(run, event, transaction)]
            }
            DealRelevantEvent::Refund { refunded, .. } => {
                self.actions_for_refund(run, event, refunded)
            }
        }
    }

    fn action_for_eval(
        &mut self,
        run: &mut RunContext,
        event: &DealRelevantEvent,
        licenses: &[License],
    ) -> Option<Action> {
        let latest = latest_license(licenses)?;
        let stage = if licenses.iter().any(License::is_active) {
            DealStage::Eval
        } else {
            DealStage::ClosedLost
        };

        let records: Vec<Record<'_>> = licenses.iter().map(Record::License).collect();
        let found = self.manager.deals_for_records(&records);
        let Some(deal) = self.single_deal(run, event, found) else {
            return Some(Action::Create {
                group: Arc::clone(event.group()),
                properties: deal_creation_properties(
                    Record::License(latest),
                    DealCreation {
                        stage,
                        addon_license_id: Some(latest.addon_license_id.clone()),
                        transaction_id: None,
                    },
                    self.config,
                ),
            });
        };

        run.record_seen(&deal, event);
        let restage = (run.current(&deal).stage == DealStage::Eval).then_some(stage);
        Some(self.make_update_action(run, event, &deal, Some(Record::License(latest)), restage))
    }

    fn action_for_purchase(
        &mut self,
        run: &mut RunContext,
        event: &DealRelevantEvent,
        licenses: &[License],
        transaction: Option<&Transaction>,
    ) -> Option<Action> {
        let records: Vec<Record<'_>> = transaction
            .into_iter()
            .map(Record::Transaction)
            .chain(licenses.iter().map(Record::License))
            .collect();
        let found = self.manager.deals_for_records(&records);
        let record = transaction
            .map(Record::Transaction)
            .or_else(|| latest_license(licenses).map(Record::License))?;

        let Some(deal) = self.single_deal(run, event, found) else {
            return Some(Action::Create {
                group: Arc::clone(event.group()),
                properties: deal_creation_properties(
                    record,
                    DealCreation {
                        stage: DealStage::ClosedWon,
                        addon_license_id: Some(record.addon_license_id().to_string()),
                        transaction_id: record.transaction_id().map(str::to_string),
                    },
                    self.config,
                ),
            });
        };

        run.record_seen(&deal, event);
        let restage =
            (run.current(&deal).stage == DealStage::Eval).then_some(DealStage::ClosedWon);
        Some(self.make_update_action(run, event, &deal, Some(record), restage))
    }

    fn action_for_renewal(
        &mut self,
        run: &mut RunContext,
        event: &DealRelevantEvent,
        transaction: &Transaction,
    ) -> Action {
        let record = Record::Transaction(transaction);
        let found = self.manager.deals_for_records(&[record]);
        let Some(deal) = self.single_deal(run, event, found) else {
            return Action::Create {
                group: Arc::clone(event.group()),
                properties: deal_creation_properties(
                    record,
                    DealCreation {
                        stage: DealStage::ClosedWon,
                        addon_license_id: Some(transaction.addon_license_id.clone()),
                        transaction_id: Some(transaction.transaction_id.clone()),
                    },
                    self.config,
                ),
            };
        };

        run.record_seen(&deal, event);
        self.make_update_action(run, event, &deal, Some(record), None)
    }

    fn actions_for_refund(
        &mut self,
        run: &mut RunContext,
        event: &DealRelevantEvent,
        refunded: &[Transaction],
    ) -> Vec<Action> {
        let records: Vec<Record<'_>> = refunded.iter().map(Record::Transaction).collect();
        let found = self.manager.deals_for_records(&records);
        for deal in found.values() {
            run.record_seen(deal, event);
        }

        let open: Vec<&Deal> = found
            .values()
            .filter(|deal| run.current(deal).stage != DealStage::ClosedLost)
            .collect();
        open.into_iter()
            .map(|deal| {
                self.make_update_action(run, event, deal, None, Some(DealStage::ClosedLost))
            })
            .collect()
    }

    /// Pick the one deal an event should act on, evicting duplicates.
    fn single_deal(
        &mut self,
        run: &mut RunContext,
        event: &DealRelevantEvent,
        found: DealSet,
    ) -> Option<Deal> {
        if found.len() <= 1 {
            return found.into_values().next();
        }

        let (active, inactive): (Vec<Deal>, Vec<Deal>) =
            found.into_values().partition(Deal::has_activity);

        let (kept, rest) = match active.len() {
            0 => split_first(inactive)?,
            1 => {
                let (kept, _) = split_first(active)?;
                (kept, inactive)
            }
            _ => {
                let (kept, others) = split_first(active)?;
                let others_ids: Vec<DealId> = others.iter().map(|d| d.id.clone()).collect();
                error!(
                    target: "mpsync::deals",
                    kept = %kept.id,
                    others = ?others_ids,
                    event = %event.summary(),
                    "found duplicate deals with activity that cannot be auto-resolved"
                );
                run.unresolved.push(UnresolvedDuplicates {
                    kept: kept.id.clone(),
                    others: others_ids,
                    event: event.summary(),
                });
                let mut rest = others;
                rest.extend(inactive);
                (kept, rest)
            }
        };

        let to_delete: BTreeSet<DealId> = rest.into_iter().map(|d| d.id).collect();
        warn!(
            target: "mpsync::deals",
            kept = %kept.id,
            deleting = ?to_delete,
            event = %event.summary(),
            "removing duplicate deals"
        );
        self.manager.remove_locally(&to_delete);
        record_duplicates(self.manager.duplicates_to_delete_mut(), &kept.id, &to_delete);
        record_duplicates(&mut run.duplicates, &kept.id, &to_delete);

        Some(kept)
    }

    /// Apply `stage` then `record` to the deal's working copy and diff the
    /// result against its last-synced data.
    fn make_update_action(
        &self,
        run: &mut RunContext,
        event: &DealRelevantEvent,
        deal: &Deal,
        record: Option<Record<'_>>,
        stage: Option<DealStage>,
    ) -> Action {
        let mut data = run.current(deal).clone();
        if let Some(stage) = stage {
            data.stage = stage;
        }
        if let Some(record) = record {
            apply_record(&mut data, record, self.config);
        }

        let changes = data.changes_from(&deal.data);
        run.pending.insert(deal.id.clone(), data.clone());

        let group = Arc::clone(event.group());
        if changes.is_empty() {
            debug!(target: "mpsync::deals", deal_id = %deal.id, event = %event.kind(), "no changes");
            Action::Noop {
                group,
                deal_id: deal.id.clone(),
            }
        } else {
            debug!(
                target: "mpsync::deals",
                deal_id = %deal.id,
                event = %event.kind(),
                changed = ?changes.names(),
                "updating deal"
            );
            Action::Update {
                group,
                deal_id: deal.id.clone(),
                data,
                changes,
            }
        }
    }
}

fn split_first(deals: Vec<Deal>) -> Option<(Deal, Vec<Deal>)> {
    let mut iter = deals.into_iter();
    let first = iter.next()?;
    Some((first, iter.collect()))
}
