//! Deal lookup by record identifiers.
//!
//! The action generator only needs three things from the CRM side: find the
//! deals a set of records points at, evict deals it has decided are
//! duplicates, and remember which deals to delete remotely. [`DealManager`]
//! is that seam; [`InMemoryDealManager`] is the implementation used by the
//! simulator and tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{Deal, DealId, Record, RecordKey};

/// Deals keyed by id, so a deal reached through two keys appears once.
pub type DealSet = BTreeMap<DealId, Deal>;

/// Deleted duplicate → the kept deal(s) it duplicated.
pub type DuplicateMap = BTreeMap<DealId, BTreeSet<DealId>>;

/// Record duplicate links, accumulating across calls.
pub fn record_duplicates<'a>(
    map: &mut DuplicateMap,
    kept: &DealId,
    deleted: impl IntoIterator<Item = &'a DealId>,
) {
    for id in deleted {
        map.entry(id.clone()).or_default().insert(kept.clone());
    }
}

pub trait DealManager {
    /// All live deals whose key matches any of `records`.
    fn deals_for_records(&self, records: &[Record<'_>]) -> DealSet;

    /// Evict deals from the live set without deleting them remotely.
    fn remove_locally(&mut self, ids: &BTreeSet<DealId>);

    fn duplicates_to_delete(&self) -> &DuplicateMap;

    fn duplicates_to_delete_mut(&mut self) -> &mut DuplicateMap;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDealManager {
    deals: BTreeMap<DealId, Deal>,
    index: HashMap<RecordKey, BTreeSet<DealId>>,
    duplicates: DuplicateMap,
}

impl InMemoryDealManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_deals(deals: impl IntoIterator<Item = Deal>) -> Self {
        let mut manager = Self::new();
        for deal in deals {
            manager.insert(deal);
        }
        manager
    }

    /// Insert or replace a deal, re-indexing its key.
    pub fn insert(&mut self, deal: Deal) {
        self.unindex(&deal.id);
        if let Some(key) = deal.key() {
            self.index.entry(key).or_default().insert(deal.id.clone());
        }
        self.deals.insert(deal.id.clone(), deal);
    }

    pub fn remove(&mut self, id: &DealId) -> Option<Deal> {
        self.unindex(id);
        self.deals.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &DealId) -> Option<&Deal> {
        self.deals.get(id)
    }

    pub fn deals(&self) -> impl Iterator<Item = &Deal> {
        self.deals.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    /// Hand the pending remote deletions to the caller and reset the map.
    pub fn take_duplicates_to_delete(&mut self) -> DuplicateMap {
        std::mem::take(&mut self.duplicates)
    }

    fn unindex(&mut self, id: &DealId) {
        let Some(key) = self.deals.get(id).and_then(Deal::key) else {
            return;
        };
        if let Some(ids) = self.index.get_mut(&key) {
            ids.remove(id);
            if ids.is_empty() {
                self.index.remove(&key);
            }
        }
    }
}

impl DealManager for InMemoryDealManager {
    fn deals_for_records(&self, records: &[Record<'_>]) -> DealSet {
        records
            .iter()
            .filter_map(|record| self.index.get(&record.key()))
            .flatten()
            .filter_map(|id| self.deals.get(id))
            .map(|deal| (deal.id.clone(), deal.clone()))
            .collect()
    }

    fn remove_locally(&mut self, ids: &BTreeSet<DealId>) {
        for id in ids {
            self.remove(id);
        }
    }

    fn duplicates_to_delete(&self) -> &DuplicateMap {
        &self.duplicates
    }

    fn duplicates_to_delete_mut(&mut self) -> &mut DuplicateMap {
        &mut self.duplicates
    }
}
