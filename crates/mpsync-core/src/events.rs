//! Deal-relevant events derived from a group's record history.
//!
//! A group's licenses and transactions are merged into one chronological
//! stream and each record is classified:
//!
//! | Record                                   | Event      |
//! |------------------------------------------|------------|
//! | evaluation / open-source license         | `eval`     |
//! | paid license with no transactions        | `purchase` |
//! | paid license with transactions           | (none)     |
//! | transaction `New`                        | `purchase` |
//! | transaction `Renewal`                    | `renewal`  |
//! | transaction `Upgrade`                    | `upgrade`  |
//! | transaction `Refund`                     | `refund`   |
//!
//! The raw sequence is then normalized: adjacent evals collapse into one, an
//! eval directly followed by a purchase is folded into that purchase (a
//! converted trial updates its own deal), and adjacent refunds collapse.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::model::{License, Record, RelatedRecordGroup, SaleType, Transaction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DealRelevantEvent {
    Eval {
        group: Arc<RelatedRecordGroup>,
        licenses: Vec<License>,
    },
    Purchase {
        group: Arc<RelatedRecordGroup>,
        licenses: Vec<License>,
        transaction: Option<Transaction>,
    },
    Renewal {
        group: Arc<RelatedRecordGroup>,
        transaction: Transaction,
    },
    Upgrade {
        group: Arc<RelatedRecordGroup>,
        transaction: Transaction,
    },
    Refund {
        group: Arc<RelatedRecordGroup>,
        refunded: Vec<Transaction>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Eval,
    Purchase,
    Renewal,
    Upgrade,
    Refund,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eval => "eval",
            Self::Purchase => "purchase",
            Self::Renewal => "renewal",
            Self::Upgrade => "upgrade",
            Self::Refund => "refund",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Abbreviated event details for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub kind: EventKind,
    pub licenses: Vec<String>,
    pub transactions: Vec<String>,
}

impl fmt::Display for EventSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} licenses=[{}] transactions=[{}]",
            self.kind,
            self.licenses.join(","),
            self.transactions.join(",")
        )
    }
}

impl DealRelevantEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Eval { .. } => EventKind::Eval,
            Self::Purchase { .. } => EventKind::Purchase,
            Self::Renewal { .. } => EventKind::Renewal,
            Self::Upgrade { .. } => EventKind::Upgrade,
            Self::Refund { .. } => EventKind::Refund,
        }
    }

    #[must_use]
    pub const fn group(&self) -> &Arc<RelatedRecordGroup> {
        match self {
            Self::Eval { group, .. }
            | Self::Purchase { group, .. }
            | Self::Renewal { group, .. }
            | Self::Upgrade { group, .. }
            | Self::Refund { group, .. } => group,
        }
    }

    /// Every record this event carries, licenses first.
    #[must_use]
    pub fn records(&self) -> Vec<Record<'_>> {
        match self {
            Self::Eval { licenses, .. } => licenses.iter().map(Record::License).collect(),
            Self::Purchase {
                licenses,
                transaction,
                ..
            } => licenses
                .iter()
                .map(Record::License)
                .chain(transaction.iter().map(Record::Transaction))
                .collect(),
            Self::Renewal { transaction, .. } | Self::Upgrade { transaction, .. } => {
                vec![Record::Transaction(transaction)]
            }
            Self::Refund { refunded, .. } => refunded.iter().map(Record::Transaction).collect(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> EventSummary {
        let mut licenses = Vec::new();
        let mut transactions = Vec::new();
        for record in self.records() {
            match record {
                Record::License(l) => licenses.push(l.addon_license_id.clone()),
                Record::Transaction(t) => transactions.push(t.transaction_id.clone()),
            }
        }
        EventSummary {
            kind: self.kind(),
            licenses,
            transactions,
        }
    }
}

/// The most recent license by maintenance start date; the first one wins ties.
#[must_use]
pub fn latest_license(licenses: &[License]) -> Option<&License> {
    licenses
        .iter()
        .min_by_key(|l| std::cmp::Reverse(l.maintenance_start_date))
}

/// Classify one group's history into ordered events.
#[must_use]
pub fn classify(group: &Arc<RelatedRecordGroup>) -> Vec<DealRelevantEvent> {
    let mut records: Vec<Record<'_>> = group
        .licenses
        .iter()
        .map(Record::License)
        .chain(group.transactions.iter().map(Record::Transaction))
        .collect();
    // Stable: licenses precede transactions on the same date.
    records.sort_by_key(|r| (r.date(), matches!(r, Record::Transaction(_))));

    let raw = records
        .into_iter()
        .filter_map(|record| classify_record(group, record))
        .collect();
    normalize(raw)
}

/// Classify many groups, concatenating their events in group order.
#[must_use]
pub fn classify_all(groups: &[Arc<RelatedRecordGroup>]) -> Vec<DealRelevantEvent> {
    groups.iter().flat_map(classify).collect()
}

fn classify_record(
    group: &Arc<RelatedRecordGroup>,
    record: Record<'_>,
) -> Option<DealRelevantEvent> {
    let group = Arc::clone(group);
    match record {
        Record::License(license) if license.license_type.is_evaluation_like() => {
            Some(DealRelevantEvent::Eval {
                group,
                licenses: vec![license.clone()],
            })
        }
        Record::License(license) => {
            let has_transactions = group
                .transactions
                .iter()
                .any(|t| t.addon_license_id == license.addon_license_id);
            (!has_transactions).then(|| DealRelevantEvent::Purchase {
                group,
                licenses: vec![license.clone()],
                transaction: None,
            })
        }
        Record::Transaction(tx) => Some(match tx.sale_type {
            SaleType::New => {
                let licenses = group
                    .licenses
                    .iter()
                    .filter(|l| l.addon_license_id == tx.addon_license_id)
                    .cloned()
                    .collect();
                DealRelevantEvent::Purchase {
                    group,
                    licenses,
                    transaction: Some(tx.clone()),
                }
            }
            SaleType::Renewal => DealRelevantEvent::Renewal {
                group,
                transaction: tx.clone(),
            },
            SaleType::Upgrade => DealRelevantEvent::Upgrade {
                group,
                transaction: tx.clone(),
            },
            SaleType::Refund => DealRelevantEvent::Refund {
                group,
                refunded: vec![tx.clone()],
            },
        }),
    }
}

fn normalize(events: Vec<DealRelevantEvent>) -> Vec<DealRelevantEvent> {
    let mut out: Vec<DealRelevantEvent> = Vec::with_capacity(events.len());
    for event in events {
        let event = match out.last_mut() {
            Some(last) => match absorb(last, event) {
                Some(rest) => rest,
                None => continue,
            },
            None => event,
        };
        out.push(event);
    }
    out
}

/// Fold `next` into `last` when they belong together. Returns `next` back
/// when it must stand as its own event.
fn absorb(last: &mut DealRelevantEvent, next: DealRelevantEvent) -> Option<DealRelevantEvent> {
    match (&mut *last, next) {
        (
            DealRelevantEvent::Eval { licenses, .. },
            DealRelevantEvent::Eval {
                licenses: more, ..
            },
        ) => {
            licenses.extend(more);
            None
        }
        (
            DealRelevantEvent::Refund { refunded, .. },
            DealRelevantEvent::Refund { refunded: more, .. },
        ) => {
            refunded.extend(more);
            None
        }
        (
            DealRelevantEvent::Eval {
                licenses: evals, ..
            },
            DealRelevantEvent::Purchase {
                group,
                mut licenses,
                transaction,
            },
        ) => {
            licenses.append(evals);
            *last = DealRelevantEvent::Purchase {
                group,
                licenses,
                transaction,
            };
            None
        }
        (_, next) => Some(next),
    }
}
