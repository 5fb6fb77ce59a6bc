use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::Result;
use mpsync_core::config::PartnerDomains;
use mpsync_core::contacts::{ContactInput, generate_contacts};
use mpsync_core::deals::{Action, GenerationOutcome};
use mpsync_core::events::classify_all;
use mpsync_core::model::{DealId, RecordKey};
use serde::Serialize;
use tracing::{debug, info};

use crate::crm::{ApplyStats, SimCrm};
use crate::scenario::{PARTNER_DOMAIN, Scenario};

// ── Result types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OracleResult {
    pub passed: bool,
    pub violations: Vec<InvariantViolation>,
    /// Run index (zero-based) whose outcome was the first fixpoint.
    pub fixpoint_run: Option<usize>,
    pub runs: Vec<RunTrace>,
}

impl OracleResult {
    fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
            fixpoint_run: None,
            runs: Vec::new(),
        }
    }

    fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
            ..Self::pass()
        }
    }

    #[must_use]
    fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self.fixpoint_run = self.fixpoint_run.or(other.fixpoint_run);
        self.runs.extend(other.runs);
        self
    }
}

/// What one engine run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunTrace {
    pub run: usize,
    pub creates: usize,
    pub updates: usize,
    pub noops: usize,
    pub duplicates: usize,
    pub unresolved: usize,
    pub double_updates: usize,
    pub applied: ApplyStats,
}

impl RunTrace {
    fn new(run: usize, outcome: &GenerationOutcome, applied: ApplyStats) -> Self {
        Self {
            run,
            creates: outcome.count_creates(),
            updates: outcome.count_updates(),
            noops: outcome.actions.iter().filter(|a| a.is_noop()).count(),
            duplicates: outcome.duplicates.len(),
            unresolved: outcome.unresolved.len(),
            double_updates: outcome.double_updates.len(),
            applied,
        }
    }
}

// ── Violations ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Every run still had writes to make.
    NoFixpoint { runs: usize, last: Vec<String> },

    /// A fixpoint run, re-run, changed something.
    UnstableFixpoint { changed: Vec<DealId> },

    /// An update or no-op named a deal the CRM did not have when the run
    /// started.
    UnknownTarget { run: usize, deal_id: DealId },

    /// An update carried no changed properties.
    EmptyUpdate { run: usize, deal_id: DealId },

    /// Several live deals share a key after convergence.
    SharedKey { key: RecordKey, deals: Vec<DealId> },

    /// Contact reconciliation failed.
    Contacts { error: String },

    /// Contact reconciliation produced one email twice.
    DuplicateContact { email: String },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFixpoint { runs, last } => {
                write!(f, "NoFixpoint: still writing after {runs} runs ({last:?})")
            }
            Self::UnstableFixpoint { changed } => {
                write!(f, "UnstableFixpoint: re-run changed {changed:?}")
            }
            Self::UnknownTarget { run, deal_id } => {
                write!(f, "UnknownTarget: run {run} acted on unknown deal {deal_id}")
            }
            Self::EmptyUpdate { run, deal_id } => {
                write!(f, "EmptyUpdate: run {run} updated {deal_id} with no changes")
            }
            Self::SharedKey { key, deals } => write!(
                f,
                "SharedKey: {}/{} held by {deals:?}",
                key.addon_license_id,
                key.transaction_id.as_deref().unwrap_or("-")
            ),
            Self::Contacts { error } => write!(f, "Contacts: {error}"),
            Self::DuplicateContact { email } => {
                write!(f, "DuplicateContact: {email} emitted more than once")
            }
        }
    }
}

// ── Oracle ────────────────────────────────────────────────────────────────────

/// Drives the engine to a fixpoint against a [`SimCrm`] and checks what it
/// did along the way.
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceOracle {
    max_runs: usize,
}

impl ConvergenceOracle {
    #[must_use]
    pub const fn new(max_runs: usize) -> Self {
        Self { max_runs }
    }

    /// Run every check for `scenario`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CRM rejects an outcome.
    pub fn check_all(&self, scenario: &Scenario, crm: &mut SimCrm) -> Result<OracleResult> {
        let deals = self.check_convergence(scenario, crm)?;
        let keys = if deals.fixpoint_run.is_some() {
            Self::check_shared_keys(crm)
        } else {
            OracleResult::pass()
        };
        Ok(deals.merge(keys).merge(Self::check_contacts(scenario)))
    }

    /// Run classify → generate → apply until an outcome has nothing to write,
    /// then once more to confirm it stays that way.
    ///
    /// # Errors
    ///
    /// Returns an error if the CRM rejects an outcome.
    pub fn check_convergence(&self, scenario: &Scenario, crm: &mut SimCrm) -> Result<OracleResult> {
        let events = classify_all(&scenario.groups);
        let mut result = OracleResult::pass();
        let mut last = Vec::new();

        for run in 0..self.max_runs {
            let before = crm.deal_ids();
            let outcome = crm.generate(&events);
            result = result.merge(Self::check_targets(run, &before, &outcome));
            result = result.merge(Self::check_diffs(run, &outcome));

            let applied = crm.apply(&outcome)?;
            result.runs.push(RunTrace::new(run, &outcome, applied));
            debug!(seed = scenario.seed, run, ?applied, "sim run applied");

            if outcome.is_fixpoint() {
                result.fixpoint_run = Some(run);
                let snapshot = crm.snapshot();
                let again = crm.generate(&events);
                crm.apply(&again)?;
                let after = crm.snapshot();
                if !again.is_fixpoint() || after != snapshot {
                    let changed = again
                        .actions
                        .iter()
                        .filter(|a| !a.is_noop())
                        .filter_map(Action::deal_id)
                        .cloned()
                        .chain(again.duplicates.keys().cloned())
                        .collect();
                    result = result.merge(OracleResult::from_violations(vec![
                        InvariantViolation::UnstableFixpoint { changed },
                    ]));
                }
                info!(seed = scenario.seed, runs = run + 1, "converged");
                return Ok(result);
            }
            last = describe_writes(&outcome);
        }

        Ok(result.merge(OracleResult::from_violations(vec![InvariantViolation::NoFixpoint {
            runs: self.max_runs,
            last,
        }])))
    }

    /// Every update and no-op targets a deal that existed at run start.
    #[must_use]
    pub fn check_targets(
        run: usize,
        existing: &BTreeSet<DealId>,
        outcome: &GenerationOutcome,
    ) -> OracleResult {
        let violations = outcome
            .actions
            .iter()
            .filter_map(Action::deal_id)
            .filter(|id| !existing.contains(*id))
            .map(|id| InvariantViolation::UnknownTarget {
                run,
                deal_id: id.clone(),
            })
            .collect();
        OracleResult::from_violations(violations)
    }

    /// No update is empty.
    #[must_use]
    pub fn check_diffs(run: usize, outcome: &GenerationOutcome) -> OracleResult {
        let violations = outcome
            .actions
            .iter()
            .filter_map(|action| match action {
                Action::Update {
                    deal_id, changes, ..
                } if changes.is_empty() => Some(InvariantViolation::EmptyUpdate {
                    run,
                    deal_id: deal_id.clone(),
                }),
                _ => None,
            })
            .collect();
        OracleResult::from_violations(violations)
    }

    /// No two live deals share a key.
    #[must_use]
    pub fn check_shared_keys(crm: &SimCrm) -> OracleResult {
        let mut by_key: BTreeMap<RecordKey, Vec<DealId>> = BTreeMap::new();
        for (id, deal) in crm.snapshot() {
            if let Some(key) = deal.key() {
                by_key.entry(key).or_default().push(id);
            }
        }
        let violations = by_key
            .into_iter()
            .filter(|(_, deals)| deals.len() > 1)
            .map(|(key, deals)| InvariantViolation::SharedKey { key, deals })
            .collect();
        OracleResult::from_violations(violations)
    }

    /// Contacts reconcile without error and each email appears once.
    #[must_use]
    pub fn check_contacts(scenario: &Scenario) -> OracleResult {
        let licenses: Vec<_> = scenario.licenses().cloned().collect();
        let transactions: Vec<_> = scenario.transactions().cloned().collect();
        let partner_domains = PartnerDomains::new([PARTNER_DOMAIN]);
        let input = ContactInput {
            licenses: &licenses,
            transactions: &transactions,
            initial_contacts: &scenario.initial_contacts,
            partner_domains: &partner_domains,
        };

        match generate_contacts(&input) {
            Ok(contacts) => {
                let mut seen = BTreeSet::new();
                let violations = contacts
                    .into_iter()
                    .filter(|c| !seen.insert(c.email.clone()))
                    .map(|c| InvariantViolation::DuplicateContact { email: c.email })
                    .collect();
                OracleResult::from_violations(violations)
            }
            Err(error) => OracleResult::from_violations(vec![InvariantViolation::Contacts {
                error: format!("{} {error}", error.code()),
            }]),
        }
    }
}

fn describe_writes(outcome: &GenerationOutcome) -> Vec<String> {
    outcome
        .actions
        .iter()
        .filter(|a| !a.is_noop())
        .map(|action| match action {
            Action::Create { properties, .. } => format!(
                "create {}/{}",
                properties.addon_license_id.as_deref().unwrap_or("-"),
                properties.transaction_id.as_deref().unwrap_or("-")
            ),
            Action::Update {
                deal_id, changes, ..
            } => format!("update {deal_id} {:?}", changes.names()),
            Action::Noop { deal_id, .. } => format!("noop {deal_id}"),
        })
        .chain(outcome.duplicates.keys().map(|id| format!("delete {id}")))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
