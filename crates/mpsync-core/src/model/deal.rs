//! CRM deals: identity, editable properties and property-level diffs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ParseEnumError;
use crate::model::record::{Hosting, RecordKey};

/// Stable CRM identifier of an existing deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(String);

impl DealId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deal pipeline stage.
///
/// Only the three stages the engine reasons about are named; any other
/// active pipeline stage is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DealStage {
    Eval,
    ClosedWon,
    ClosedLost,
    Other(String),
}

impl DealStage {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eval => "EVAL",
            Self::ClosedWon => "CLOSED_WON",
            Self::ClosedLost => "CLOSED_LOST",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealStage {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ParseEnumError {
                expected: "deal stage",
                got: s.to_string(),
            }),
            "EVAL" => Ok(Self::Eval),
            "CLOSED_WON" => Ok(Self::ClosedWon),
            "CLOSED_LOST" => Ok(Self::ClosedLost),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

impl From<DealStage> for String {
    fn from(stage: DealStage) -> Self {
        match stage {
            DealStage::Other(s) => s,
            named => named.as_str().to_string(),
        }
    }
}

impl TryFrom<String> for DealStage {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// User-editable deal properties. This is what gets diffed and synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealData {
    pub addon_license_id: Option<String>,
    pub transaction_id: Option<String>,
    pub close_date: NaiveDate,
    pub deployment: Hosting,
    pub app: String,
    pub deal_name: String,
    pub country: String,
    pub origin: String,
    pub pipeline: String,
    pub related_products: Option<String>,
    /// Cents. `None` while the deal is an evaluation.
    pub amount: Option<i64>,
    pub stage: DealStage,
}

/// Flags derived by the CRM. Read-only to the engine and never diffed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealComputed {
    /// The deal has progressed beyond evaluation at least once.
    pub has_activity: bool,
}

/// An existing CRM deal as last synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub data: DealData,
    #[serde(default)]
    pub computed: DealComputed,
}

impl Deal {
    /// Lookup key derived from the deal's own identifier properties.
    #[must_use]
    pub fn key(&self) -> Option<RecordKey> {
        self.data.key()
    }

    #[must_use]
    pub const fn has_activity(&self) -> bool {
        self.computed.has_activity
    }
}

/// One changed deal property with its new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "property", content = "value", rename_all = "snake_case")]
pub enum DealProperty {
    AddonLicenseId(Option<String>),
    TransactionId(Option<String>),
    CloseDate(NaiveDate),
    Deployment(Hosting),
    App(String),
    DealName(String),
    Country(String),
    Origin(String),
    Pipeline(String),
    RelatedProducts(Option<String>),
    Amount(Option<i64>),
    Stage(DealStage),
}

impl DealProperty {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddonLicenseId(_) => "addon_license_id",
            Self::TransactionId(_) => "transaction_id",
            Self::CloseDate(_) => "close_date",
            Self::Deployment(_) => "deployment",
            Self::App(_) => "app",
            Self::DealName(_) => "deal_name",
            Self::Country(_) => "country",
            Self::Origin(_) => "origin",
            Self::Pipeline(_) => "pipeline",
            Self::RelatedProducts(_) => "related_products",
            Self::Amount(_) => "amount",
            Self::Stage(_) => "stage",
        }
    }
}

/// Property-level diff between a synced snapshot and a desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealChanges(Vec<DealProperty>);

impl DealChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DealProperty> {
        self.0.iter()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(DealProperty::name).collect()
    }

    #[must_use]
    pub fn stage(&self) -> Option<&DealStage> {
        self.0.iter().find_map(|p| match p {
            DealProperty::Stage(stage) => Some(stage),
            _ => None,
        })
    }
}

impl DealData {
    #[must_use]
    pub fn key(&self) -> Option<RecordKey> {
        self.addon_license_id.as_ref().map(|id| RecordKey {
            addon_license_id: id.clone(),
            transaction_id: self.transaction_id.clone(),
        })
    }

    /// Properties of `self` that differ from `old`.
    #[must_use]
    pub fn changes_from(&self, old: &Self) -> DealChanges {
        let mut changes = Vec::new();
        if self.addon_license_id != old.addon_license_id {
            changes.push(DealProperty::AddonLicenseId(self.addon_license_id.clone()));
        }
        if self.transaction_id != old.transaction_id {
            changes.push(DealProperty::TransactionId(self.transaction_id.clone()));
        }
        if self.close_date != old.close_date {
            changes.push(DealProperty::CloseDate(self.close_date));
        }
        if self.deployment != old.deployment {
            changes.push(DealProperty::Deployment(self.deployment));
        }
        if self.app != old.app {
            changes.push(DealProperty::App(self.app.clone()));
        }
        if self.deal_name != old.deal_name {
            changes.push(DealProperty::DealName(self.deal_name.clone()));
        }
        if self.country != old.country {
            changes.push(DealProperty::Country(self.country.clone()));
        }
        if self.origin != old.origin {
            changes.push(DealProperty::Origin(self.origin.clone()));
        }
        if self.pipeline != old.pipeline {
            changes.push(DealProperty::Pipeline(self.pipeline.clone()));
        }
        if self.related_products != old.related_products {
            changes.push(DealProperty::RelatedProducts(self.related_products.clone()));
        }
        if self.amount != old.amount {
            changes.push(DealProperty::Amount(self.amount));
        }
        if self.stage != old.stage {
            changes.push(DealProperty::Stage(self.stage.clone()));
        }
        DealChanges(changes)
    }

    /// Write every property in `changes` onto `self`.
    pub fn apply(&mut self, changes: &DealChanges) {
        for change in changes.iter() {
            match change.clone() {
                DealProperty::AddonLicenseId(v) => self.addon_license_id = v,
                DealProperty::TransactionId(v) => self.transaction_id = v,
                DealProperty::CloseDate(v) => self.close_date = v,
                DealProperty::Deployment(v) => self.deployment = v,
                DealProperty::App(v) => self.app = v,
                DealProperty::DealName(v) => self.deal_name = v,
                DealProperty::Country(v) => self.country = v,
                DealProperty::Origin(v) => self.origin = v,
                DealProperty::Pipeline(v) => self.pipeline = v,
                DealProperty::RelatedProducts(v) => self.related_products = v,
                DealProperty::Amount(v) => self.amount = v,
                DealProperty::Stage(v) => self.stage = v,
            }
        }
    }
}
