//! Mapping source records onto deal properties.

use crate::config::DealsConfig;
use crate::model::{DealData, DealStage, Record};

/// Identity and stage for a deal about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealCreation {
    pub stage: DealStage,
    pub addon_license_id: Option<String>,
    pub transaction_id: Option<String>,
}

/// Full property set for a new deal built from `record`.
///
/// Deterministic: the same record, creation parameters and config always
/// produce the same properties.
#[must_use]
pub fn deal_creation_properties(
    record: Record<'_>,
    creation: DealCreation,
    config: &DealsConfig,
) -> DealData {
    let details = record.contact_details();
    DealData {
        addon_license_id: creation.addon_license_id,
        transaction_id: creation.transaction_id,
        close_date: record.date(),
        deployment: record.hosting(),
        app: record.addon_key().to_string(),
        deal_name: config.deal_name(record.addon_name(), &details.company),
        country: details.country.clone(),
        origin: config.origin.clone(),
        pipeline: config.pipeline.clone(),
        related_products: config.related_products.clone(),
        amount: amount_for(&creation.stage, record),
        stage: creation.stage,
    }
}

/// Rewrite the editable properties of `data` from `record`.
///
/// The stage is left alone; callers set it first so the amount reflects the
/// stage the deal is moving to. A license never clears a transaction id.
pub fn apply_record(data: &mut DealData, record: Record<'_>, config: &DealsConfig) {
    let details = record.contact_details();
    data.addon_license_id = Some(record.addon_license_id().to_string());
    if let Some(transaction_id) = record.transaction_id() {
        data.transaction_id = Some(transaction_id.to_string());
    }
    data.close_date = record.date();
    data.deployment = record.hosting();
    data.app = record.addon_key().to_string();
    data.deal_name = config.deal_name(record.addon_name(), &details.company);
    data.country.clone_from(&details.country);
    data.amount = amount_for(&data.stage, record);
}

fn amount_for(stage: &DealStage, record: Record<'_>) -> Option<i64> {
    match stage {
        DealStage::Eval => None,
        _ => Some(record.amount()),
    }
}
