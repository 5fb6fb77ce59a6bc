//! Seeded marketplace histories.
//!
//! Every group is one customer's history with one app: an optional trial,
//! an optional conversion (paid or free), renewals, the odd upgrade and the
//! odd refund. Some groups also start with duplicate deals already sitting
//! in the CRM, the way a half-finished earlier sync would leave them.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use mpsync_core::model::{
    ContactDetails, ContactInfo, Deal, DealComputed, DealData, DealId, DealStage, Hosting,
    InitialContact, License, LicenseStatus, LicenseType, RelatedRecordGroup, SaleType,
    Transaction,
};
use serde::{Deserialize, Serialize};

use crate::rng::DeterministicRng;

const PEOPLE: [(&str, &str); 6] = [
    ("jo", "jo smith"),
    ("sam", "sam o.neil"),
    ("kim", "kim"),
    ("alex", "alex van der berg"),
    ("ria", "ria jon.io"),
    ("billing", ""),
];
const COMPANIES: [&str; 4] = ["acme", "globex", "initech", "resellerco"];
const COUNTRIES: [(&str, &str); 3] = [("Germany", "EMEA"), ("Japan", "APAC"), ("Brazil", "Americas")];
const APPS: [(&str, &str); 2] = [
    ("com.example.diagrams", "Diagrams"),
    ("com.example.timesheets", "Timesheets"),
];
const HOSTINGS: [Hosting; 3] = [Hosting::Server, Hosting::Cloud, Hosting::DataCenter];

/// The partner domain every generated reseller contact uses.
pub const PARTNER_DOMAIN: &str = "resellerco.example";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub groups: usize,
    pub trial_percent: u8,
    pub active_trial_percent: u8,
    pub conversion_percent: u8,
    /// Share of conversions that come with a sale transaction.
    pub paid_conversion_percent: u8,
    pub max_renewals: u64,
    pub upgrade_percent: u8,
    pub refund_percent: u8,
    /// Share of groups that start with duplicate deals in the CRM.
    pub duplicate_percent: u8,
    /// Share of groups whose technical contact also has a known alias.
    pub alias_percent: u8,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            groups: 12,
            trial_percent: 70,
            active_trial_percent: 50,
            conversion_percent: 60,
            paid_conversion_percent: 85,
            max_renewals: 2,
            upgrade_percent: 20,
            refund_percent: 15,
            duplicate_percent: 15,
            alias_percent: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub seed: u64,
    pub groups: Vec<Arc<RelatedRecordGroup>>,
    /// Deals present in the CRM before the first run.
    pub seeded_deals: Vec<Deal>,
    pub initial_contacts: Vec<InitialContact>,
}

impl Scenario {
    pub fn licenses(&self) -> impl Iterator<Item = &License> {
        self.groups.iter().flat_map(|g| g.licenses.iter())
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.groups.iter().flat_map(|g| g.transactions.iter())
    }
}

pub struct ScenarioGenerator {
    config: ScenarioConfig,
}

impl ScenarioGenerator {
    #[must_use]
    pub const fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn generate(&self, seed: u64) -> Scenario {
        let mut rng = DeterministicRng::new(seed);
        let mut scenario = Scenario {
            seed,
            groups: Vec::with_capacity(self.config.groups),
            seeded_deals: Vec::new(),
            initial_contacts: Vec::new(),
        };

        for index in 0..self.config.groups {
            let history = self.history(&mut rng, index);
            if rng.hit_rate_percent(self.config.duplicate_percent) {
                scenario
                    .seeded_deals
                    .extend(seeded_duplicates(&mut rng, index, &history));
            }
            if rng.hit_rate_percent(self.config.alias_percent) {
                let email = history.details.technical_contact.email.trim().to_lowercase();
                scenario.initial_contacts.push(InitialContact {
                    other_emails: vec![format!("old.{email}")],
                    email,
                });
            }
            scenario.groups.push(Arc::new(RelatedRecordGroup {
                licenses: history.licenses,
                transactions: history.transactions,
            }));
        }
        scenario
    }

    fn history(&self, rng: &mut DeterministicRng, index: usize) -> History {
        let cfg = &self.config;
        let license_id = format!("L{index}");
        let details = contact_details(rng);
        let (addon_key, addon_name) = APPS[rng.index(APPS.len())];
        let hosting = HOSTINGS[rng.index(HOSTINGS.len())];
        let base = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default();
        let start = base + Days::new(rng.between(0, 600));

        let license = |license_type, status, date: NaiveDate| License {
            addon_license_id: license_id.clone(),
            license_id: Some(format!("SEN-{index}")),
            addon_key: addon_key.to_string(),
            addon_name: addon_name.to_string(),
            hosting,
            license_type,
            status,
            tier: Some(10),
            maintenance_start_date: date,
            maintenance_end_date: Some(date + Days::new(30)),
            last_updated: date,
            contact_details: details.clone(),
        };
        let sale = |n: usize, sale_type, date, vendor_amount| Transaction {
            transaction_id: format!("AT-{index}-{n}"),
            addon_license_id: license_id.clone(),
            addon_key: addon_key.to_string(),
            addon_name: addon_name.to_string(),
            hosting,
            sale_type,
            sale_date: date,
            vendor_amount,
            tier: Some(10),
            contact_details: details.clone(),
        };

        let mut licenses = Vec::new();
        let mut transactions = Vec::new();

        let trial = rng.hit_rate_percent(cfg.trial_percent);
        if trial {
            let status = if rng.hit_rate_percent(cfg.active_trial_percent) {
                LicenseStatus::Active
            } else {
                LicenseStatus::Inactive
            };
            licenses.push(license(LicenseType::Evaluation, status, start));
        }

        // Groups without a trial always convert, so none are empty.
        if !trial || rng.hit_rate_percent(cfg.conversion_percent) {
            let bought = start + Days::new(rng.between(1, 40));
            licenses.push(license(LicenseType::Commercial, LicenseStatus::Active, bought));

            if rng.hit_rate_percent(cfg.paid_conversion_percent) {
                let price = amount(rng);
                transactions.push(sale(0, SaleType::New, bought, price));
                for year in 1..=rng.between(0, cfg.max_renewals) {
                    let n = transactions.len();
                    let date = bought + Days::new(365 * year);
                    transactions.push(sale(n, SaleType::Renewal, date, amount(rng)));
                }
                if rng.hit_rate_percent(cfg.upgrade_percent) {
                    let n = transactions.len();
                    let date = bought + Days::new(rng.between(60, 300));
                    transactions.push(sale(n, SaleType::Upgrade, date, amount(rng)));
                }
                if rng.hit_rate_percent(cfg.refund_percent) {
                    let refunded = transactions[rng.index(transactions.len())].clone();
                    transactions.push(Transaction {
                        sale_type: SaleType::Refund,
                        sale_date: refunded.sale_date + Days::new(20),
                        vendor_amount: -refunded.vendor_amount,
                        ..refunded
                    });
                }
            }
        }

        History {
            license_id,
            details,
            licenses,
            transactions,
        }
    }
}

struct History {
    license_id: String,
    details: ContactDetails,
    licenses: Vec<License>,
    transactions: Vec<Transaction>,
}

fn amount(rng: &mut DeterministicRng) -> i64 {
    i64::try_from(rng.between(1_000, 250_000)).unwrap_or(1_000)
}

fn contact_details(rng: &mut DeterministicRng) -> ContactDetails {
    let company = COMPANIES[rng.index(COMPANIES.len())];
    let (country, region) = COUNTRIES[rng.index(COUNTRIES.len())];
    let person = |rng: &mut DeterministicRng| {
        let (local, name) = PEOPLE[rng.index(PEOPLE.len())];
        ContactInfo {
            // Upstream emails are not normalized.
            email: if rng.hit_rate_percent(20) {
                format!(" {}@{company}.example", local.to_uppercase())
            } else {
                format!("{local}@{company}.example")
            },
            name: (!name.is_empty()).then(|| name.to_string()),
            phone: rng
                .hit_rate_percent(50)
                .then(|| format!("+49 30 {}", rng.between(1_000, 9_999))),
            city: rng.hit_rate_percent(50).then(|| "new york".to_string()),
            state: rng.hit_rate_percent(30).then(|| "ny".to_string()),
        }
    };

    let technical_contact = person(rng);
    let billing_contact = rng.hit_rate_percent(40).then(|| person(rng));
    let partner_billing_contact = rng.hit_rate_percent(15).then(|| ContactInfo {
        email: format!("ap@{PARTNER_DOMAIN}"),
        name: Some("accounts payable".into()),
        ..ContactInfo::default()
    });

    ContactDetails {
        company: company.to_string(),
        country: country.to_string(),
        region: region.to_string(),
        technical_contact,
        billing_contact,
        partner_billing_contact,
    }
}

/// Two or three stale deals sharing the key of the group's first deal.
fn seeded_duplicates(rng: &mut DeterministicRng, index: usize, history: &History) -> Vec<Deal> {
    let (transaction_id, stage) = match history.transactions.first() {
        Some(tx) => (Some(tx.transaction_id.clone()), DealStage::ClosedWon),
        None => (None, DealStage::Eval),
    };
    let Some(date) = history
        .licenses
        .first()
        .map(|l| l.maintenance_start_date)
    else {
        return Vec::new();
    };

    (0..rng.between(2, 3))
        .map(|n| Deal {
            id: DealId::new(format!("S{index}-{n}")),
            data: DealData {
                addon_license_id: Some(history.license_id.clone()),
                transaction_id: transaction_id.clone(),
                close_date: date,
                deployment: Hosting::Server,
                app: "unknown".into(),
                deal_name: "imported".into(),
                country: history.details.country.clone(),
                origin: "Import".into(),
                pipeline: "Marketplace".into(),
                related_products: None,
                amount: None,
                stage: stage.clone(),
            },
            computed: DealComputed {
                has_activity: rng.hit_rate_percent(40),
            },
        })
        .collect()
}
