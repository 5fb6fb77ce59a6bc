//! Source records from the marketplace: licenses and transactions.
//!
//! Records are immutable inputs. The engine never mutates them; it only reads
//! identifiers, dates and the customer block to derive deals and contacts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ParseEnumError;

/// Where the licensed app is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hosting {
    Server,
    Cloud,
    #[serde(rename = "Data Center")]
    DataCenter,
}

impl Hosting {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "Server",
            Self::Cloud => "Cloud",
            Self::DataCenter => "Data Center",
        }
    }
}

impl fmt::Display for Hosting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hosting {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "cloud" => Ok(Self::Cloud),
            "data center" | "datacenter" => Ok(Self::DataCenter),
            _ => Err(ParseEnumError {
                expected: "hosting",
                got: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseType {
    Evaluation,
    OpenSource,
    Community,
    Commercial,
    Academic,
    Starter,
    Demonstration,
}

impl LicenseType {
    /// Trials and open-source grants: licenses that never represent a sale.
    #[must_use]
    pub const fn is_evaluation_like(self) -> bool {
        matches!(self, Self::Evaluation | Self::OpenSource)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Inactive,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaleType {
    New,
    Renewal,
    Upgrade,
    Refund,
}

impl FromStr for SaleType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(Self::New),
            "Renewal" => Ok(Self::Renewal),
            "Upgrade" => Ok(Self::Upgrade),
            "Refund" => Ok(Self::Refund),
            _ => Err(ParseEnumError {
                expected: "sale type",
                got: s.to_string(),
            }),
        }
    }
}

/// One person attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// The customer block shared by licenses and transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetails {
    pub company: String,
    pub country: String,
    pub region: String,
    pub technical_contact: ContactInfo,
    pub billing_contact: Option<ContactInfo>,
    pub partner_billing_contact: Option<ContactInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub addon_license_id: String,
    #[serde(default)]
    pub license_id: Option<String>,
    pub addon_key: String,
    pub addon_name: String,
    pub hosting: Hosting,
    pub license_type: LicenseType,
    pub status: LicenseStatus,
    #[serde(default)]
    pub tier: Option<u32>,
    pub maintenance_start_date: NaiveDate,
    #[serde(default)]
    pub maintenance_end_date: Option<NaiveDate>,
    pub last_updated: NaiveDate,
    pub contact_details: ContactDetails,
}

impl License {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LicenseStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Refunds reuse the id of the sale they reverse.
    pub transaction_id: String,
    pub addon_license_id: String,
    pub addon_key: String,
    pub addon_name: String,
    pub hosting: Hosting,
    pub sale_type: SaleType,
    pub sale_date: NaiveDate,
    /// Vendor share in cents; negative for refunds.
    pub vendor_amount: i64,
    #[serde(default)]
    pub tier: Option<u32>,
    pub contact_details: ContactDetails,
}

/// Identifier shared by records and the deals derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub addon_license_id: String,
    pub transaction_id: Option<String>,
}

/// Borrowed view over either kind of source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    License(&'a License),
    Transaction(&'a Transaction),
}

impl<'a> Record<'a> {
    #[must_use]
    pub fn key(self) -> RecordKey {
        match self {
            Self::License(l) => RecordKey {
                addon_license_id: l.addon_license_id.clone(),
                transaction_id: None,
            },
            Self::Transaction(t) => RecordKey {
                addon_license_id: t.addon_license_id.clone(),
                transaction_id: Some(t.transaction_id.clone()),
            },
        }
    }

    #[must_use]
    pub fn addon_license_id(self) -> &'a str {
        match self {
            Self::License(l) => &l.addon_license_id,
            Self::Transaction(t) => &t.addon_license_id,
        }
    }

    #[must_use]
    pub fn transaction_id(self) -> Option<&'a str> {
        match self {
            Self::License(_) => None,
            Self::Transaction(t) => Some(&t.transaction_id),
        }
    }

    #[must_use]
    pub fn addon_key(self) -> &'a str {
        match self {
            Self::License(l) => &l.addon_key,
            Self::Transaction(t) => &t.addon_key,
        }
    }

    #[must_use]
    pub fn addon_name(self) -> &'a str {
        match self {
            Self::License(l) => &l.addon_name,
            Self::Transaction(t) => &t.addon_name,
        }
    }

    #[must_use]
    pub const fn hosting(self) -> Hosting {
        match self {
            Self::License(l) => l.hosting,
            Self::Transaction(t) => t.hosting,
        }
    }

    #[must_use]
    pub const fn contact_details(self) -> &'a ContactDetails {
        match self {
            Self::License(l) => &l.contact_details,
            Self::Transaction(t) => &t.contact_details,
        }
    }

    /// Maintenance start for licenses, sale date for transactions.
    #[must_use]
    pub const fn date(self) -> NaiveDate {
        match self {
            Self::License(l) => l.maintenance_start_date,
            Self::Transaction(t) => t.sale_date,
        }
    }

    /// Licenses carry no money of their own.
    #[must_use]
    pub const fn amount(self) -> i64 {
        match self {
            Self::License(_) => 0,
            Self::Transaction(t) => t.vendor_amount,
        }
    }
}

/// Licenses and transactions believed to describe one commercial
/// relationship. Grouping is done upstream and consumed as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedRecordGroup {
    pub licenses: Vec<License>,
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosting_parses_case_insensitively() {
        assert_eq!("cloud".parse::<Hosting>(), Ok(Hosting::Cloud));
        assert_eq!("Data Center".parse::<Hosting>(), Ok(Hosting::DataCenter));
        assert_eq!("DATACENTER".parse::<Hosting>(), Ok(Hosting::DataCenter));
        assert!("mainframe".parse::<Hosting>().is_err());
    }

    #[test]
    fn hosting_display_matches_serde_name() {
        let json = serde_json::to_string(&Hosting::DataCenter).expect("serialize");
        assert_eq!(json, format!("\"{}\"", Hosting::DataCenter));
    }

    #[test]
    fn evaluation_like_types() {
        assert!(LicenseType::Evaluation.is_evaluation_like());
        assert!(LicenseType::OpenSource.is_evaluation_like());
        assert!(!LicenseType::Commercial.is_evaluation_like());
        assert!(!LicenseType::Academic.is_evaluation_like());
    }

    #[test]
    fn sale_type_rejects_unknown() {
        assert_eq!("Upgrade".parse::<SaleType>(), Ok(SaleType::Upgrade));
        let err = "Gift".parse::<SaleType>().expect_err("unknown");
        assert_eq!(err.expected, "sale type");
    }
}
