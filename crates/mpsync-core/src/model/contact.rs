//! Contact records: the per-source intermediate form and the final output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ContactError;
use crate::model::record::Hosting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactType {
    Customer,
    Partner,
}

/// Normalized person data from one slot of one source record.
///
/// `updated` is the owning record's date and only exists to order records
/// while merging duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: String,
    pub region: String,
    pub hosting: Hosting,
    pub contact_type: ContactType,
    pub company_id: Option<String>,
    pub updated: NaiveDate,
}

/// A reconciled contact ready for the sync layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: String,
    pub region: String,
    pub hosting: Hosting,
    pub contact_type: ContactType,
    pub company_id: Option<String>,
}

/// A contact already known to the CRM, with its recorded alias emails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialContact {
    pub email: String,
    #[serde(default)]
    pub other_emails: Vec<String>,
}

impl ContactRecord {
    /// Validate and drop the merge-only fields.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError::MalformedContact`] if a required field is
    /// blank or an optional field is present but blank.
    pub fn finish(self) -> Result<Contact, ContactError> {
        let malformed = |reason: &str| ContactError::MalformedContact {
            email: self.email.clone(),
            reason: reason.to_string(),
        };

        for (name, value) in [
            ("email", &self.email),
            ("country", &self.country),
            ("region", &self.region),
        ] {
            if value.trim().is_empty() {
                return Err(malformed(&format!("required field {name} is empty")));
            }
        }

        for (name, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone", &self.phone),
            ("city", &self.city),
            ("state", &self.state),
            ("company_id", &self.company_id),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(malformed(&format!("optional field {name} is present but empty")));
            }
        }

        Ok(Contact {
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            city: self.city,
            state: self.state,
            country: self.country,
            region: self.region,
            hosting: self.hosting,
            contact_type: self.contact_type,
            company_id: self.company_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ContactRecord {
        ContactRecord {
            email: "jo@acme.com".into(),
            first_name: Some("Jo".into()),
            last_name: None,
            phone: None,
            city: Some("Berlin".into()),
            state: None,
            country: "Germany".into(),
            region: "EMEA".into(),
            hosting: Hosting::Server,
            contact_type: ContactType::Customer,
            company_id: None,
            updated: NaiveDate::from_ymd_opt(2023, 1, 1).expect("date"),
        }
    }

    #[test]
    fn finish_keeps_fields_and_drops_updated() {
        let contact = record().finish().expect("valid");
        assert_eq!(contact.email, "jo@acme.com");
        assert_eq!(contact.city.as_deref(), Some("Berlin"));
        let json = serde_json::to_value(&contact).expect("serialize");
        assert!(json.get("updated").is_none());
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let mut r = record();
        r.region = "  ".into();
        let err = r.finish().expect_err("blank region");
        assert!(matches!(err, ContactError::MalformedContact { ref reason, .. } if reason.contains("region")));
    }

    #[test]
    fn present_but_empty_optional_is_rejected() {
        let mut r = record();
        r.phone = Some(String::new());
        assert!(r.finish().is_err());
    }
}
