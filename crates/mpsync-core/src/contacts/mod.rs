//! Contact reconciliation: one CRM contact per person across every license
//! and transaction that names them.

pub mod merge;
pub mod normalize;

pub use merge::{merge_contact_properties, merge_duplicate_contacts};
pub use normalize::{
    capitalize_words, normalize_contacts, normalize_email, protect_domain_suffix, split_name,
};

use tracing::{debug, instrument};

use crate::config::PartnerDomains;
use crate::error::ContactError;
use crate::model::{Contact, InitialContact, License, Transaction};

/// Everything the reconciler needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct ContactInput<'a> {
    pub licenses: &'a [License],
    pub transactions: &'a [Transaction],
    /// Contacts already known to the CRM, with any alias emails they carry.
    pub initial_contacts: &'a [InitialContact],
    pub partner_domains: &'a PartnerDomains,
}

/// Normalize, merge and validate contacts. Output is sorted by email.
///
/// # Errors
///
/// Returns a [`ContactError`] when an alias group has no primary or a
/// merged contact fails validation. Both mean the input data broke its
/// contract and the run should stop.
#[instrument(
    target = "mpsync::contacts",
    skip_all,
    fields(
        licenses = input.licenses.len(),
        transactions = input.transactions.len(),
        initial = input.initial_contacts.len(),
    )
)]
pub fn generate_contacts(input: &ContactInput<'_>) -> Result<Vec<Contact>, ContactError> {
    let records = normalize_contacts(input.licenses, input.transactions, input.partner_domains);
    let normalized = records.len();

    let mut merged = merge_duplicate_contacts(records, input.initial_contacts)?;
    merged.sort_by(|a, b| a.email.cmp(&b.email));

    let contacts = merged
        .into_iter()
        .map(|record| record.finish())
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        target: "mpsync::contacts",
        normalized,
        contacts = contacts.len(),
        "contacts generated"
    );
    Ok(contacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContactType, SaleType};
    use crate::testing::{date, details, license, transaction};

    #[test]
    fn same_person_across_records_collapses() {
        let mut lic = license("L1");
        lic.last_updated = date(2024, 3, 1);
        lic.contact_details.technical_contact.phone = Some("+49 30 1".into());
        let mut tx = transaction("AT-1", "L1", SaleType::New);
        tx.contact_details = details(" JO@acme.com");
        tx.contact_details.technical_contact.name = Some("joanna".into());

        let partner_domains = PartnerDomains::default();
        let contacts = generate_contacts(&ContactInput {
            licenses: &[lic],
            transactions: &[tx],
            initial_contacts: &[],
            partner_domains: &partner_domains,
        })
        .expect("contacts");

        assert_eq!(contacts.len(), 1);
        let jo = &contacts[0];
        assert_eq!(jo.email, "jo@acme.com");
        assert_eq!(jo.first_name.as_deref(), Some("Jo"));
        assert_eq!(jo.last_name.as_deref(), Some("Smith"));
        assert_eq!(jo.phone.as_deref(), Some("+49 30 1"));
        assert_eq!(jo.contact_type, ContactType::Customer);
    }

    #[test]
    fn output_is_sorted_by_email() {
        let mut a = license("L1");
        a.contact_details = details("zed@acme.com");
        let mut b = license("L2");
        b.contact_details = details("amy@acme.com");

        let partner_domains = PartnerDomains::default();
        let contacts = generate_contacts(&ContactInput {
            licenses: &[a, b],
            transactions: &[],
            initial_contacts: &[],
            partner_domains: &partner_domains,
        })
        .expect("contacts");

        let emails: Vec<_> = contacts.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails, ["amy@acme.com", "zed@acme.com"]);
    }

    #[test]
    fn orphaned_alias_aborts_the_run() {
        let lic = license("L1");
        let partner_domains = PartnerDomains::default();
        let initial = [InitialContact {
            email: "jo@new.com".into(),
            other_emails: vec!["jo@acme.com".into()],
        }];
        let err = generate_contacts(&ContactInput {
            licenses: &[lic],
            transactions: &[],
            initial_contacts: &initial,
            partner_domains: &partner_domains,
        })
        .expect_err("alias without primary");
        assert!(matches!(err, ContactError::AliasWithoutPrimary { .. }));
    }

    #[test]
    fn mixed_case_known_contact_folds_its_alias() {
        let mut current = license("L1");
        current.contact_details = details("jo@new.com");
        let mut old = license("L2");
        old.contact_details = details("jo@old.com");

        let partner_domains = PartnerDomains::default();
        for alias in ["Jo@Old.com", "jo@old.com"] {
            let initial = [InitialContact {
                email: "Jo@New.com".into(),
                other_emails: vec![alias.into()],
            }];
            let contacts = generate_contacts(&ContactInput {
                licenses: &[current.clone(), old.clone()],
                transactions: &[],
                initial_contacts: &initial,
                partner_domains: &partner_domains,
            })
            .expect("contacts");

            let emails: Vec<_> = contacts.iter().map(|c| c.email.as_str()).collect();
            assert_eq!(emails, ["jo@new.com"], "alias {alias}");
        }
    }

    #[test]
    fn blank_country_fails_validation() {
        let mut lic = license("L1");
        lic.contact_details.country = "  ".into();
        let partner_domains = PartnerDomains::default();
        let err = generate_contacts(&ContactInput {
            licenses: &[lic],
            transactions: &[],
            initial_contacts: &[],
            partner_domains: &partner_domains,
        })
        .expect_err("blank country");
        assert!(matches!(err, ContactError::MalformedContact { .. }));
    }
}
