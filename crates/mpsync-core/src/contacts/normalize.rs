//! Per-record contact extraction and field normalization.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::PartnerDomains;
use crate::model::{
    ContactDetails, ContactInfo, ContactRecord, ContactType, Hosting, License, Transaction,
};

/// A character, a dot, then a two-letter token: `jon.io`, `acme.de`.
static DOMAIN_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9])\.([A-Za-z]{2})\b").expect("domain suffix pattern is valid")
});

/// Emit up to three contact records per license and per transaction:
/// technical, billing and partner billing. Slots without an email are
/// skipped.
#[must_use]
pub fn normalize_contacts(
    licenses: &[License],
    transactions: &[Transaction],
    partner_domains: &PartnerDomains,
) -> Vec<ContactRecord> {
    let owners = licenses
        .iter()
        .map(|l| Owner {
            details: &l.contact_details,
            hosting: l.hosting,
            updated: l.last_updated,
        })
        .chain(transactions.iter().map(|t| Owner {
            details: &t.contact_details,
            hosting: t.hosting,
            updated: t.sale_date,
        }));

    let mut records = Vec::new();
    for owner in owners {
        let details = owner.details;
        let slots = [
            (Some(&details.technical_contact), false),
            (details.billing_contact.as_ref(), false),
            (details.partner_billing_contact.as_ref(), true),
        ];
        for (info, forced_partner) in slots {
            let Some(info) = info else { continue };
            match owner.contact(info, forced_partner, partner_domains) {
                Some(record) => records.push(record),
                None => debug!(target: "mpsync::contacts", "skipping contact slot without email"),
            }
        }
    }
    records
}

/// The record a contact slot belongs to, supplying the type-specific fields.
struct Owner<'a> {
    details: &'a ContactDetails,
    hosting: Hosting,
    updated: NaiveDate,
}

impl Owner<'_> {
    fn contact(
        &self,
        info: &ContactInfo,
        forced_partner: bool,
        partner_domains: &PartnerDomains,
    ) -> Option<ContactRecord> {
        let email = normalize_email(&info.email)?;
        let contact_type = if forced_partner || partner_domains.matches_email(&email) {
            ContactType::Partner
        } else {
            ContactType::Customer
        };
        let (first_name, last_name) = split_name(info.name.as_deref());

        Some(ContactRecord {
            email,
            first_name: first_name.map(|n| fix_name(&n)),
            last_name: last_name.map(|n| fix_name(&n)),
            phone: non_blank(info.phone.as_deref()).map(capitalize_words),
            city: non_blank(info.city.as_deref()).map(capitalize_words),
            state: non_blank(info.state.as_deref()).map(capitalize_words),
            country: self.details.country.trim().to_string(),
            region: self.details.region.trim().to_string(),
            hosting: self.hosting,
            contact_type,
            company_id: None,
            updated: self.updated,
        })
    }
}

/// Trimmed and lowercased; `None` when blank.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    non_blank(Some(email)).map(str::to_lowercase)
}

/// Split a full name on the first space. The remainder, if any, is the
/// last name.
#[must_use]
pub fn split_name(name: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(name) = non_blank(name) else {
        return (None, None);
    };
    match name.split_once(' ') {
        Some((first, rest)) => (
            non_blank(Some(first)).map(str::to_string),
            non_blank(Some(rest)).map(str::to_string),
        ),
        None => (Some(name.to_string()), None),
    }
}

/// `Jon.io` → `Jon_io`, so the suffix is not capitalized as a new word.
#[must_use]
pub fn protect_domain_suffix(name: &str) -> String {
    DOMAIN_SUFFIX.replace_all(name, "${1}_${2}").into_owned()
}

/// Uppercase the first letter of every word. Words start after whitespace,
/// `-` or `.`; every other character is left as-is.
#[must_use]
pub fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = ch.is_whitespace() || matches!(ch, '-' | '.');
    }
    out
}

fn fix_name(name: &str) -> String {
    capitalize_words(&protect_domain_suffix(name))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{details, license, transaction};
    use crate::model::SaleType;

    #[test]
    fn split_name_on_first_space() {
        assert_eq!(
            split_name(Some("Jo van der Berg")),
            (Some("Jo".into()), Some("van der Berg".into()))
        );
        assert_eq!(split_name(Some("Cher")), (Some("Cher".into()), None));
        assert_eq!(split_name(Some("   ")), (None, None));
        assert_eq!(split_name(None), (None, None));
    }

    #[test]
    fn domain_suffix_is_protected_before_capitalizing() {
        assert_eq!(protect_domain_suffix("Jon.io"), "Jon_io");
        assert_eq!(fix_name("jon.io"), "Jon_io");
        assert_eq!(capitalize_words("jon.io"), "Jon.Io");
        assert_eq!(fix_name("j.r."), "J.R.");
    }

    #[test]
    fn capitalize_words_keeps_other_letters() {
        assert_eq!(capitalize_words("mary-jane mcDonald"), "Mary-Jane McDonald");
        assert_eq!(capitalize_words("new york"), "New York");
        assert_eq!(capitalize_words("+49 30 1234"), "+49 30 1234");
    }

    #[test]
    fn license_emits_three_slots() {
        let mut lic = license("L1");
        lic.contact_details.billing_contact = Some(ContactInfo {
            email: "Billing@Acme.com ".into(),
            name: Some("bo".into()),
            city: Some("  ".into()),
            ..ContactInfo::default()
        });
        lic.contact_details.partner_billing_contact = Some(ContactInfo {
            email: "ap@reseller.io".into(),
            ..ContactInfo::default()
        });

        let records = normalize_contacts(&[lic.clone()], &[], &PartnerDomains::default());
        assert_eq!(records.len(), 3);

        let tech = &records[0];
        assert_eq!(tech.email, "jo@acme.com");
        assert_eq!(tech.first_name.as_deref(), Some("Jo"));
        assert_eq!(tech.last_name.as_deref(), Some("Smith"));
        assert_eq!(tech.contact_type, ContactType::Customer);
        assert_eq!(tech.updated, lic.last_updated);
        assert_eq!(tech.region, "EMEA");

        let billing = &records[1];
        assert_eq!(billing.email, "billing@acme.com");
        assert_eq!(billing.city, None);

        assert_eq!(records[2].contact_type, ContactType::Partner);
    }

    #[test]
    fn partner_domain_marks_partner() {
        let mut tx = transaction("AT-1", "L1", SaleType::New);
        tx.contact_details = details("jo@Partner.example");
        let domains = PartnerDomains::new(["partner.example"]);

        let records = normalize_contacts(&[], &[tx.clone()], &domains);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].contact_type, ContactType::Partner);
        assert_eq!(records[0].updated, tx.sale_date);
        assert_eq!(records[0].hosting, tx.hosting);
    }

    #[test]
    fn slot_without_email_is_skipped() {
        let mut lic = license("L1");
        lic.contact_details.technical_contact.email = "  ".into();
        assert!(normalize_contacts(&[lic], &[], &PartnerDomains::default()).is_empty());
    }
}
