//! Collapsing duplicate contact records that share an email.
//!
//! Records are grouped by exact email. Known-contact emails are normalized
//! the same way record emails are, then alias groups are folded into their
//! primary's group and each group is merged into one record. Within a group
//! the most recently updated record wins, except:
//!
//! - any partner record makes the result a partner;
//! - names prefer a record with both names, else first/last are filled
//!   independently from the first record that has each;
//! - phone is the first one available;
//! - city/state follow the same both-or-independent rule as names.

use std::collections::HashMap;

use super::normalize::normalize_email;
use crate::error::ContactError;
use crate::model::{ContactRecord, ContactType, InitialContact};

/// Group `records` by email, fold known aliases into their primary, and
/// merge each group into a single record.
///
/// # Errors
///
/// Returns [`ContactError::AliasWithoutPrimary`] if an alias email has
/// records while its primary email has none.
pub fn merge_duplicate_contacts(
    records: Vec<ContactRecord>,
    initial_contacts: &[InitialContact],
) -> Result<Vec<ContactRecord>, ContactError> {
    let mut groups: HashMap<String, Vec<ContactRecord>> = HashMap::new();
    for record in records {
        groups.entry(record.email.clone()).or_default().push(record);
    }

    for initial in initial_contacts.iter().filter(|c| !c.other_emails.is_empty()) {
        let Some(primary_email) = normalize_email(&initial.email) else {
            continue;
        };
        let aliases: Vec<String> = initial
            .other_emails
            .iter()
            .filter_map(|alias| normalize_email(alias))
            .filter(|alias| *alias != primary_email)
            .collect();

        if groups.contains_key(&primary_email) {
            let folded: Vec<ContactRecord> = aliases
                .iter()
                .filter_map(|alias| groups.remove(alias))
                .flatten()
                .collect();
            if let Some(primary) = groups.get_mut(&primary_email) {
                primary.extend(folded);
            }
        } else if let Some(alias) = aliases.into_iter().find(|alias| groups.contains_key(alias)) {
            return Err(ContactError::AliasWithoutPrimary {
                primary: primary_email,
                alias,
            });
        }
    }

    Ok(groups
        .into_iter()
        .filter_map(|(email, group)| match group.len() {
            1 => group.into_iter().next(),
            _ => merge_contact_properties(&email, &group),
        })
        .collect())
}

/// Merge a group of records believed to be one person into a single record
/// addressed to `primary_email`. Returns `None` for an empty group.
#[must_use]
pub fn merge_contact_properties(
    primary_email: &str,
    contacts: &[ContactRecord],
) -> Option<ContactRecord> {
    let mut sorted: Vec<&ContactRecord> = contacts.iter().collect();
    // Stable: equal timestamps keep their input order.
    sorted.sort_by(|a, b| b.updated.cmp(&a.updated));

    let mut ideal = (*sorted.first()?).clone();
    ideal.email = primary_email.to_string();

    if ideal.contact_type == ContactType::Customer
        && sorted.iter().any(|c| c.contact_type == ContactType::Partner)
    {
        ideal.contact_type = ContactType::Partner;
    }

    if let Some(full) = sorted
        .iter()
        .find(|c| c.first_name.is_some() && c.last_name.is_some())
    {
        ideal.first_name.clone_from(&full.first_name);
        ideal.last_name.clone_from(&full.last_name);
    } else {
        ideal.first_name = sorted.iter().find_map(|c| c.first_name.clone());
        ideal.last_name = sorted.iter().find_map(|c| c.last_name.clone());
    }

    ideal.phone = sorted.iter().find_map(|c| c.phone.clone());

    if let Some(full) = sorted.iter().find(|c| c.city.is_some() && c.state.is_some()) {
        ideal.city.clone_from(&full.city);
        ideal.state.clone_from(&full.state);
    } else {
        ideal.city = sorted.iter().find_map(|c| c.city.clone());
        ideal.state = sorted.iter().find_map(|c| c.state.clone());
    }

    Some(ideal)
}
