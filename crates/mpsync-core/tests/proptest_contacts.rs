use chrono::Days;
use mpsync_core::contacts::{
    capitalize_words, merge_contact_properties, merge_duplicate_contacts, normalize_email,
};
use mpsync_core::model::{ContactRecord, ContactType, InitialContact};
use proptest::prelude::*;

use generators::*;

/// The same address with each ASCII letter's case chosen by `mask`.
fn recase(email: &str, mask: u64) -> String {
    email
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if (mask >> (i % 64)) & 1 == 1 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

/// Records for one email with strictly increasing `updated`, plus a shuffle.
fn arb_group_and_shuffle() -> impl Strategy<Value = (Vec<ContactRecord>, Vec<ContactRecord>)> {
    prop::collection::vec(arb_contact_record("jo@acme.com"), 1..6).prop_flat_map(|records| {
        let base = date(2021, 1, 1);
        let records: Vec<ContactRecord> = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| ContactRecord {
                updated: base + Days::new(i as u64),
                ..r
            })
            .collect();
        (Just(records.clone()), Just(records).prop_shuffle())
    })
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(1000))]

    #[test]
    fn single_record_round_trips(record in arb_contact_record("jo@acme.com")) {
        let merged = merge_contact_properties("jo@acme.com", std::slice::from_ref(&record));
        prop_assert_eq!(merged, Some(record));
    }

    #[test]
    fn merge_ignores_input_order((records, shuffled) in arb_group_and_shuffle()) {
        let a = merge_contact_properties("jo@acme.com", &records);
        let b = merge_contact_properties("jo@acme.com", &shuffled);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn merged_fields_come_from_the_group((records, _) in arb_group_and_shuffle()) {
        let merged = merge_contact_properties("primary@acme.com", &records).unwrap();
        let newest = records.iter().max_by_key(|r| r.updated).unwrap();

        prop_assert_eq!(merged.email.as_str(), "primary@acme.com");
        prop_assert_eq!(merged.updated, newest.updated);

        let any_partner = records.iter().any(|r| r.contact_type == ContactType::Partner);
        prop_assert_eq!(merged.contact_type == ContactType::Partner, any_partner);

        prop_assert_eq!(merged.first_name.is_some(), records.iter().any(|r| r.first_name.is_some()));
        prop_assert_eq!(merged.last_name.is_some(), records.iter().any(|r| r.last_name.is_some()));
        prop_assert_eq!(merged.phone.is_some(), records.iter().any(|r| r.phone.is_some()));
        if records.iter().any(|r| r.city.is_some() && r.state.is_some()) {
            prop_assert!(merged.city.is_some() && merged.state.is_some());
        }
    }

    #[test]
    fn alias_fold_ignores_known_contact_case(
        primary in arb_contact_record("jo@new.com"),
        alias in arb_contact_record("jo@old.com"),
        primary_mask in any::<u64>(),
        alias_mask in any::<u64>(),
    ) {
        let records = vec![primary, alias];
        let lower = [InitialContact {
            email: "jo@new.com".into(),
            other_emails: vec!["jo@old.com".into()],
        }];
        let recased = [InitialContact {
            email: recase("jo@new.com", primary_mask),
            other_emails: vec![recase("jo@old.com", alias_mask)],
        }];

        let expected = merge_duplicate_contacts(records.clone(), &lower).unwrap();
        let actual = merge_duplicate_contacts(records, &recased).unwrap();
        prop_assert_eq!(actual.len(), 1);
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn email_normalization_is_idempotent(email in "[ ]{0,2}[A-Za-z]{1,8}@[A-Za-z]{1,8}\\.com[ ]{0,2}") {
        let once = normalize_email(&email).unwrap();
        prop_assert_eq!(normalize_email(&once), Some(once.clone()));
        prop_assert_eq!(once.clone(), once.to_lowercase());
    }

    #[test]
    fn capitalizing_twice_changes_nothing(text in "[a-z .-]{0,24}") {
        let once = capitalize_words(&text);
        prop_assert_eq!(capitalize_words(&once), once.clone());
        prop_assert_eq!(once.to_lowercase(), text.to_lowercase());
    }
}
