//! Fixture builders for unit tests.

use chrono::NaiveDate;

use crate::model::{
    ContactDetails, ContactInfo, Deal, DealComputed, DealData, DealId, DealStage, Hosting, License,
    LicenseStatus, LicenseType, SaleType, Transaction,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn details(email: &str) -> ContactDetails {
    ContactDetails {
        company: "Acme".into(),
        country: "Germany".into(),
        region: "EMEA".into(),
        technical_contact: ContactInfo {
            email: email.into(),
            name: Some("jo smith".into()),
            ..ContactInfo::default()
        },
        billing_contact: None,
        partner_billing_contact: None,
    }
}

pub fn license(addon_license_id: &str) -> License {
    License {
        addon_license_id: addon_license_id.into(),
        license_id: Some(format!("SEN-{addon_license_id}")),
        addon_key: "com.example.diagrams".into(),
        addon_name: "Diagrams".into(),
        hosting: Hosting::Cloud,
        license_type: LicenseType::Evaluation,
        status: LicenseStatus::Active,
        tier: Some(10),
        maintenance_start_date: date(2024, 1, 1),
        maintenance_end_date: Some(date(2024, 2, 1)),
        last_updated: date(2024, 1, 1),
        contact_details: details("jo@acme.com"),
    }
}

pub fn transaction(transaction_id: &str, addon_license_id: &str, sale_type: SaleType) -> Transaction {
    Transaction {
        transaction_id: transaction_id.into(),
        addon_license_id: addon_license_id.into(),
        addon_key: "com.example.diagrams".into(),
        addon_name: "Diagrams".into(),
        hosting: Hosting::Cloud,
        sale_type,
        sale_date: date(2024, 2, 1),
        vendor_amount: if sale_type == SaleType::Refund { -4_500 } else { 4_500 },
        tier: Some(10),
        contact_details: details("jo@acme.com"),
    }
}

pub fn deal(id: &str, addon_license_id: &str, transaction_id: Option<&str>, stage: DealStage) -> Deal {
    Deal {
        id: DealId::new(id),
        data: DealData {
            addon_license_id: Some(addon_license_id.into()),
            transaction_id: transaction_id.map(Into::into),
            close_date: date(2024, 1, 1),
            deployment: Hosting::Cloud,
            app: "com.example.diagrams".into(),
            deal_name: "Diagrams at Acme".into(),
            country: "Germany".into(),
            origin: "Marketplace".into(),
            pipeline: "Marketplace".into(),
            related_products: None,
            amount: None,
            stage,
        },
        computed: DealComputed::default(),
    }
}
