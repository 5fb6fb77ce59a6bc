pub mod contact;
pub mod deal;
pub mod record;

pub use contact::{Contact, ContactRecord, ContactType, InitialContact};
pub use deal::{Deal, DealChanges, DealComputed, DealData, DealId, DealProperty, DealStage};
pub use record::{
    ContactDetails, ContactInfo, Hosting, License, LicenseStatus, LicenseType, Record, RecordKey,
    RelatedRecordGroup, SaleType, Transaction,
};
