//! Deal generation: lookup, record mapping and action generation.

pub mod actions;
pub mod manager;
pub mod records;

pub use actions::{ActionGenerator, Action, DoubleUpdate, GenerationOutcome, UnresolvedDuplicates};
pub use manager::{DealManager, DealSet, DuplicateMap, InMemoryDealManager};
pub use records::{DealCreation, apply_record, deal_creation_properties};
