//! mpsync-core: marketplace licenses and transactions to CRM deals and
//! contacts.
//!
//! The engine is pure over in-memory data. Fetching records, talking to the
//! CRM and persisting outcomes belong to the caller.
//!
//! # Conventions
//!
//! - **Errors**: fatal invariant breaches are typed (`thiserror`) and
//!   propagated; recoverable data anomalies are logged and returned in the
//!   run outcome.
//! - **Logging**: `tracing` macros under the `mpsync::deals` and
//!   `mpsync::contacts` targets.

#![forbid(unsafe_code)]

pub mod config;
pub mod contacts;
pub mod deals;
pub mod error;
pub mod events;
pub mod model;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use config::{EngineConfig, PartnerDomains, load_engine_config};
pub use contacts::{ContactInput, generate_contacts};
pub use deals::{Action, ActionGenerator, DealManager, GenerationOutcome, InMemoryDealManager};
pub use error::{ConfigError, ContactError, ErrorCode};
pub use events::{DealRelevantEvent, classify, classify_all};
