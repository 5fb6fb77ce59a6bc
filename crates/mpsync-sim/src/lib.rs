//! mpsync-sim: seeded scenarios run through the deal engine until nothing
//! is left to write.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

#![forbid(unsafe_code)]

pub mod campaign;
pub mod crm;
pub mod oracle;
pub mod rng;
pub mod scenario;

pub use campaign::{CampaignConfig, CampaignReport, replay_seed, run_campaign};
pub use crm::SimCrm;
pub use oracle::{ConvergenceOracle, InvariantViolation, OracleResult};
pub use rng::DeterministicRng;
pub use scenario::{Scenario, ScenarioConfig, ScenarioGenerator};
