#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns raw feed fragments into stored incidents.
//!
//! A cycle classifies each fragment, builds a fingerprinted candidate from
//! the relevant ones, folds in-batch repeats together, and inserts the rest.
//! The store's unique fingerprint is what keeps concurrent cycles from
//! storing the same incident twice; nothing here checks before inserting.

pub mod builder;
pub mod cycle;
pub mod dedup;
pub mod fingerprint;

use truck_alert_database::StoreError;

pub use builder::build_incident;
pub use cycle::run_scrape_cycle;
pub use fingerprint::fingerprint;

/// Errors that abort a scrape cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// The incident store failed. The cycle stops; whatever was inserted
    /// before the failure stays.
    #[error("Incident store error: {0}")]
    Store(#[from] StoreError),
}
