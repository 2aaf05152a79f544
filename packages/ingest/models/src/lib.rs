#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scrape cycle result types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use truck_alert_incident_models::Incident;

/// What happened to one raw fragment during a cycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateOutcome {
    /// Rejected by the classifier.
    NotRelevant,
    /// Relevant, but no usable location could be extracted.
    UnresolvedLocation,
    /// Same event as an earlier fragment in this batch.
    CollapsedInBatch,
    /// The store already has this fingerprint.
    Duplicate,
    /// Stored as a new incident.
    Inserted,
}

/// Result of one scrape cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleReport {
    /// Raw fragments received from the fetcher.
    pub fragments: u64,
    /// Fragments rejected by the classifier.
    pub not_relevant: u64,
    /// Relevant fragments dropped for lack of a location.
    pub unresolved: u64,
    /// Candidates folded into an earlier candidate of the same batch.
    pub collapsed: u64,
    /// Candidates the store already had.
    pub duplicates: u64,
    /// Incidents created by this cycle, in insertion order.
    pub inserted: Vec<Incident>,
    /// Wall-clock time of the cycle.
    pub duration: Duration,
}

impl CycleReport {
    /// Counts one outcome. [`CandidateOutcome::Inserted`] is counted by
    /// pushing onto [`Self::inserted`] instead.
    pub const fn record(&mut self, outcome: CandidateOutcome) {
        match outcome {
            CandidateOutcome::NotRelevant => self.not_relevant += 1,
            CandidateOutcome::UnresolvedLocation => self.unresolved += 1,
            CandidateOutcome::CollapsedInBatch => self.collapsed += 1,
            CandidateOutcome::Duplicate => self.duplicates += 1,
            CandidateOutcome::Inserted => {}
        }
    }

    /// Number of incidents created.
    #[must_use]
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }
}
