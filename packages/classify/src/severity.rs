//! Additive severity scoring.
//!
//! Starts at 1 and only ever adds, so appending another matched cue to a
//! description can never lower its score. The total is clamped to 5.

use truck_alert_incident_models::IncidentSeverity;

use crate::keywords::{
    ACCIDENT_KEYWORDS, BLOCKAGE_KEYWORDS, MULTI_VEHICLE_KEYWORDS, ROLLOVER_KEYWORDS,
    SEVERITY_SPILL_KEYWORDS, contains_any,
};

const SPILL_POINTS: u8 = 3;
const ROLLOVER_POINTS: u8 = 3;
const ACCIDENT_POINTS: u8 = 2;
const MULTI_VEHICLE_POINTS: u8 = 1;
const BLOCKAGE_POINTS: u8 = 1;

/// Raw additive score before clamping.
#[must_use]
pub fn raw_score(description: &str) -> u8 {
    let lower = description.to_lowercase();
    let mut score = 1;

    if contains_any(&lower, SEVERITY_SPILL_KEYWORDS) {
        score += SPILL_POINTS;
    }

    // Rollover/jackknife supersedes the generic collision bonus.
    if contains_any(&lower, ROLLOVER_KEYWORDS) {
        score += ROLLOVER_POINTS;
    } else if contains_any(&lower, ACCIDENT_KEYWORDS) {
        score += ACCIDENT_POINTS;
    }

    if contains_any(&lower, MULTI_VEHICLE_KEYWORDS) {
        score += MULTI_VEHICLE_POINTS;
    }

    if contains_any(&lower, BLOCKAGE_KEYWORDS) {
        score += BLOCKAGE_POINTS;
    }

    score
}

/// Maps textual cues in a description to an urgency level.
#[must_use]
pub fn score(description: &str) -> IncidentSeverity {
    IncidentSeverity::clamped(raw_score(description))
}
