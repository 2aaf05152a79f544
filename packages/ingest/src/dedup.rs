//! In-batch collapse of near-identical candidates.
//!
//! One page often lists the same incident twice (a table row and a
//! banner, or two rows that differ by a word). Those are folded together
//! before anything reaches the store. Cross-cycle dedup is the store's job.

use std::collections::BTreeSet;

use truck_alert_incident_models::NewIncident;

/// Descriptions must share more than this many distinct words.
const SHARED_WORD_THRESHOLD: usize = 3;

fn word_set(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whether two candidates describe the same incident: overlapping
/// locations and more than three shared description words.
#[must_use]
pub fn is_similar(a: &NewIncident, b: &NewIncident) -> bool {
    let loc_a = a.location.to_lowercase();
    let loc_b = b.location.to_lowercase();

    let locations_overlap = loc_a == loc_b || loc_a.contains(&loc_b) || loc_b.contains(&loc_a);
    if !locations_overlap {
        return false;
    }

    let shared = word_set(&a.description)
        .intersection(&word_set(&b.description))
        .count();

    shared > SHARED_WORD_THRESHOLD
}

/// Drops candidates that repeat an earlier one by fingerprint or by
/// [`is_similar`]. First seen wins. Returns the survivors and how many were
/// dropped.
#[must_use]
pub fn collapse_batch(candidates: Vec<NewIncident>) -> (Vec<NewIncident>, usize) {
    let mut kept: Vec<NewIncident> = Vec::with_capacity(candidates.len());
    let mut collapsed = 0;

    for candidate in candidates {
        let repeat = kept
            .iter()
            .any(|k| k.fingerprint == candidate.fingerprint || is_similar(k, &candidate));

        if repeat {
            log::debug!("Collapsing in-batch repeat at {}", candidate.location);
            collapsed += 1;
        } else {
            kept.push(candidate);
        }
    }

    (kept, collapsed)
}

#[cfg(test)]
mod tests {
    use truck_alert_incident_models::IncidentSeverity;

    use super::*;
    use crate::fingerprint::fingerprint;

    fn candidate(location: &str, description: &str) -> NewIncident {
        NewIncident {
            location: location.to_string(),
            description: description.to_string(),
            incident_time: "1:00 PM".to_string(),
            severity: IncidentSeverity::Moderate,
            fingerprint: fingerprint(location, description),
        }
    }

    #[test]
    fn similar_when_location_contained_and_words_shared() {
        let a = candidate("I-45 @ Beltway 8", "Heavy truck accident blocking two lanes");
        let b = candidate("I-45 @ Beltway", "heavy truck accident, blocking right lane");
        assert!(is_similar(&a, &b));
    }

    #[test]
    fn three_shared_words_are_not_enough() {
        let a = candidate("I-45 @ Beltway 8", "Heavy truck accident");
        let b = candidate("I-45 @ Beltway 8", "heavy truck accident cleared");
        assert!(!is_similar(&a, &b));
    }

    #[test]
    fn different_locations_never_collapse() {
        let a = candidate("I-10 @ Wayside", "Heavy truck accident blocking two lanes");
        let b = candidate("I-10 @ Gessner", "Heavy truck accident blocking two lanes");
        assert!(!is_similar(&a, &b));
    }

    #[test]
    fn collapse_keeps_first_seen() {
        let batch = vec![
            candidate("I-45 @ Beltway 8", "Heavy truck accident blocking two lanes"),
            candidate("I-10 @ Wayside", "Box truck rollover"),
            candidate("I-45 @ Beltway 8", "Heavy truck accident blocking two lanes now"),
            candidate("I-10 @ Wayside", "Box truck rollover"),
        ];

        let (kept, collapsed) = collapse_batch(batch);
        assert_eq!(collapsed, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].description, "Heavy truck accident blocking two lanes");
        assert_eq!(kept[1].location, "I-10 @ Wayside");
    }
}
