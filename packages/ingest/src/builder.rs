//! Incident builder: turns one relevant fragment into a [`NewIncident`].

use chrono::{Local, NaiveTime};
use truck_alert_classify::location::{is_unresolved, normalize};
use truck_alert_classify::severity;
use truck_alert_classify::time::{find_time_token, normalize_time_at};
use truck_alert_incident_models::NewIncident;

use crate::fingerprint::fingerprint;

/// Used when the feed gives no usable description.
pub const GENERIC_DESCRIPTION: &str = "Heavy truck incident reported";

/// Longest description kept on an incident.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Shorter descriptions are replaced with [`GENERIC_DESCRIPTION`].
const MIN_DESCRIPTION_CHARS: usize = 5;

/// The parts of a fragment each extractor reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateCells<'a> {
    /// Text the location is extracted from.
    pub location: &'a str,
    /// Text kept as the description.
    pub description: &'a str,
    /// Text the clock time is extracted from.
    pub time: &'a str,
}

/// Splits a table-row fragment (cells joined by tab or `|`) into the cells
/// the extractors read. Falls back to the whole fragment for anything the
/// row does not provide.
#[must_use]
pub fn split_cells(fragment: &str) -> CandidateCells<'_> {
    let cells: Vec<&str> = fragment
        .split(['\t', '|'])
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    if cells.len() < 2 {
        return CandidateCells {
            location: fragment,
            description: fragment,
            time: fragment,
        };
    }

    let time = cells[2..]
        .iter()
        .copied()
        .find(|c| find_time_token(c).is_some())
        .unwrap_or(fragment);

    CandidateCells {
        location: cells[0],
        description: cells[1],
        time,
    }
}

/// Collapses whitespace, caps the length, and substitutes the generic
/// phrase for descriptions that are too short to be useful.
#[must_use]
pub fn clean_description(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(MAX_DESCRIPTION_CHARS).collect();
    let capped = capped.trim();

    if capped.chars().count() < MIN_DESCRIPTION_CHARS {
        GENERIC_DESCRIPTION.to_string()
    } else {
        capped.to_string()
    }
}

/// Builds an incident from a fragment the classifier accepted.
///
/// Returns `None` when no usable location could be extracted.
#[must_use]
pub fn build_incident(fragment: &str) -> Option<NewIncident> {
    build_incident_at(fragment, Local::now().time())
}

/// Same as [`build_incident`], with the clock used when the fragment has
/// no time of its own.
#[must_use]
pub fn build_incident_at(fragment: &str, now: NaiveTime) -> Option<NewIncident> {
    let cells = split_cells(fragment);

    let location = normalize(cells.location);
    if is_unresolved(&location) {
        log::info!(
            "Dropping incident with unresolved location: {}",
            fragment.chars().take(100).collect::<String>()
        );
        return None;
    }

    let severity = severity::score(cells.description);
    let description = clean_description(cells.description);
    let incident_time = normalize_time_at(cells.time, now);
    let fingerprint = fingerprint(&location, &description);

    Some(NewIncident {
        location,
        description,
        incident_time,
        severity,
        fingerprint,
    })
}
