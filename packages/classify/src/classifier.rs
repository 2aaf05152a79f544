//! Relevance test for raw incident fragments.
//!
//! A fragment is reportable when it involves a heavy truck or a spill, is
//! not a local-street incident, and is not a stall while stalls are turned
//! off. Absence of a positive signal is a plain rejection, never an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::keywords::{HAZMAT_KEYWORDS, TRUCK_KEYWORDS, contains_any, is_stall};
use crate::road::is_street_incident;

/// Truck involvement that the keyword table alone misses.
static TRUCK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?:18|eighteen)[\s-]*wheel\w*\b",
        r"\btruck\s+(?:accident|crash|stall|breakdown|rollover)\b",
        r"\b(?:accident|crash)\s+.*\btruck\b",
        r"\bcommercial\s+vehicle\s+(?:accident|crash|stall)\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
    .collect()
});

/// Why a fragment was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Reportable. Flags record which signals fired.
    Relevant {
        /// A heavy-truck keyword matched.
        truck: bool,
        /// A spill/hazmat keyword matched.
        spill: bool,
        /// A truck pattern matched.
        pattern: bool,
    },
    /// On a local street without an explicit heavy-truck keyword.
    StreetIncident,
    /// A stall or breakdown while stalls are excluded.
    StallExcluded,
    /// No truck or spill signal.
    NoSignal,
}

impl Verdict {
    /// Whether the fragment should become an incident.
    #[must_use]
    pub const fn is_relevant(self) -> bool {
        matches!(self, Self::Relevant { .. })
    }
}

/// Decides whether a raw fragment is a reportable incident.
///
/// `include_stalls` must be read fresh from settings for every call.
#[must_use]
pub fn classify(fragment: &str, include_stalls: bool) -> bool {
    explain(fragment, include_stalls).is_relevant()
}

/// Same decision as [`classify`], with the reason attached.
#[must_use]
pub fn explain(fragment: &str, include_stalls: bool) -> Verdict {
    let lower = fragment.to_lowercase();
    let truck = contains_any(&lower, TRUCK_KEYWORDS);

    if is_street_incident(fragment) && !truck {
        log::debug!("Excluding street incident: {}", preview(fragment));
        return Verdict::StreetIncident;
    }

    if !include_stalls && is_stall(&lower) {
        return Verdict::StallExcluded;
    }

    let spill = contains_any(&lower, HAZMAT_KEYWORDS);
    let pattern = TRUCK_PATTERNS.iter().any(|re| re.is_match(fragment));

    if truck || spill || pattern {
        Verdict::Relevant {
            truck,
            spill,
            pattern,
        }
    } else {
        Verdict::NoSignal
    }
}

/// First 100 characters of a fragment, for log lines.
fn preview(fragment: &str) -> String {
    fragment.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASTEX_STALL: &str =
        "IH-69 Eastex Northbound After FM-1960 Heavy Truck, Stall Right Shoulder";

    #[test]
    fn heavy_truck_stall_follows_setting() {
        assert!(classify(EASTEX_STALL, true));
        assert!(!classify(EASTEX_STALL, false));
        assert_eq!(explain(EASTEX_STALL, false), Verdict::StallExcluded);
    }

    #[test]
    fn stall_exclusion_overrides_spill() {
        assert!(!classify("I-10 fuel spill from stalled tanker", false));
        assert!(classify("I-10 fuel spill from stalled tanker", true));
    }

    #[test]
    fn local_street_car_accident_is_rejected() {
        assert!(!classify("Car accident on Main Street", true));
    }

    #[test]
    fn local_street_generic_truck_is_rejected() {
        assert_eq!(
            explain("Truck accident on Main Street @ 5th Ave", true),
            Verdict::StreetIncident
        );
    }

    #[test]
    fn local_street_heavy_truck_is_kept() {
        assert!(classify("18-wheeler jackknifed on Kirby Drive", true));
    }

    #[test]
    fn spill_counts_for_any_vehicle() {
        assert_eq!(
            explain("I-610 West Loop oil spill, car overturned", true),
            Verdict::Relevant {
                truck: false,
                spill: true,
                pattern: false,
            }
        );
    }

    #[test]
    fn truck_patterns_fire_without_keywords() {
        assert!(classify("US-59 crash involving pickup truck", true));
        assert!(classify("Beltway 8 truck rollover", true));
        assert!(classify("I-45 eighteen-wheels overturned", true));
    }

    #[test]
    fn case_insensitive() {
        assert!(classify("I-45 SEMI-TRUCK COLLISION", true));
    }

    #[test]
    fn plain_car_crash_on_freeway_has_no_signal() {
        assert_eq!(
            explain("Katy Freeway at Gessner two-car crash", true),
            Verdict::NoSignal
        );
    }
}
