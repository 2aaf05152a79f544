//! Road-class test: does a fragment sit on a major roadway or on a local
//! street?
//!
//! Major-road markers are evaluated first and short-circuit the test, so a
//! fragment such as "Main Freeway" is a highway incident even though "Main"
//! is also a local street name. Local markers are only consulted when no
//! major marker matched.

use std::sync::LazyLock;

use regex::Regex;

use crate::keywords::contains_any;

/// Compiles a list of case-insensitive patterns.
fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
        .collect()
}

/// Interstates, US and state highways, the beltway and loops, toll
/// facilities, and anything named "<word> Freeway".
static MAJOR_ROAD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // Interstates
        r"\bi-\d+\b",
        r"\bih-?\d+\b",
        r"\binterstate\s+\d+\b",
        // US highways
        r"\bus-?\d+\b",
        r"\bus\s+highway\s+\d+\b",
        // State highways
        r"\bhighway\s+\d+\b",
        r"\bhwy\s+\d+\b",
        r"\bstate\s+highway\s+\d+\b",
        // Beltway and loops
        r"\bbeltway\s+8\b",
        r"\bloop\s+\d+\b",
        // Toll facilities
        r"\btoll\s+road\b",
        r"\btollway\b",
        r"\b(?:hardy|westpark|sam\s+houston)\s+toll\b",
        // Named freeways (Katy, Gulf, Eastex, ...)
        r"\b\w+\s+freeway\b",
        r"\b\w+\s+fwy\b",
    ])
});

/// Local street types, well-known surface streets, and residential hints.
static LOCAL_ROAD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // Street types
        r"\b\w+\s+street\b",
        r"\b\w+\s+st\b",
        r"\b\w+\s+avenue\b",
        r"\b\w+\s+ave\b",
        r"\b\w+\s+drive\b",
        r"\b\w+\s+dr\b",
        r"\b\w+\s+lane\b",
        r"\b\w+\s+ln\b",
        r"\b\w+\s+court\b",
        r"\b\w+\s+ct\b",
        r"\b\w+\s+circle\b",
        r"\b\w+\s+cir\b",
        r"\b\w+\s+place\b",
        r"\b\w+\s+pl\b",
        r"\b\w+\s+way\b",
        // Surface streets that are not highways
        r"\bwestheimer\s+(?:road|rd)\b",
        r"\bpost\s+oak\b",
        r"\bsage\s+(?:road|rd)\b",
        r"\bbissonnet\b",
        r"\bhillcroft\b",
        r"\bgessner\b",
        r"\bfondren\b",
        r"\bsharpstown\b",
        // Residential / off-road hints
        r"\bsubdivision\b",
        r"\bneighborhood\b",
        r"\bresidential\b",
        r"\blocal\s+street\b",
        r"\bparking\s+lot\b",
        r"\bshopping\s+center\b",
    ])
});

const STREET_WORDS: &[&str] = &["street", "avenue", "drive", "lane", "court", "circle", "place"];

const HIGHWAY_WORDS: &[&str] = &["freeway", "highway", "interstate", "beltway", "loop", "toll"];

/// Road class of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadClass {
    /// At least one major-road marker matched.
    Major,
    /// No major marker, but a local-street marker did.
    Local,
    /// Neither matched.
    Unknown,
}

/// Whether the fragment carries any major-road marker.
#[must_use]
pub fn has_major_road_marker(text: &str) -> bool {
    MAJOR_ROAD_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Classifies the road a fragment is on.
#[must_use]
pub fn road_class(text: &str) -> RoadClass {
    if has_major_road_marker(text) {
        return RoadClass::Major;
    }

    if LOCAL_ROAD_PATTERNS.iter().any(|re| re.is_match(text)) {
        return RoadClass::Local;
    }

    let lower = text.to_lowercase();
    if contains_any(&lower, STREET_WORDS) && !contains_any(&lower, HIGHWAY_WORDS) {
        return RoadClass::Local;
    }

    RoadClass::Unknown
}

/// Whether the fragment describes an incident on a local street.
#[must_use]
pub fn is_street_incident(text: &str) -> bool {
    road_class(text) == RoadClass::Local
}
