//! Location extraction: turns a raw fragment into `"RoadA @ RoadB"`.
//!
//! Resolution is tried in a fixed order: an explicit `@` separator, then a
//! road pattern followed by a connector and a cross street, then a main road
//! alone, then any connector phrase, then [`UNRESOLVED_LOCATION`].

use std::sync::LazyLock;

use regex::Regex;

use crate::keywords::{is_connector, is_road_noise};

/// Returned when nothing in the fragment looks like a location.
pub const UNRESOLVED_LOCATION: &str = "Houston Area";

/// Placeholder for a cross street that could not be resolved.
pub const UNKNOWN_CROSS_STREET: &str = "[Cross Street]";

/// Maximum tokens kept on either side of a road pair.
const MAX_ROAD_TOKENS: usize = 3;

/// Maximum characters taken after a bare connector word.
const MAX_CONNECTOR_TAIL: usize = 50;

// ── Standardization ─────────────────────────────────────────────────

/// Rewrites applied to every road name, in order. Later rules see the
/// output of earlier ones: the `-bound` directions must collapse before the
/// bare directions, or `Northbound` would become `Nbound`.
static STANDARDIZE_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Route numbering
        (r"\bInterstate\s+(\d+)\b", "I-${1}"),
        (r"\bIH-?\s?(\d+)\b", "I-${1}"),
        (r"\bUS\s+(\d+)\b", "US-${1}"),
        (r"\bHighway\s+(\d+)\b", "Hwy ${1}"),
        // Road types
        (r"\bFreeway\b", "Fwy"),
        (r"\bBoulevard\b", "Blvd"),
        (r"\bAvenue\b", "Ave"),
        (r"\bStreet\b", "St"),
        (r"\bRoad\b", "Rd"),
        (r"\bDrive\b", "Dr"),
        (r"\bLane\b", "Ln"),
        (r"\bParkway\b", "Pkwy"),
        // Directions
        (r"\bNorthbound\b", "NB"),
        (r"\bSouthbound\b", "SB"),
        (r"\bEastbound\b", "EB"),
        (r"\bWestbound\b", "WB"),
        (r"\bNorth\b", "N"),
        (r"\bSouth\b", "S"),
        (r"\bEast\b", "E"),
        (r"\bWest\b", "W"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(&format!("(?i){pattern}")).expect("valid regex"),
            replacement,
        )
    })
    .collect()
});

/// Applies the standardization rules to a road name and collapses
/// whitespace.
#[must_use]
pub fn standardize(road: &str) -> String {
    let mut out = road.to_string();
    for (re, replacement) in STANDARDIZE_RULES.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Road patterns ───────────────────────────────────────────────────

/// Main-road forms, most specific first.
const MAIN_ROAD_CORES: &[(&str, &str)] = &[
    ("interstate", r"IH?-\d+[NSEW]?"),
    ("interstate-long", r"Interstate\s+\d+"),
    ("us-highway", r"US[-\s]?\d+"),
    ("state-highway", r"(?:Highway|Hwy|SH|FM)[-\s]?\d+"),
    ("beltway", r"Beltway\s+8"),
    ("loop", r"Loop\s+\d+"),
    ("toll-road", r"(?:[A-Za-z]+\s+){1,2}Toll\s+Road"),
    ("tollway", r"(?:[A-Za-z]+\s+){1,2}Tollway"),
    ("freeway", r"(?:[A-Za-z]+\s+){1,2}(?:Freeway|Fwy)\b"),
];

/// Generic street form, only used when paired with a cross street.
const STREET_CORE: (&str, &str) = (
    "street",
    r"(?:[A-Za-z0-9]+\s+){1,2}(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Boulevard|Blvd)\b",
);

/// `(main road + up to two qualifiers) connector (cross road)`.
static ROAD_PAIR_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    MAIN_ROAD_CORES
        .iter()
        .chain(std::iter::once(&STREET_CORE))
        .map(|(name, core)| {
            let pattern = format!(
                r"(?i)\b({core}(?:\s+[A-Za-z]+){{0,2}}?)\s+(?:at|near|and|after|before|past|@)\s+([\w\s\-]+)"
            );
            (*name, Regex::new(&pattern).expect("valid regex"))
        })
        .collect()
});

/// Main road alone, with an optional travel direction.
static MAIN_ROAD_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    MAIN_ROAD_CORES
        .iter()
        .map(|(name, core)| {
            let pattern = format!(
                r"(?i)\b({core}(?:\s+(?:North|South|East|West)bound|\s+[NSEW]B\b)?)"
            );
            (*name, Regex::new(&pattern).expect("valid regex"))
        })
        .collect()
});

static CONNECTOR_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:at|near|on|between)\s+(.{{1,{MAX_CONNECTOR_TAIL}}})"
    ))
    .expect("valid regex")
});

// ── Token helpers ───────────────────────────────────────────────────

fn tokens(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '.' | '(' | ')')))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Drops leading connectors and every noise token.
fn meaningful<'a>(tokens: &[&'a str]) -> Vec<&'a str> {
    tokens
        .iter()
        .skip_while(|t| is_connector(t) || is_road_noise(t))
        .filter(|t| !is_road_noise(t))
        .copied()
        .collect()
}

fn join_standardized(tokens: &[&str]) -> Option<String> {
    if tokens.is_empty() {
        return None;
    }
    let joined = standardize(&tokens.join(" "));
    (!joined.is_empty()).then_some(joined)
}

// ── Normalizer ──────────────────────────────────────────────────────

/// Extracts and standardizes a location from a raw incident fragment.
///
/// Never fails: returns [`UNRESOLVED_LOCATION`] when nothing matched.
#[must_use]
pub fn normalize(fragment: &str) -> String {
    if let Some(location) = from_separator(fragment) {
        return location;
    }

    if let Some(location) = from_road_pair(fragment) {
        return location;
    }

    if let Some(location) = from_main_road(fragment) {
        return location;
    }

    if let Some(location) = from_connector(fragment) {
        return location;
    }

    UNRESOLVED_LOCATION.to_string()
}

/// Whether a normalized location is too vague to act on.
#[must_use]
pub fn is_unresolved(location: &str) -> bool {
    let trimmed = location.trim();
    trimmed.is_empty() || trimmed == UNRESOLVED_LOCATION || trimmed == UNKNOWN_CROSS_STREET
}

/// Up to three tokens on each side of the first `@`.
fn from_separator(fragment: &str) -> Option<String> {
    let (before, after) = fragment.split_once('@')?;

    let before = tokens(before);
    let before = &before[before.len().saturating_sub(MAX_ROAD_TOKENS)..];
    let after = tokens(after);
    let after = &after[..after.len().min(MAX_ROAD_TOKENS)];

    let road1 = pick_tokens(before)?;
    let road2 = pick_tokens(after)?;

    Some(format!("{road1} @ {road2}"))
}

/// Meaningful tokens, or the raw tokens if every one was noise.
fn pick_tokens(raw: &[&str]) -> Option<String> {
    let kept = meaningful(raw);
    join_standardized(&kept).or_else(|| join_standardized(raw))
}

fn from_road_pair(fragment: &str) -> Option<String> {
    ROAD_PAIR_PATTERNS.iter().find_map(|(name, re)| {
        let caps = re.captures(fragment)?;
        let main = join_standardized(&meaningful(&tokens(caps.get(1)?.as_str())))?;
        let cross = clean_cross_road(caps.get(2)?.as_str());
        log::trace!("Location matched {name} pattern: {main} @ {cross}");
        Some(format!("{main} @ {cross}"))
    })
}

/// Strips incident noise and keeps the first three meaningful tokens.
fn clean_cross_road(raw: &str) -> String {
    let kept: Vec<&str> = meaningful(&tokens(raw))
        .into_iter()
        .take(MAX_ROAD_TOKENS)
        .collect();
    join_standardized(&kept).unwrap_or_else(|| UNKNOWN_CROSS_STREET.to_string())
}

fn from_main_road(fragment: &str) -> Option<String> {
    MAIN_ROAD_PATTERNS.iter().find_map(|(_, re)| {
        let caps = re.captures(fragment)?;
        let main = join_standardized(&meaningful(&tokens(caps.get(1)?.as_str())))?;
        Some(format!("{main} @ {UNKNOWN_CROSS_STREET}"))
    })
}

fn from_connector(fragment: &str) -> Option<String> {
    let caps = CONNECTOR_TAIL.captures(fragment)?;
    let tail = caps.get(1)?.as_str().trim();
    let tail = standardize(tail);
    (!tail.is_empty()).then_some(tail)
}
