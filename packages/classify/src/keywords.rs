//! Keyword tables shared by the classifier, the severity scorer, and the
//! alert dispatcher.
//!
//! All tables are lower-case; callers lower-case the haystack once and use
//! [`contains_any`].

/// Phrases that mark a heavy-truck incident on their own.
pub const TRUCK_KEYWORDS: &[&str] = &[
    "heavy truck",
    "semi",
    "semi-truck",
    "semi truck",
    "18-wheeler",
    "18 wheeler",
    "eighteen wheeler",
    "tractor-trailer",
    "tractor trailer",
    "big rig",
    "commercial vehicle",
    "freight truck",
    "cargo truck",
    "delivery truck",
    "box truck",
    "flatbed truck",
];

/// Phrases that mark a spill or hazardous-material incident, whatever the
/// vehicle type.
pub const HAZMAT_KEYWORDS: &[&str] = &[
    "hazmat",
    "hazardous material",
    "chemical spill",
    "fuel spill",
    "oil spill",
    "cargo spill",
    "debris spill",
    "spill",
    "leak",
    "leaking",
];

/// Substrings that mark a stalled or broken-down vehicle.
pub const STALL_KEYWORDS: &[&str] = &["stall", "breakdown"];

/// Words that carry the spill bonus in severity scoring.
pub const SEVERITY_SPILL_KEYWORDS: &[&str] = &["hazmat", "chemical", "spill"];

/// Generic collision words.
pub const ACCIDENT_KEYWORDS: &[&str] = &["accident", "crash", "collision"];

/// Collision words that outrank [`ACCIDENT_KEYWORDS`].
pub const ROLLOVER_KEYWORDS: &[&str] = &["rollover", "jackknife"];

/// Words that indicate more than one vehicle is involved.
pub const MULTI_VEHICLE_KEYWORDS: &[&str] = &["multiple", "multi-vehicle", "pile-up", "pileup"];

/// Words that indicate lanes are blocked.
pub const BLOCKAGE_KEYWORDS: &[&str] = &["blocked", "blocking", "closed"];

/// Incident vocabulary that leaks into captured road names and must be
/// stripped before a road token is kept.
pub const ROAD_NOISE_WORDS: &[&str] = &[
    "accident",
    "crash",
    "incident",
    "blocked",
    "blocking",
    "closed",
    "stall",
    "stalled",
    "breakdown",
    "collision",
    "reported",
    "heavy",
    "truck",
    "semi",
    "vehicle",
    "traffic",
    "lanes",
    "lane",
    "spill",
    "rollover",
    "18-wheeler",
    "18-wheelers",
    "eighteen-wheeler",
    "eighteen-wheelers",
];

/// Words that link a main road to its cross street or position.
pub const CONNECTOR_WORDS: &[&str] = &["at", "near", "and", "on", "between", "after", "before", "past"];

/// Words that only hint at a page section holding incidents. Used to pick
/// candidate chunks out of a page-wide text blob.
pub const CHUNK_HINT_KEYWORDS: &[&str] = &[
    "truck", "semi", "accident", "crash", "i-", "us-", "highway", "toll", "freeway",
];

/// Checks if `haystack` contains any of the given `needles`.
#[must_use]
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Whether the text mentions a spill or hazardous material.
///
/// Case-insensitive.
#[must_use]
pub fn is_hazmat(text: &str) -> bool {
    contains_any(&text.to_lowercase(), HAZMAT_KEYWORDS)
}

/// Whether the text mentions a stalled or broken-down vehicle.
///
/// Case-insensitive.
#[must_use]
pub fn is_stall(text: &str) -> bool {
    contains_any(&text.to_lowercase(), STALL_KEYWORDS)
}

/// Whether a single token is incident noise rather than part of a road
/// name. Hyphenated tokens are noise if any part is (`semi-truck`).
#[must_use]
pub fn is_road_noise(token: &str) -> bool {
    let lower = token
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
        .to_lowercase();
    if lower.is_empty() {
        return true;
    }
    ROAD_NOISE_WORDS.contains(&lower.as_str())
        || lower
            .split('-')
            .any(|part| !part.is_empty() && ROAD_NOISE_WORDS.contains(&part))
}

/// Whether a single token is a connector word.
#[must_use]
pub fn is_connector(token: &str) -> bool {
    CONNECTOR_WORDS.contains(&token.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hazmat_detection_is_case_insensitive() {
        assert!(is_hazmat("HAZMAT crew on scene"));
        assert!(is_hazmat("Tanker leaking diesel"));
        assert!(!is_hazmat("Semi truck crash"));
    }

    #[test]
    fn stall_detection_covers_breakdown() {
        assert!(is_stall("Heavy Truck, Stall"));
        assert!(is_stall("vehicle BREAKDOWN right shoulder"));
        assert!(!is_stall("rollover"));
    }

    #[test]
    fn hyphenated_noise_tokens() {
        assert!(is_road_noise("semi-truck"));
        assert!(is_road_noise("Accident,"));
        assert!(!is_road_noise("FM-1960"));
        assert!(!is_road_noise("8"));
        assert!(is_road_noise(","));
        assert!(is_road_noise("18-Wheeler"));
        assert!(is_road_noise("18-wheelers,"));
        assert!(!is_road_noise("Wheeler"));
    }

    #[test]
    fn connector_tokens() {
        assert!(is_connector("After"));
        assert!(is_connector("at"));
        assert!(!is_connector("Gessner"));
    }
}
