//! Dedup fingerprints.
//!
//! The same real-world incident is scraped many times with small wording
//! changes ("reported", "crews responding", "updated"). The fingerprint
//! ignores case, whitespace, and those words, and only looks at the first
//! 100 characters of the description.

use sha2::{Digest as _, Sha256};

/// Words that come and go between scrapes of the same incident.
pub const DESCRIPTION_NOISE_WORDS: &[&str] =
    &["reported", "dispatched", "responding", "crews", "updated"];

/// Characters of normalized description that take part in the hash.
pub const FINGERPRINT_DESCRIPTION_CHARS: usize = 100;

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_noise(token: &str) -> bool {
    let bare = token.trim_matches(|c: char| !c.is_alphanumeric());
    DESCRIPTION_NOISE_WORDS.contains(&bare)
}

/// Lower-cased location with runs of whitespace collapsed.
#[must_use]
pub fn normalize_location_key(location: &str) -> String {
    collapse_whitespace(&location.to_lowercase())
}

/// Lower-cased description without noise words, capped at
/// [`FINGERPRINT_DESCRIPTION_CHARS`].
#[must_use]
pub fn normalize_description_key(description: &str) -> String {
    let lower = description.to_lowercase();
    let kept: Vec<&str> = lower.split_whitespace().filter(|t| !is_noise(t)).collect();
    kept.join(" ")
        .chars()
        .take(FINGERPRINT_DESCRIPTION_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Hex SHA-256 over the normalized location and description.
#[must_use]
pub fn fingerprint(location: &str, description: &str) -> String {
    let key = format!(
        "{}:{}",
        normalize_location_key(location),
        normalize_description_key(description)
    );
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_case_and_whitespace() {
        let a = fingerprint("I-45 @ Beltway 8", "Semi truck accident");
        let b = fingerprint("  i-45  @ beltway 8 ", "SEMI   truck accident");
        assert_eq!(a, b);
        assert_eq!(a, fingerprint("I-45 @ Beltway 8", "Semi truck accident"));
    }

    #[test]
    fn ignores_noise_words() {
        let plain = fingerprint("Katy Fwy @ Gessner", "Heavy truck accident");
        assert_eq!(
            fingerprint("Katy Fwy @ Gessner", "Heavy truck accident reported"),
            plain
        );
        assert_eq!(
            fingerprint("Katy Fwy @ Gessner", "Heavy truck accident crews responding"),
            plain
        );
    }

    #[test]
    fn noise_words_keep_punctuation_neighbors() {
        assert_eq!(
            normalize_description_key("Stalled tanker, crews responding. Updated"),
            "stalled tanker,"
        );
    }

    #[test]
    fn only_first_hundred_description_chars_count() {
        let base = "x".repeat(FINGERPRINT_DESCRIPTION_CHARS);
        assert_eq!(
            fingerprint("Loop 610 @ [Cross Street]", &format!("{base} first tail")),
            fingerprint("Loop 610 @ [Cross Street]", &format!("{base} second tail"))
        );
    }

    #[test]
    fn location_changes_the_digest() {
        assert_ne!(
            fingerprint("I-10 @ Wayside", "Box truck rollover"),
            fingerprint("I-10 @ Gessner", "Box truck rollover")
        );
    }

    #[test]
    fn digest_is_hex_sha256() {
        let digest = fingerprint("a", "b");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
