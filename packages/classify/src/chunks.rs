//! Splits a page-wide text blob into candidate incident fragments.

use crate::keywords::{CHUNK_HINT_KEYWORDS, contains_any};

/// Separators applied one after another.
const SEPARATORS: &[&str] = &["\n", "|", ";", ".", "  "];

/// Chunks this short are headers or labels, not incidents.
const MIN_CHUNK_CHARS: usize = 20;

const MAX_CHUNKS: usize = 50;

/// Splits `text` on line breaks, pipes, semicolons, periods, and double
/// spaces, keeping trimmed chunks that are long enough and mention a road or
/// a collision.
#[must_use]
pub fn split_into_incident_chunks(text: &str) -> Vec<String> {
    let mut pieces = vec![text];
    for separator in SEPARATORS {
        pieces = pieces
            .into_iter()
            .flat_map(|piece| piece.split(separator))
            .collect();
    }

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|chunk| chunk.chars().count() > MIN_CHUNK_CHARS)
        .filter(|chunk| contains_any(&chunk.to_lowercase(), CHUNK_HINT_KEYWORDS))
        .take(MAX_CHUNKS)
        .map(ToString::to_string)
        .collect()
}
