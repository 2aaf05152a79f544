#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Heuristics that turn raw traffic-feed text into incident fields.
//!
//! Everything here is pure and synchronous: the relevance classifier, the
//! location normalizer, time extraction, and severity scoring. The only
//! external input is the `include_stalls` flag, which callers read from
//! settings for every fragment.

pub mod chunks;
pub mod classifier;
pub mod keywords;
pub mod location;
pub mod road;
pub mod severity;
pub mod time;

pub use chunks::split_into_incident_chunks;
pub use classifier::{Verdict, classify, explain};
pub use keywords::{is_hazmat, is_stall};
pub use location::{UNKNOWN_CROSS_STREET, UNRESOLVED_LOCATION, is_unresolved, normalize};
pub use road::{RoadClass, is_street_incident, road_class};
pub use severity::score as score_severity;
pub use time::{normalize_time, normalize_time_at};
