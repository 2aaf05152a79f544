#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Canonical incident, alert channel, and subscriber types.
//!
//! Every raw fragment that survives classification is normalized into a
//! [`NewIncident`] before it is handed to the store. Once stored it becomes
//! an [`Incident`] with a store-assigned id and creation timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Urgency of an incident, from 1 (minimal) to 5 (critical).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentSeverity {
    /// Level 1: no urgency cues beyond the incident itself (stalls)
    Minimal = 1,
    /// Level 2: minor cues (a single blockage or multi-vehicle mention)
    Low = 2,
    /// Level 3: accidents and collisions
    Moderate = 3,
    /// Level 4: spills, rollovers, or accidents with blockages
    High = 4,
    /// Level 5: spills combined with accidents or blockages
    Critical = 5,
}

impl IncidentSeverity {
    /// Returns the numeric value of this severity level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a severity level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-5.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSeverityError> {
        match value {
            1 => Ok(Self::Minimal),
            2 => Ok(Self::Low),
            3 => Ok(Self::Moderate),
            4 => Ok(Self::High),
            5 => Ok(Self::Critical),
            _ => Err(InvalidSeverityError { value }),
        }
    }

    /// Creates a severity level from an additive score, clamping it into
    /// the 1-5 range.
    #[must_use]
    pub const fn clamped(score: u8) -> Self {
        match score {
            0 | 1 => Self::Minimal,
            2 => Self::Low,
            3 => Self::Moderate,
            4 => Self::High,
            _ => Self::Critical,
        }
    }

    /// Label used in alert bodies.
    #[must_use]
    pub const fn priority_label(self) -> &'static str {
        match self {
            Self::High | Self::Critical => "HIGH",
            Self::Moderate => "MEDIUM",
            Self::Minimal | Self::Low => "LOW",
        }
    }
}

/// Error returned when attempting to create an [`IncidentSeverity`] from an
/// invalid numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid severity value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity value {}: expected 1-5", self.value)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// One alerting modality + audience combination.
///
/// Each channel has its own subscriber list, its own hourly cap, and its
/// own sent-alert bookkeeping.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AlertChannel {
    /// Broadcast email to general subscribers
    Email,
    /// Broadcast email to hazmat subscribers, hazmat incidents only
    HazmatEmail,
    /// Per-recipient SMS to general SMS subscribers
    Sms,
    /// Per-recipient SMS to hazmat SMS subscribers, hazmat incidents only
    HazmatSms,
}

impl AlertChannel {
    /// Whether this channel only carries spill/hazmat incidents.
    #[must_use]
    pub const fn is_hazmat(self) -> bool {
        matches!(self, Self::HazmatEmail | Self::HazmatSms)
    }

    /// Whether this channel sends one message per recipient (and keeps
    /// per-recipient sent state) rather than one broadcast.
    #[must_use]
    pub const fn is_per_recipient(self) -> bool {
        matches!(self, Self::Sms | Self::HazmatSms)
    }

    /// Returns all variants of this enum, in dispatch order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Email, Self::HazmatEmail, Self::Sms, Self::HazmatSms]
    }
}

/// A normalized incident that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    /// `"<RoadA> @ <RoadB>"` or `"<RoadA> @ [Cross Street]"`.
    pub location: String,
    /// Free text, at most 200 characters, never empty.
    pub description: String,
    /// 12-hour clock time, `"H:MM AM/PM"`.
    pub incident_time: String,
    /// Urgency derived from the description.
    pub severity: IncidentSeverity,
    /// Hex digest over the normalized location and description.
    pub fingerprint: String,
}

/// A stored incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Store-assigned primary key.
    pub id: i64,
    /// Normalized location.
    pub location: String,
    /// Capped description.
    pub description: String,
    /// 12-hour clock time.
    pub incident_time: String,
    /// Urgency derived from the description.
    pub severity: IncidentSeverity,
    /// Dedup fingerprint (unique across the store).
    pub fingerprint: String,
    /// When the store accepted the incident.
    pub created_at: DateTime<Utc>,
}

impl Incident {
    /// Attaches store-assigned identity to a [`NewIncident`].
    #[must_use]
    pub fn from_new(id: i64, new: NewIncident, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            location: new.location,
            description: new.description,
            incident_time: new.incident_time,
            severity: new.severity,
            fingerprint: new.fingerprint,
            created_at,
        }
    }
}

/// Proof that a channel already alerted on an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentAlertRecord {
    /// The incident that was alerted on.
    pub incident_id: i64,
    /// The channel that sent it.
    pub channel: AlertChannel,
    /// Recipient for per-recipient channels, `None` for broadcasts.
    pub recipient: Option<String>,
    /// When the send was recorded.
    pub sent_at: DateTime<Utc>,
}

/// An entry in one of the four subscriber lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    /// Which list (and therefore which channel) this entry belongs to.
    pub list: AlertChannel,
    /// Email address or phone number.
    pub address: String,
    /// Only active entries receive alerts.
    pub active: bool,
    /// When the entry was added.
    pub created_at: DateTime<Utc>,
}
