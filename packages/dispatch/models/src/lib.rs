#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Alert configuration, message bodies, and dispatch results.

pub mod config;

pub use config::{AlertConfig, ConfigError};

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use truck_alert_incident_models::AlertChannel;

/// A file attached to a broadcast message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// MIME type, e.g. `text/csv`.
    pub content_type: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

/// Body variants of a broadcast message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Plain-text body.
    pub text: String,
    /// HTML body.
    pub html: String,
    /// Optional attachment.
    pub attachment: Option<Attachment>,
}

/// What a channel did during one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelOutcome {
    /// At least one message went out.
    Sent {
        /// Incidents covered by the messages that went out.
        incidents: usize,
        /// Messages accepted by the transport.
        messages: usize,
        /// Messages the transport rejected.
        failed: usize,
    },
    /// The rolling-hour cap was already reached.
    RateLimited {
        /// Records counted in the trailing hour.
        sent_last_hour: u64,
        /// The configured cap.
        cap: u64,
    },
    /// Nobody active on the list.
    NoAudience,
    /// Nothing left to send on this channel.
    NoIncidents,
    /// Every transport call failed. Nothing was marked as sent.
    Failed {
        /// Messages the transport rejected.
        failed: usize,
    },
}

impl ChannelOutcome {
    /// Whether any message was accepted by the transport.
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Per-channel results of one dispatch, in channel order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// One entry per channel that was attempted.
    pub channels: Vec<(AlertChannel, ChannelOutcome)>,
}

impl DispatchReport {
    /// The outcome recorded for `channel`, if it ran.
    #[must_use]
    pub fn outcome(&self, channel: AlertChannel) -> Option<&ChannelOutcome> {
        self.channels
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, outcome)| outcome)
    }

    /// Messages accepted across all channels.
    #[must_use]
    pub fn messages_sent(&self) -> usize {
        self.channels
            .iter()
            .map(|(_, outcome)| match outcome {
                ChannelOutcome::Sent { messages, .. } => *messages,
                _ => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lookup_and_totals() {
        let report = DispatchReport {
            channels: vec![
                (
                    AlertChannel::Email,
                    ChannelOutcome::Sent {
                        incidents: 2,
                        messages: 1,
                        failed: 0,
                    },
                ),
                (AlertChannel::HazmatEmail, ChannelOutcome::NoIncidents),
                (
                    AlertChannel::Sms,
                    ChannelOutcome::Sent {
                        incidents: 2,
                        messages: 3,
                        failed: 1,
                    },
                ),
            ],
        };

        assert_eq!(report.messages_sent(), 4);
        assert_eq!(
            report.outcome(AlertChannel::HazmatEmail),
            Some(&ChannelOutcome::NoIncidents)
        );
        assert_eq!(report.outcome(AlertChannel::HazmatSms), None);
    }

    #[test]
    fn outcome_names() {
        assert_eq!(
            ChannelOutcome::RateLimited {
                sent_last_hour: 20,
                cap: 20
            }
            .as_ref(),
            "RATE_LIMITED"
        );
    }
}
