#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Alert dispatch for newly stored incidents.
//!
//! Each channel (email, hazmat email, SMS, hazmat SMS) is checked against a
//! rolling one-hour cap, narrowed to its audience, filtered against the
//! sent-alert records, handed to a [`Transport`], and recorded. Failures stay
//! local to the channel or recipient they happened on.

pub mod compose;
pub mod dispatcher;
pub mod rate_limit;
pub mod summary;
pub mod transport;

use truck_alert_database::StoreError;

pub use dispatcher::Dispatcher;
pub use summary::render_csv;
pub use transport::{LogTransport, Transport};

/// Errors reported by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The message was refused (bad address, content rejected).
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// The delivery service could not be reached.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Errors that abort a daily summary.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// The incident store failed.
    #[error("Incident store error: {0}")]
    Store(#[from] StoreError),

    /// The CSV attachment could not be rendered.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
