#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Storage for incidents, sent-alert records, subscribers, and settings.
//!
//! The store is the only serialization point of the pipeline: a unique
//! fingerprint keeps concurrent scrape cycles from creating the same
//! incident twice, and a unique `(incident, channel, recipient)` key keeps
//! concurrent dispatches from recording the same alert twice. Neither is a
//! read-then-write check.
//!
//! Two implementations are provided: [`memory::MemoryStore`] for tests and
//! single-process use, and [`sqlite::SqliteStore`] on `switchy_database`.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use truck_alert_incident_models::{AlertChannel, Incident, NewIncident, Subscriber};

/// Hours covered by the dashboard counters.
pub const STATS_WINDOW_HOURS: u32 = 24;

/// Errors that can occur during store operations.
///
/// Any of these aborts the current cycle; the next trigger retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// I/O error (e.g. creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be converted back into a model type.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// The store could not be opened or is no longer usable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result of an idempotent incident insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// First time this fingerprint was seen.
    Inserted(Incident),
    /// An incident with this fingerprint is already stored.
    AlreadyExists,
}

impl InsertOutcome {
    /// The stored incident, if this insert created it.
    #[must_use]
    pub fn into_inserted(self) -> Option<Incident> {
        match self {
            Self::Inserted(incident) => Some(incident),
            Self::AlreadyExists => None,
        }
    }
}

/// Result of recording a sent alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertMark {
    /// The record was created.
    Recorded,
    /// Another dispatch recorded the same alert first.
    AlreadyRecorded,
}

/// Incident and sent-alert persistence.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Inserts an incident unless its fingerprint is already stored.
    ///
    /// Atomic per fingerprint: of N concurrent inserts of the same
    /// fingerprint, exactly one returns [`InsertOutcome::Inserted`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    async fn insert(&self, incident: &NewIncident) -> Result<InsertOutcome, StoreError>;

    /// Incidents created within the last `hours`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn recent(&self, hours: u32) -> Result<Vec<Incident>, StoreError>;

    /// Whether `channel` already alerted on the incident with this
    /// fingerprint. `recipient` is `None` for broadcast channels.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn has_alert_record(
        &self,
        fingerprint: &str,
        channel: AlertChannel,
        recipient: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Records that `channel` alerted on an incident.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    async fn mark_alerted(
        &self,
        incident_id: i64,
        channel: AlertChannel,
        recipient: Option<&str>,
    ) -> Result<AlertMark, StoreError>;

    /// Number of sent-alert records for `channel` in the trailing `hours`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn count_alerts_since(&self, channel: AlertChannel, hours: u32)
    -> Result<u64, StoreError>;
}

/// The four subscriber lists, one per [`AlertChannel`].
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Adds an active subscriber. Returns `false` if already on the list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    async fn add_subscriber(&self, list: AlertChannel, address: &str) -> Result<bool, StoreError>;

    /// Removes a subscriber. Returns `false` if not on the list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    async fn remove_subscriber(
        &self,
        list: AlertChannel,
        address: &str,
    ) -> Result<bool, StoreError>;

    /// Flips a subscriber's active flag and returns the new value, or
    /// `None` if the address is not on the list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    async fn toggle_subscriber(
        &self,
        list: AlertChannel,
        address: &str,
    ) -> Result<Option<bool>, StoreError>;

    /// Every entry on a list, active or not, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn list_subscribers(&self, list: AlertChannel) -> Result<Vec<Subscriber>, StoreError>;

    /// Addresses of the active entries on a list, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn active_subscribers(&self, list: AlertChannel) -> Result<Vec<String>, StoreError>;
}

/// Runtime-toggleable settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Whether stalls and breakdowns are reported. Defaults to `true` when
    /// never set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    async fn include_stalls(&self) -> Result<bool, StoreError>;

    /// Overwrites the stall setting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    async fn set_include_stalls(&self, value: bool) -> Result<(), StoreError>;

    /// Sets the stall setting only if it has never been set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    async fn seed_include_stalls(&self, value: bool) -> Result<(), StoreError>;
}

/// Everything the pipeline needs from storage.
pub trait Store: IncidentStore + SubscriberStore + SettingsStore {}

impl<T: IncidentStore + SubscriberStore + SettingsStore + ?Sized> Store for T {}

/// Subscriber counts for one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListStats {
    /// Which list.
    pub list: AlertChannel,
    /// Entries that receive alerts.
    pub active: usize,
    /// All entries.
    pub total: usize,
}

/// Counters shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    /// Incidents stored in the last [`STATS_WINDOW_HOURS`].
    pub incidents_last_day: usize,
    /// Sent-alert records across all channels in the same window.
    pub alerts_last_day: u64,
    /// Per-list subscriber counts, in channel order.
    pub lists: Vec<ListStats>,
}

/// Collects the dashboard counters.
///
/// # Errors
///
/// Returns [`StoreError`] if any count cannot be read.
pub async fn dashboard_stats(store: &dyn Store) -> Result<DashboardStats, StoreError> {
    let incidents_last_day = store.recent(STATS_WINDOW_HOURS).await?.len();

    let mut alerts_last_day = 0;
    let mut lists = Vec::with_capacity(AlertChannel::all().len());

    for &channel in AlertChannel::all() {
        alerts_last_day += store.count_alerts_since(channel, STATS_WINDOW_HOURS).await?;

        let entries = store.list_subscribers(channel).await?;
        lists.push(ListStats {
            list: channel,
            active: entries.iter().filter(|s| s.active).count(),
            total: entries.len(),
        });
    }

    Ok(DashboardStats {
        incidents_last_day,
        alerts_last_day,
        lists,
    })
}
