//! `SQLite` store on `switchy_database`.
//!
//! Uniqueness lives in the schema: `incidents.fingerprint` is `UNIQUE` and
//! `sent_alerts` is `UNIQUE (incident_id, channel, recipient)`. Inserts use
//! `ON CONFLICT DO NOTHING RETURNING id`, so an empty result means another
//! writer got there first. Broadcast channels store the empty string as
//! recipient because `NULL` never conflicts.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};
use switchy_database_connection::init_sqlite_rusqlite;
use truck_alert_incident_models::{
    AlertChannel, Incident, IncidentSeverity, NewIncident, Subscriber,
};

use crate::{
    AlertMark, IncidentStore, InsertOutcome, SettingsStore, StoreError, SubscriberStore,
};

const INCLUDE_STALLS_KEY: &str = "include_stalls";

/// Store backed by a `SQLite` file.
pub struct SqliteStore {
    db: Box<dyn Database>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures all tables
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be created or the schema
    /// DDL fails.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = init_sqlite_rusqlite(Some(path))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let store = Self { db };
        store.ensure_schema().await?;

        log::debug!("Opened incident store at {}", path.display());

        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.db
            .exec_raw(
                "CREATE TABLE IF NOT EXISTS incidents (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    location TEXT NOT NULL,
                    description TEXT NOT NULL,
                    incident_time TEXT NOT NULL,
                    severity INTEGER NOT NULL,
                    fingerprint TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                )",
            )
            .await?;

        self.db
            .exec_raw(
                "CREATE INDEX IF NOT EXISTS idx_incidents_created_at
                    ON incidents (created_at)",
            )
            .await?;

        self.db
            .exec_raw(
                "CREATE TABLE IF NOT EXISTS sent_alerts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    incident_id INTEGER NOT NULL REFERENCES incidents(id),
                    channel TEXT NOT NULL,
                    recipient TEXT NOT NULL DEFAULT '',
                    sent_at TEXT NOT NULL,
                    UNIQUE (incident_id, channel, recipient)
                )",
            )
            .await?;

        self.db
            .exec_raw(
                "CREATE INDEX IF NOT EXISTS idx_sent_alerts_channel_sent_at
                    ON sent_alerts (channel, sent_at)",
            )
            .await?;

        self.db
            .exec_raw(
                "CREATE TABLE IF NOT EXISTS subscribers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    list TEXT NOT NULL,
                    address TEXT NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    UNIQUE (list, address)
                )",
            )
            .await?;

        self.db
            .exec_raw(
                "CREATE TABLE IF NOT EXISTS settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )",
            )
            .await?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fixed-width UTC timestamp, so string comparison matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn cutoff(hours: u32) -> String {
    timestamp(Utc::now() - Duration::hours(i64::from(hours)))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Conversion {
            message: format!("Invalid timestamp {value:?}: {e}"),
        })
}

fn parse_channel(value: &str) -> Result<AlertChannel, StoreError> {
    value.parse().map_err(|_| StoreError::Conversion {
        message: format!("Unknown alert channel {value:?}"),
    })
}

fn string(value: &str) -> DatabaseValue {
    DatabaseValue::String(value.to_string())
}

fn recipient_key(recipient: Option<&str>) -> DatabaseValue {
    string(recipient.unwrap_or_default())
}

fn conversion(name: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Conversion {
        message: format!("Failed to read column {name}: {e}"),
    }
}

fn int_column(row: &Row, name: &str) -> Result<i64, StoreError> {
    row.to_value(name).map_err(|e| conversion(name, e))
}

fn text_column(row: &Row, name: &str) -> Result<String, StoreError> {
    row.to_value(name).map_err(|e| conversion(name, e))
}

fn row_to_incident(row: &Row) -> Result<Incident, StoreError> {
    let severity = int_column(row, "severity")?;
    let severity = u8::try_from(severity)
        .ok()
        .and_then(|v| IncidentSeverity::from_value(v).ok())
        .ok_or_else(|| StoreError::Conversion {
            message: format!("Invalid severity {severity}"),
        })?;
    let created_at = text_column(row, "created_at")?;

    Ok(Incident {
        id: int_column(row, "id")?,
        location: text_column(row, "location")?,
        description: text_column(row, "description")?,
        incident_time: text_column(row, "incident_time")?,
        severity,
        fingerprint: text_column(row, "fingerprint")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_subscriber(row: &Row) -> Result<Subscriber, StoreError> {
    let list = text_column(row, "list")?;
    let active = int_column(row, "active")?;
    let created_at = text_column(row, "created_at")?;

    Ok(Subscriber {
        list: parse_channel(&list)?,
        address: text_column(row, "address")?,
        active: active != 0,
        created_at: parse_timestamp(&created_at)?,
    })
}

// ---------------------------------------------------------------------------
// Incidents and sent alerts
// ---------------------------------------------------------------------------

#[async_trait]
impl IncidentStore for SqliteStore {
    async fn insert(&self, incident: &NewIncident) -> Result<InsertOutcome, StoreError> {
        let created_at = Utc::now();

        let rows = self
            .db
            .query_raw_params(
                "INSERT INTO incidents
                    (location, description, incident_time, severity, fingerprint, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT (fingerprint) DO NOTHING
                 RETURNING id",
                &[
                    string(&incident.location),
                    string(&incident.description),
                    string(&incident.incident_time),
                    DatabaseValue::Int64(i64::from(incident.severity.value())),
                    string(&incident.fingerprint),
                    DatabaseValue::String(timestamp(created_at)),
                ],
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(InsertOutcome::AlreadyExists);
        };

        let id = int_column(row, "id")?;

        Ok(InsertOutcome::Inserted(Incident::from_new(
            id,
            incident.clone(),
            created_at,
        )))
    }

    async fn recent(&self, hours: u32) -> Result<Vec<Incident>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT * FROM incidents
                 WHERE created_at >= ?
                 ORDER BY created_at DESC, id DESC",
                &[DatabaseValue::String(cutoff(hours))],
            )
            .await?;

        rows.iter().map(row_to_incident).collect()
    }

    async fn has_alert_record(
        &self,
        fingerprint: &str,
        channel: AlertChannel,
        recipient: Option<&str>,
    ) -> Result<bool, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT s.id FROM sent_alerts s
                 JOIN incidents i ON i.id = s.incident_id
                 WHERE i.fingerprint = ? AND s.channel = ? AND s.recipient = ?
                 LIMIT 1",
                &[
                    string(fingerprint),
                    string(channel.as_ref()),
                    recipient_key(recipient),
                ],
            )
            .await?;

        Ok(!rows.is_empty())
    }

    async fn mark_alerted(
        &self,
        incident_id: i64,
        channel: AlertChannel,
        recipient: Option<&str>,
    ) -> Result<AlertMark, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "INSERT INTO sent_alerts (incident_id, channel, recipient, sent_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT (incident_id, channel, recipient) DO NOTHING
                 RETURNING id",
                &[
                    DatabaseValue::Int64(incident_id),
                    string(channel.as_ref()),
                    recipient_key(recipient),
                    DatabaseValue::String(timestamp(Utc::now())),
                ],
            )
            .await?;

        Ok(if rows.is_empty() {
            AlertMark::AlreadyRecorded
        } else {
            AlertMark::Recorded
        })
    }

    async fn count_alerts_since(
        &self,
        channel: AlertChannel,
        hours: u32,
    ) -> Result<u64, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT COUNT(*) AS n FROM sent_alerts WHERE channel = ? AND sent_at >= ?",
                &[string(channel.as_ref()), DatabaseValue::String(cutoff(hours))],
            )
            .await?;

        let count = match rows.first() {
            Some(row) => int_column(row, "n")?,
            None => 0,
        };

        u64::try_from(count).map_err(|e| StoreError::Conversion {
            message: format!("Negative alert count {count}: {e}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

#[async_trait]
impl SubscriberStore for SqliteStore {
    async fn add_subscriber(&self, list: AlertChannel, address: &str) -> Result<bool, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "INSERT INTO subscribers (list, address, active, created_at)
                 VALUES (?, ?, 1, ?)
                 ON CONFLICT (list, address) DO NOTHING
                 RETURNING id",
                &[
                    string(list.as_ref()),
                    string(address),
                    DatabaseValue::String(timestamp(Utc::now())),
                ],
            )
            .await?;

        Ok(!rows.is_empty())
    }

    async fn remove_subscriber(
        &self,
        list: AlertChannel,
        address: &str,
    ) -> Result<bool, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "DELETE FROM subscribers WHERE list = ? AND address = ? RETURNING id",
                &[string(list.as_ref()), string(address)],
            )
            .await?;

        Ok(!rows.is_empty())
    }

    async fn toggle_subscriber(
        &self,
        list: AlertChannel,
        address: &str,
    ) -> Result<Option<bool>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "UPDATE subscribers SET active = 1 - active
                 WHERE list = ? AND address = ?
                 RETURNING active",
                &[string(list.as_ref()), string(address)],
            )
            .await?;

        rows.first()
            .map(|row| int_column(row, "active").map(|v| v != 0))
            .transpose()
    }

    async fn list_subscribers(&self, list: AlertChannel) -> Result<Vec<Subscriber>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT * FROM subscribers WHERE list = ? ORDER BY id",
                &[string(list.as_ref())],
            )
            .await?;

        rows.iter().map(row_to_subscriber).collect()
    }

    async fn active_subscribers(&self, list: AlertChannel) -> Result<Vec<String>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT address FROM subscribers WHERE list = ? AND active = 1 ORDER BY id",
                &[string(list.as_ref())],
            )
            .await?;

        rows.iter().map(|row| text_column(row, "address")).collect()
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn include_stalls(&self) -> Result<bool, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT value FROM settings WHERE key = ?",
                &[string(INCLUDE_STALLS_KEY)],
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(true);
        };

        let value = text_column(row, "value")?;
        Ok(value == "true")
    }

    async fn set_include_stalls(&self, value: bool) -> Result<(), StoreError> {
        self.db
            .exec_raw_params(
                "INSERT INTO settings (key, value) VALUES (?, ?)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                &[string(INCLUDE_STALLS_KEY), DatabaseValue::String(value.to_string())],
            )
            .await?;

        Ok(())
    }

    async fn seed_include_stalls(&self, value: bool) -> Result<(), StoreError> {
        self.db
            .exec_raw_params(
                "INSERT INTO settings (key, value) VALUES (?, ?)
                 ON CONFLICT (key) DO NOTHING",
                &[string(INCLUDE_STALLS_KEY), DatabaseValue::String(value.to_string())],
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_db_path(name: &str) -> PathBuf {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        std::env::temp_dir().join(format!(
            "truck_alert_{name}_{}_{nanos}.db",
            std::process::id()
        ))
    }

    fn sample(fingerprint: &str) -> NewIncident {
        NewIncident {
            location: "Katy Fwy @ Gessner".to_string(),
            description: "18-wheeler rollover, lanes blocked".to_string(),
            incident_time: "7:05 AM".to_string(),
            severity: IncidentSeverity::Critical,
            fingerprint: fingerprint.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_is_idempotent_per_fingerprint() {
        let path = temp_db_path("insert");
        let store = SqliteStore::open(&path).await.unwrap();

        let first = store.insert(&sample("fp1")).await.unwrap();
        let second = store.insert(&sample("fp1")).await.unwrap();

        let InsertOutcome::Inserted(incident) = first else {
            panic!("first insert should succeed");
        };
        assert_eq!(second, InsertOutcome::AlreadyExists);

        let recent = store.recent(24).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, incident.id);
        assert_eq!(recent[0].severity, IncidentSeverity::Critical);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn sent_alerts_are_unique_per_recipient() {
        let path = temp_db_path("alerts");
        let store = SqliteStore::open(&path).await.unwrap();

        let incident = store
            .insert(&sample("fp2"))
            .await
            .unwrap()
            .into_inserted()
            .unwrap();

        assert_eq!(
            store
                .mark_alerted(incident.id, AlertChannel::Email, None)
                .await
                .unwrap(),
            AlertMark::Recorded
        );
        assert_eq!(
            store
                .mark_alerted(incident.id, AlertChannel::Email, None)
                .await
                .unwrap(),
            AlertMark::AlreadyRecorded
        );
        assert!(store
            .has_alert_record("fp2", AlertChannel::Email, None)
            .await
            .unwrap());
        assert!(!store
            .has_alert_record("fp2", AlertChannel::HazmatEmail, None)
            .await
            .unwrap());
        assert_eq!(
            store
                .count_alerts_since(AlertChannel::Email, 1)
                .await
                .unwrap(),
            1
        );

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn subscribers_and_settings_persist() {
        let path = temp_db_path("subscribers");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            assert!(store
                .add_subscriber(AlertChannel::Sms, "+15550002")
                .await
                .unwrap());
            assert!(!store
                .add_subscriber(AlertChannel::Sms, "+15550002")
                .await
                .unwrap());
            assert_eq!(
                store
                    .toggle_subscriber(AlertChannel::Sms, "+15550002")
                    .await
                    .unwrap(),
                Some(false)
            );
            store.seed_include_stalls(false).await.unwrap();
        }

        let store = SqliteStore::open(&path).await.unwrap();
        let entries = store.list_subscribers(AlertChannel::Sms).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].active);
        assert!(store
            .active_subscribers(AlertChannel::Sms)
            .await
            .unwrap()
            .is_empty());
        assert!(!store.include_stalls().await.unwrap());

        store.set_include_stalls(true).await.unwrap();
        assert!(store.include_stalls().await.unwrap());

        let _ = std::fs::remove_file(path);
    }
}
