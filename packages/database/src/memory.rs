//! In-process store behind a single mutex.
//!
//! Every operation takes the lock once, so the fingerprint and sent-alert
//! uniqueness checks happen atomically with the write they guard.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use truck_alert_incident_models::{
    AlertChannel, Incident, NewIncident, SentAlertRecord, Subscriber,
};

use crate::{
    AlertMark, IncidentStore, InsertOutcome, SettingsStore, StoreError, SubscriberStore,
};

/// Store operation that [`MemoryStore::fail_after`] can take down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FaultPoint {
    /// [`IncidentStore::insert`].
    Insert,
    /// [`IncidentStore::count_alerts_since`].
    CountAlerts,
    /// [`IncidentStore::mark_alerted`].
    MarkAlerted,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    incidents: Vec<Incident>,
    by_fingerprint: BTreeMap<String, i64>,
    sent: Vec<SentAlertRecord>,
    subscribers: Vec<Subscriber>,
    include_stalls: Option<bool>,
    faults: BTreeMap<FaultPoint, usize>,
}

impl Inner {
    /// Counts one call at `point`, failing once its allowance is used up.
    fn trip(&mut self, point: FaultPoint) -> Result<(), StoreError> {
        match self.faults.get_mut(&point) {
            Some(0) => Err(StoreError::Unavailable(format!("{point:?} unavailable"))),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn has_record(&self, incident_id: i64, channel: AlertChannel, recipient: Option<&str>) -> bool {
        self.sent.iter().any(|r| {
            r.incident_id == incident_id && r.channel == channel && r.recipient.as_deref() == recipient
        })
    }
}

/// Store kept entirely in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Lets `successes` more calls at `point` through, then fails every
    /// later one with [`StoreError::Unavailable`]. Nothing is written by a
    /// failed call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn fail_after(&self, point: FaultPoint, successes: usize) -> Result<(), StoreError> {
        self.lock()?.faults.insert(point, successes);
        Ok(())
    }

    /// Records a sent alert with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn mark_alerted_at(
        &self,
        incident_id: i64,
        channel: AlertChannel,
        recipient: Option<&str>,
        sent_at: DateTime<Utc>,
    ) -> Result<AlertMark, StoreError> {
        let mut inner = self.lock()?;
        if inner.has_record(incident_id, channel, recipient) {
            return Ok(AlertMark::AlreadyRecorded);
        }
        inner.sent.push(SentAlertRecord {
            incident_id,
            channel,
            recipient: recipient.map(ToString::to_string),
            sent_at,
        });
        Ok(AlertMark::Recorded)
    }

    /// Every sent-alert record, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn sent_alerts(&self) -> Result<Vec<SentAlertRecord>, StoreError> {
        Ok(self.lock()?.sent.clone())
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn insert(&self, incident: &NewIncident) -> Result<InsertOutcome, StoreError> {
        let mut inner = self.lock()?;
        inner.trip(FaultPoint::Insert)?;

        if inner.by_fingerprint.contains_key(&incident.fingerprint) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let stored = Incident::from_new(id, incident.clone(), Utc::now());

        inner.by_fingerprint.insert(stored.fingerprint.clone(), id);
        inner.incidents.push(stored.clone());

        Ok(InsertOutcome::Inserted(stored))
    }

    async fn recent(&self, hours: u32) -> Result<Vec<Incident>, StoreError> {
        let cutoff = Utc::now() - Duration::hours(i64::from(hours));
        let inner = self.lock()?;

        let mut incidents: Vec<Incident> = inner
            .incidents
            .iter()
            .filter(|i| i.created_at >= cutoff)
            .cloned()
            .collect();
        incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(incidents)
    }

    async fn has_alert_record(
        &self,
        fingerprint: &str,
        channel: AlertChannel,
        recipient: Option<&str>,
    ) -> Result<bool, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .by_fingerprint
            .get(fingerprint)
            .is_some_and(|&id| inner.has_record(id, channel, recipient)))
    }

    async fn mark_alerted(
        &self,
        incident_id: i64,
        channel: AlertChannel,
        recipient: Option<&str>,
    ) -> Result<AlertMark, StoreError> {
        self.lock()?.trip(FaultPoint::MarkAlerted)?;
        self.mark_alerted_at(incident_id, channel, recipient, Utc::now())
    }

    async fn count_alerts_since(
        &self,
        channel: AlertChannel,
        hours: u32,
    ) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - Duration::hours(i64::from(hours));
        let mut inner = self.lock()?;
        inner.trip(FaultPoint::CountAlerts)?;
        let count = inner
            .sent
            .iter()
            .filter(|r| r.channel == channel && r.sent_at >= cutoff)
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn add_subscriber(&self, list: AlertChannel, address: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        if inner
            .subscribers
            .iter()
            .any(|s| s.list == list && s.address == address)
        {
            return Ok(false);
        }
        inner.subscribers.push(Subscriber {
            list,
            address: address.to_string(),
            active: true,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn remove_subscriber(
        &self,
        list: AlertChannel,
        address: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.subscribers.len();
        inner
            .subscribers
            .retain(|s| !(s.list == list && s.address == address));
        Ok(inner.subscribers.len() < before)
    }

    async fn toggle_subscriber(
        &self,
        list: AlertChannel,
        address: &str,
    ) -> Result<Option<bool>, StoreError> {
        let mut inner = self.lock()?;
        Ok(inner
            .subscribers
            .iter_mut()
            .find(|s| s.list == list && s.address == address)
            .map(|s| {
                s.active = !s.active;
                s.active
            }))
    }

    async fn list_subscribers(&self, list: AlertChannel) -> Result<Vec<Subscriber>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .subscribers
            .iter()
            .filter(|s| s.list == list)
            .cloned()
            .collect())
    }

    async fn active_subscribers(&self, list: AlertChannel) -> Result<Vec<String>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .subscribers
            .iter()
            .filter(|s| s.list == list && s.active)
            .map(|s| s.address.clone())
            .collect())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn include_stalls(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.include_stalls.unwrap_or(true))
    }

    async fn set_include_stalls(&self, value: bool) -> Result<(), StoreError> {
        self.lock()?.include_stalls = Some(value);
        Ok(())
    }

    async fn seed_include_stalls(&self, value: bool) -> Result<(), StoreError> {
        self.lock()?.include_stalls.get_or_insert(value);
        Ok(())
    }
}
