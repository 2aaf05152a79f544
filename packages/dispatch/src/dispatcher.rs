//! Per-channel alert dispatch: rate limit, audience, send guard, transport.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use truck_alert_classify::is_hazmat;
use truck_alert_database::{AlertMark, Store, StoreError};
use truck_alert_dispatch_models::{AlertConfig, ChannelOutcome, DispatchReport};
use truck_alert_incident_models::{AlertChannel, Incident};

use crate::compose;
use crate::rate_limit::{self, Budget};
use crate::transport::Transport;

/// Sends alerts for newly stored incidents on every channel.
///
/// Channels run one after another and independently: a rate limit, an empty
/// list, or a transport failure on one channel never stops the others.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    transport: Arc<dyn Transport>,
    config: AlertConfig,
    locks: BTreeMap<AlertChannel, Mutex<()>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher over a shared store and transport.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, transport: Arc<dyn Transport>, config: AlertConfig) -> Self {
        let locks = AlertChannel::all()
            .iter()
            .map(|&channel| (channel, Mutex::new(())))
            .collect();

        Self {
            store,
            transport,
            config,
            locks,
        }
    }

    /// The configuration this dispatcher was built with.
    #[must_use]
    pub const fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Runs every channel over `incidents`.
    ///
    /// Sent-alert records are written after the transport accepts a message
    /// and before this returns. A crash between the two is the one window in
    /// which an alert can be repeated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store fails. Channels already run keep
    /// whatever they recorded.
    pub async fn dispatch(&self, incidents: &[Incident]) -> Result<DispatchReport, StoreError> {
        let mut report = DispatchReport::default();

        for &channel in AlertChannel::all() {
            let outcome = self.dispatch_channel(channel, incidents).await?;
            log::debug!("[{}] {}", channel.as_ref(), outcome.as_ref());
            report.channels.push((channel, outcome));
        }

        Ok(report)
    }

    /// Runs a single channel over `incidents`.
    ///
    /// Holds the channel's lock for the whole run, so overlapping dispatches
    /// in this process see each other's records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store fails.
    pub async fn dispatch_channel(
        &self,
        channel: AlertChannel,
        incidents: &[Incident],
    ) -> Result<ChannelOutcome, StoreError> {
        let _guard = match self.locks.get(&channel) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let candidates: Vec<&Incident> = incidents
            .iter()
            .filter(|incident| !channel.is_hazmat() || is_hazmat(&incident.description))
            .collect();

        if candidates.is_empty() {
            return Ok(ChannelOutcome::NoIncidents);
        }

        let cap = self.config.max_per_hour(channel);
        let remaining = match rate_limit::check(self.store(), channel, cap).await? {
            Budget::Remaining(remaining) => remaining,
            Budget::Exhausted {
                sent_last_hour,
                cap,
            } => {
                log::warn!(
                    "[{}] Rate limit reached ({sent_last_hour}/{cap} in the last hour), skipping",
                    channel.as_ref()
                );
                return Ok(ChannelOutcome::RateLimited {
                    sent_last_hour,
                    cap,
                });
            }
        };

        let recipients = self.store.active_subscribers(channel).await?;
        if recipients.is_empty() {
            return Ok(ChannelOutcome::NoAudience);
        }

        if channel.is_per_recipient() {
            self.send_per_recipient(channel, &candidates, &recipients, remaining)
                .await
        } else {
            self.send_broadcast(channel, &candidates, &recipients, remaining)
                .await
        }
    }

    async fn send_broadcast(
        &self,
        channel: AlertChannel,
        candidates: &[&Incident],
        recipients: &[String],
        remaining: u64,
    ) -> Result<ChannelOutcome, StoreError> {
        let mut pending = Vec::new();
        for &incident in candidates {
            if self
                .store
                .has_alert_record(&incident.fingerprint, channel, None)
                .await?
            {
                log::debug!(
                    "[{}] Incident #{} already alerted",
                    channel.as_ref(),
                    incident.id
                );
                continue;
            }
            pending.push(incident.clone());
        }

        if pending.is_empty() {
            return Ok(ChannelOutcome::NoIncidents);
        }

        hold_back(channel, &mut pending, remaining);

        let region = &self.config.region;
        let subject = if channel.is_hazmat() {
            compose::hazmat_email_subject(&pending, region)
        } else {
            compose::email_subject(&pending, region)
        };
        let body = compose::email_body(&pending, region);

        if let Err(e) = self
            .transport
            .send_broadcast(channel, recipients, &subject, &body)
            .await
        {
            log::error!(
                "[{}] Failed to send alert for {} incident(s): {e}",
                channel.as_ref(),
                pending.len()
            );
            return Ok(ChannelOutcome::Failed { failed: 1 });
        }

        for incident in &pending {
            self.record(incident, channel, None).await?;
        }

        log::info!(
            "[{}] Alerted {} recipient(s) about {} incident(s)",
            channel.as_ref(),
            recipients.len(),
            pending.len()
        );

        Ok(ChannelOutcome::Sent {
            incidents: pending.len(),
            messages: 1,
            failed: 0,
        })
    }

    async fn send_per_recipient(
        &self,
        channel: AlertChannel,
        candidates: &[&Incident],
        recipients: &[String],
        mut remaining: u64,
    ) -> Result<ChannelOutcome, StoreError> {
        let mut alerted = BTreeSet::new();
        let mut messages = 0;
        let mut failed = 0;

        for recipient in recipients {
            if remaining == 0 {
                log::warn!(
                    "[{}] Rate limit reached mid-dispatch, remaining recipients skipped",
                    channel.as_ref()
                );
                break;
            }

            let mut pending = Vec::new();
            for &incident in candidates {
                if !self
                    .store
                    .has_alert_record(&incident.fingerprint, channel, Some(recipient))
                    .await?
                {
                    pending.push(incident.clone());
                }
            }

            if pending.is_empty() {
                continue;
            }

            hold_back(channel, &mut pending, remaining);

            let region = &self.config.region;
            let budget = self.config.sms_max_chars;
            let message = if channel.is_hazmat() {
                compose::hazmat_sms_message(&pending, region, budget)
            } else {
                compose::sms_message(&pending, region, budget)
            };

            if let Err(e) = self
                .transport
                .send_single(channel, recipient, &message)
                .await
            {
                log::error!("[{}] Failed to send to {recipient}: {e}", channel.as_ref());
                failed += 1;
                continue;
            }

            messages += 1;
            for incident in &pending {
                if self.record(incident, channel, Some(recipient)).await? == AlertMark::Recorded {
                    remaining = remaining.saturating_sub(1);
                }
                alerted.insert(incident.id);
            }
        }

        Ok(match (messages, failed) {
            (0, 0) => ChannelOutcome::NoIncidents,
            (0, failed) => ChannelOutcome::Failed { failed },
            (messages, failed) => ChannelOutcome::Sent {
                incidents: alerted.len(),
                messages,
                failed,
            },
        })
    }

    async fn record(
        &self,
        incident: &Incident,
        channel: AlertChannel,
        recipient: Option<&str>,
    ) -> Result<AlertMark, StoreError> {
        let mark = self
            .store
            .mark_alerted(incident.id, channel, recipient)
            .await?;

        if mark == AlertMark::AlreadyRecorded {
            log::warn!(
                "[{}] Incident #{} was already recorded as alerted by another dispatch",
                channel.as_ref(),
                incident.id
            );
        }

        Ok(mark)
    }
}

/// Drops the incidents that do not fit in what is left of the hourly cap.
fn hold_back(channel: AlertChannel, pending: &mut Vec<Incident>, remaining: u64) {
    let allowed = usize::try_from(remaining).unwrap_or(usize::MAX);
    if pending.len() > allowed {
        log::warn!(
            "[{}] Rate limit leaves room for {allowed} of {} incident(s)",
            channel.as_ref(),
            pending.len()
        );
        pending.truncate(allowed);
    }
}

#[cfg(test)]
mod tests {
    use truck_alert_database::memory::{FaultPoint, MemoryStore};
    use truck_alert_database::{IncidentStore as _, SubscriberStore as _};
    use truck_alert_incident_models::{IncidentSeverity, NewIncident};

    use super::*;
    use crate::transport::testing::{RecordingTransport, Sent};

    async fn stored(store: &MemoryStore, location: &str, description: &str) -> Incident {
        store
            .insert(&NewIncident {
                location: location.to_string(),
                description: description.to_string(),
                incident_time: "3:16 PM".to_string(),
                severity: IncidentSeverity::Moderate,
                fingerprint: format!("{location}:{description}"),
            })
            .await
            .unwrap()
            .into_inserted()
            .unwrap()
    }

    fn config() -> AlertConfig {
        AlertConfig {
            email_max_per_hour: 2,
            sms_max_per_hour: 3,
            ..AlertConfig::default()
        }
    }

    fn dispatcher(store: &Arc<MemoryStore>, transport: &Arc<RecordingTransport>) -> Dispatcher {
        Dispatcher::new(store.clone(), transport.clone(), config())
    }

    fn broadcasts(transport: &RecordingTransport, channel: AlertChannel) -> usize {
        transport
            .calls()
            .iter()
            .filter(|call| matches!(call, Sent::Broadcast { channel: c, .. } if *c == channel))
            .count()
    }

    #[tokio::test]
    async fn nth_plus_one_alert_in_the_hour_is_suppressed() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_subscriber(AlertChannel::Email, "ops@example.com")
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(&store, &transport);

        for n in 1..=2 {
            let incident = stored(&store, &format!("I-{n}0 @ Exit"), "Semi truck crash").await;
            let report = dispatcher.dispatch(&[incident]).await.unwrap();
            assert!(report.outcome(AlertChannel::Email).unwrap().is_sent());
        }

        let third = stored(&store, "I-30 @ Exit", "Semi truck crash").await;
        let report = dispatcher.dispatch(&[third]).await.unwrap();

        assert_eq!(
            report.outcome(AlertChannel::Email),
            Some(&ChannelOutcome::RateLimited {
                sent_last_hour: 2,
                cap: 2
            })
        );
        assert_eq!(broadcasts(&transport, AlertChannel::Email), 2);
    }

    #[tokio::test]
    async fn batch_is_cut_to_the_remaining_budget() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_subscriber(AlertChannel::Email, "ops@example.com")
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(&store, &transport);

        let mut batch = Vec::new();
        for n in 1..=3 {
            batch.push(stored(&store, &format!("I-{n}0 @ Exit"), "Box truck rollover").await);
        }

        let outcome = dispatcher
            .dispatch_channel(AlertChannel::Email, &batch)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ChannelOutcome::Sent {
                incidents: 2,
                messages: 1,
                failed: 0
            }
        );
        assert_eq!(store.count_alerts_since(AlertChannel::Email, 1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn already_alerted_incident_is_not_resent() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_subscriber(AlertChannel::Email, "ops@example.com")
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(&store, &transport);

        let incident = stored(&store, "I-45 @ Beltway 8", "Semi truck collision").await;
        dispatcher.dispatch(&[incident.clone()]).await.unwrap();
        let report = dispatcher.dispatch(&[incident]).await.unwrap();

        assert_eq!(
            report.outcome(AlertChannel::Email),
            Some(&ChannelOutcome::NoIncidents)
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn hazmat_channels_only_see_spills() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_subscriber(AlertChannel::HazmatEmail, "hazmat@example.com")
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(&store, &transport);

        let crash = stored(&store, "I-45 @ Beltway 8", "Semi truck collision").await;
        let report = dispatcher.dispatch(&[crash.clone()]).await.unwrap();
        assert_eq!(
            report.outcome(AlertChannel::HazmatEmail),
            Some(&ChannelOutcome::NoIncidents)
        );

        let spill = stored(&store, "I-10 @ Wayside", "Tanker truck chemical spill").await;
        let report = dispatcher.dispatch(&[crash, spill]).await.unwrap();
        assert_eq!(
            report.outcome(AlertChannel::HazmatEmail),
            Some(&ChannelOutcome::Sent {
                incidents: 1,
                messages: 1,
                failed: 0
            })
        );

        let calls = transport.calls();
        let Sent::Broadcast { subject, .. } = &calls[0] else {
            panic!("expected a broadcast");
        };
        assert_eq!(subject, "HAZMAT ALERT: 1 Spill/Hazmat Incident in Houston");
    }

    #[tokio::test]
    async fn transport_failure_marks_nothing() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_subscriber(AlertChannel::Email, "ops@example.com")
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::failing_broadcasts());
        let dispatcher = dispatcher(&store, &transport);

        let incident = stored(&store, "I-45 @ Beltway 8", "Semi truck collision").await;
        let report = dispatcher.dispatch(&[incident.clone()]).await.unwrap();

        assert_eq!(
            report.outcome(AlertChannel::Email),
            Some(&ChannelOutcome::Failed { failed: 1 })
        );
        assert!(
            !store
                .has_alert_record(&incident.fingerprint, AlertChannel::Email, None)
                .await
                .unwrap()
        );
        assert!(store.sent_alerts().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sms_is_per_recipient_and_failures_stay_local() {
        let store = Arc::new(MemoryStore::new());
        for phone in ["+15550101", "+15550102"] {
            store.add_subscriber(AlertChannel::Sms, phone).await.unwrap();
        }
        let transport = Arc::new(RecordingTransport::failing_for(&["+15550101"]));
        let dispatcher = dispatcher(&store, &transport);

        let incident = stored(&store, "I-69 Eastex NB @ FM-1960", "Heavy Truck, Stall").await;
        let outcome = dispatcher
            .dispatch_channel(AlertChannel::Sms, &[incident.clone()])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ChannelOutcome::Sent {
                incidents: 1,
                messages: 1,
                failed: 1
            }
        );
        assert!(
            !store
                .has_alert_record(&incident.fingerprint, AlertChannel::Sms, Some("+15550101"))
                .await
                .unwrap()
        );
        assert!(
            store
                .has_alert_record(&incident.fingerprint, AlertChannel::Sms, Some("+15550102"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn sms_budget_is_shared_across_recipients() {
        let store = Arc::new(MemoryStore::new());
        for phone in ["+15550101", "+15550102", "+15550103"] {
            store.add_subscriber(AlertChannel::Sms, phone).await.unwrap();
        }
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(&store, &transport);

        let first = stored(&store, "I-10 @ Wayside", "Semi truck crash").await;
        let second = stored(&store, "I-45 @ Tidwell", "Box truck rollover").await;
        let outcome = dispatcher
            .dispatch_channel(AlertChannel::Sms, &[first, second])
            .await
            .unwrap();

        // Cap of 3: two records for the first phone, one for the second.
        assert_eq!(
            outcome,
            ChannelOutcome::Sent {
                incidents: 2,
                messages: 2,
                failed: 0
            }
        );
        assert_eq!(transport.call_count(), 2);
        assert_eq!(store.count_alerts_since(AlertChannel::Sms, 1).await.unwrap(), 3);

        let calls = transport.calls();
        let Sent::Single { message, .. } = &calls[0] else {
            panic!("expected a single message");
        };
        assert_eq!(message, "HOUSTON ALERT: 2 incidents - I-10, I-45");
    }

    #[tokio::test]
    async fn store_failure_stops_dispatch_and_keeps_earlier_records() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_subscriber(AlertChannel::Email, "ops@example.com")
            .await
            .unwrap();
        store
            .add_subscriber(AlertChannel::Sms, "+15550100")
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(&store, &transport);

        let incident = stored(&store, "I-45 @ Beltway 8", "Semi truck collision").await;
        store.fail_after(FaultPoint::CountAlerts, 1).unwrap();

        let result = dispatcher.dispatch(&[incident]).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        let records = store.sent_alerts().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].channel, AlertChannel::Email);
        assert_eq!(broadcasts(&transport, AlertChannel::Email), 1);
        assert!(
            !transport
                .calls()
                .iter()
                .any(|call| matches!(call, Sent::Single { .. }))
        );
    }

    #[tokio::test]
    async fn failed_record_after_send_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_subscriber(AlertChannel::Email, "ops@example.com")
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(&store, &transport);

        let incident = stored(&store, "I-45 @ Beltway 8", "Semi truck collision").await;
        store.fail_after(FaultPoint::MarkAlerted, 0).unwrap();

        let result = dispatcher
            .dispatch_channel(AlertChannel::Email, &[incident])
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(broadcasts(&transport, AlertChannel::Email), 1);
        assert!(store.sent_alerts().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatches_alert_once() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_subscriber(AlertChannel::Email, "ops@example.com")
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = Arc::new(dispatcher(&store, &transport));

        let incident = stored(&store, "I-45 @ Beltway 8", "Semi truck collision").await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                let incident = incident.clone();
                tokio::spawn(async move {
                    dispatcher
                        .dispatch_channel(AlertChannel::Email, &[incident])
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut sent = 0;
        for handle in handles {
            if handle.await.unwrap().is_sent() {
                sent += 1;
            }
        }

        assert_eq!(sent, 1);
        assert_eq!(broadcasts(&transport, AlertChannel::Email), 1);
    }

    #[tokio::test]
    async fn empty_list_reports_no_audience() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(&store, &transport);

        let incident = stored(&store, "I-45 @ Beltway 8", "Semi truck collision").await;
        let outcome = dispatcher
            .dispatch_channel(AlertChannel::Email, &[incident])
            .await
            .unwrap();

        assert_eq!(outcome, ChannelOutcome::NoAudience);
        assert_eq!(transport.call_count(), 0);
    }
}
