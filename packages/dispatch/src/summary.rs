//! Daily CSV summary of the last day's incidents.

use truck_alert_database::STATS_WINDOW_HOURS;
use truck_alert_dispatch_models::{Attachment, ChannelOutcome, MessageBody};
use truck_alert_incident_models::{AlertChannel, Incident};

use crate::SummaryError;
use crate::dispatcher::Dispatcher;

/// Attachment name of the summary CSV.
pub const SUMMARY_FILENAME: &str = "truck_alert_daily_summary.csv";

const CSV_HEADER: [&str; 6] = [
    "ID",
    "Location",
    "Description",
    "Incident Time",
    "Scraped At",
    "Severity",
];

/// Renders incidents as CSV, one row per incident under a fixed header.
///
/// # Errors
///
/// Returns [`csv::Error`] if a record cannot be written.
pub fn render_csv(incidents: &[Incident]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for incident in incidents {
        writer.write_record([
            incident.id.to_string(),
            incident.location.clone(),
            incident.description.clone(),
            incident.incident_time.clone(),
            incident.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            incident.severity.value().to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

fn summary_subject(region: &str) -> String {
    format!("Daily Summary: {region} Truck Alerts (Last 24 Hours)")
}

fn summary_text(incidents: &[Incident], region: &str) -> String {
    format!(
        "{region} Truck Alerts - Daily Summary\n\n\
         {} incident(s) recorded in the last 24 hours.\n\
         The full list is attached as {SUMMARY_FILENAME}.\n",
        incidents.len()
    )
}

impl Dispatcher {
    /// Emails the last day's incidents as a CSV attachment to the configured
    /// summary recipient.
    ///
    /// Not rate limited and leaves no sent-alert records.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError`] if the store fails or the CSV cannot be
    /// rendered. A transport failure is reported as
    /// [`ChannelOutcome::Failed`].
    pub async fn send_daily_summary(&self) -> Result<ChannelOutcome, SummaryError> {
        let Some(recipient) = self.config().summary_recipient.clone() else {
            log::error!("Daily summary recipient is not configured");
            return Ok(ChannelOutcome::NoAudience);
        };

        let incidents = self.store().recent(STATS_WINDOW_HOURS).await?;
        let region = &self.config().region;

        let body = MessageBody {
            text: summary_text(&incidents, region),
            html: format!(
                "<html><body><h2>{region} Truck Alerts - Daily Summary</h2>\
                 <p>{} incident(s) recorded in the last 24 hours.</p></body></html>",
                incidents.len()
            ),
            attachment: Some(Attachment {
                filename: SUMMARY_FILENAME.to_string(),
                content_type: "text/csv".to_string(),
                data: render_csv(&incidents)?,
            }),
        };

        if let Err(e) = self
            .transport()
            .send_broadcast(
                AlertChannel::Email,
                &[recipient],
                &summary_subject(region),
                &body,
            )
            .await
        {
            log::error!("Failed to send daily summary: {e}");
            return Ok(ChannelOutcome::Failed { failed: 1 });
        }

        log::info!("Daily summary sent ({} incidents)", incidents.len());

        Ok(ChannelOutcome::Sent {
            incidents: incidents.len(),
            messages: 1,
            failed: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use truck_alert_database::IncidentStore as _;
    use truck_alert_database::memory::MemoryStore;
    use truck_alert_dispatch_models::AlertConfig;
    use truck_alert_incident_models::{IncidentSeverity, NewIncident};

    use super::*;
    use crate::transport::testing::{RecordingTransport, Sent};

    fn new_incident(location: &str, description: &str) -> NewIncident {
        NewIncident {
            location: location.to_string(),
            description: description.to_string(),
            incident_time: "4:27 PM".to_string(),
            severity: IncidentSeverity::High,
            fingerprint: format!("{location}:{description}"),
        }
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let incident = Incident::from_new(
            7,
            new_incident("I-69 Eastex NB @ FM-1960", "Heavy Truck, Stall"),
            chrono::Utc::now(),
        );
        let csv = String::from_utf8(render_csv(&[incident]).unwrap()).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("ID,Location,Description,Incident Time,Scraped At,Severity")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("7,I-69 Eastex NB @ FM-1960,\"Heavy Truck, Stall\",4:27 PM,"));
        assert!(row.ends_with(",4"));
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn summary_attaches_csv_and_records_nothing() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(&new_incident("I-45 @ Beltway 8", "Semi truck collision"))
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let config = AlertConfig {
            summary_recipient: Some("dispatch@example.com".to_string()),
            email_max_per_hour: 0,
            ..AlertConfig::default()
        };
        let dispatcher = Dispatcher::new(store.clone(), transport.clone(), config);

        let outcome = dispatcher.send_daily_summary().await.unwrap();

        assert!(outcome.is_sent());
        assert!(store.sent_alerts().unwrap().is_empty());

        let calls = transport.calls();
        let Sent::Broadcast {
            recipients,
            subject,
            body,
            ..
        } = &calls[0]
        else {
            panic!("expected a broadcast");
        };
        assert_eq!(recipients, &["dispatch@example.com".to_string()]);
        assert_eq!(subject, "Daily Summary: Houston Truck Alerts (Last 24 Hours)");
        let attachment = body.attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, SUMMARY_FILENAME);
        assert_eq!(String::from_utf8_lossy(&attachment.data).lines().count(), 2);
    }

    #[tokio::test]
    async fn missing_recipient_sends_nothing() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = Dispatcher::new(store, transport.clone(), AlertConfig::default());

        assert_eq!(
            dispatcher.send_daily_summary().await.unwrap(),
            ChannelOutcome::NoAudience
        );
        assert_eq!(transport.call_count(), 0);
    }
}
