//! Rolling one-hour caps per channel.

use truck_alert_database::{Store, StoreError};
use truck_alert_incident_models::AlertChannel;

/// Width of the rate-limit window.
pub const RATE_LIMIT_WINDOW_HOURS: u32 = 1;

/// Where a channel stands against its hourly cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// This many more records may be created this hour.
    Remaining(u64),
    /// The cap is already reached.
    Exhausted {
        /// Records counted in the window.
        sent_last_hour: u64,
        /// The configured cap.
        cap: u64,
    },
}

/// Counts `channel`'s records in the trailing hour and compares against `cap`.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be read.
pub async fn check(
    store: &dyn Store,
    channel: AlertChannel,
    cap: u64,
) -> Result<Budget, StoreError> {
    let sent_last_hour = store
        .count_alerts_since(channel, RATE_LIMIT_WINDOW_HOURS)
        .await?;

    if sent_last_hour >= cap {
        return Ok(Budget::Exhausted {
            sent_last_hour,
            cap,
        });
    }

    Ok(Budget::Remaining(cap - sent_last_hour))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use truck_alert_database::memory::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn counts_only_the_trailing_hour() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .mark_alerted_at(1, AlertChannel::Email, None, now - Duration::minutes(90))
            .unwrap();
        store
            .mark_alerted_at(2, AlertChannel::Email, None, now - Duration::minutes(10))
            .unwrap();
        store
            .mark_alerted_at(3, AlertChannel::Sms, Some("+15550100"), now)
            .unwrap();

        assert_eq!(
            check(&store, AlertChannel::Email, 3).await.unwrap(),
            Budget::Remaining(2)
        );
    }

    #[tokio::test]
    async fn exhausted_at_cap() {
        let store = MemoryStore::new();
        for id in 1..=2 {
            store
                .mark_alerted_at(id, AlertChannel::HazmatEmail, None, Utc::now())
                .unwrap();
        }

        assert_eq!(
            check(&store, AlertChannel::HazmatEmail, 2).await.unwrap(),
            Budget::Exhausted {
                sent_last_hour: 2,
                cap: 2
            }
        );
    }
}
