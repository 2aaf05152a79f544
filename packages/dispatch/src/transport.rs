//! Delivery seam for composed alerts.

use async_trait::async_trait;
use truck_alert_dispatch_models::MessageBody;
use truck_alert_incident_models::AlertChannel;

use crate::TransportError;

/// Sends composed messages to recipients (SMTP, a carrier API, ...).
///
/// A failed call is local to the channel or recipient it was made for.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one message to every recipient of a broadcast channel.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the message was not accepted.
    async fn send_broadcast(
        &self,
        channel: AlertChannel,
        recipients: &[String],
        subject: &str,
        body: &MessageBody,
    ) -> Result<(), TransportError>;

    /// Sends one short message to a single recipient.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the message was not accepted.
    async fn send_single(
        &self,
        channel: AlertChannel,
        recipient: &str,
        message: &str,
    ) -> Result<(), TransportError>;
}

/// Transport that writes every message to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send_broadcast(
        &self,
        channel: AlertChannel,
        recipients: &[String],
        subject: &str,
        body: &MessageBody,
    ) -> Result<(), TransportError> {
        log::info!(
            "[{}] to {} recipient(s): {subject}",
            channel.as_ref(),
            recipients.len()
        );
        log::debug!("{}", body.text);
        if let Some(attachment) = &body.attachment {
            log::info!(
                "[{}] attachment {} ({} bytes)",
                channel.as_ref(),
                attachment.filename,
                attachment.data.len()
            );
        }
        Ok(())
    }

    async fn send_single(
        &self,
        channel: AlertChannel,
        recipient: &str,
        message: &str,
    ) -> Result<(), TransportError> {
        log::info!("[{}] to {recipient}: {message}", channel.as_ref());
        Ok(())
    }
}
