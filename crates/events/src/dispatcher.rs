//! Notification Dispatcher.
//!
//! Sends one alert to every opted-in recipient over every channel the
//! recipient has an address for. All attempts run concurrently, each bounded
//! by a timeout, and no attempt can fail or delay another beyond that bound.
//! The outcome is a [`DispatchReport`]; partial failure is never an error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use aquamine_core::alert::{Alert, NotificationRecipient};
use aquamine_core::message::AlertMessage;
use aquamine_core::types::DbId;

use crate::delivery::{ChannelKind, DeliveryError, NotificationChannel};

/// Default bound on a single outbound call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one recipient × channel attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryAttempt {
    pub recipient_id: DbId,
    pub recipient_name: String,
    pub channel: ChannelKind,
    pub success: bool,
    pub error: Option<String>,
}

/// Aggregate outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub attempts: Vec<DeliveryAttempt>,
    pub any_succeeded: bool,
    /// Distinct error messages, in first-seen order.
    pub errors: Vec<String>,
}

impl DispatchReport {
    fn from_attempts(attempts: Vec<DeliveryAttempt>) -> Self {
        let any_succeeded = attempts.iter().any(|a| a.success);
        let mut seen = HashSet::new();
        let errors = attempts
            .iter()
            .filter_map(|a| a.error.as_ref())
            .filter(|e| seen.insert(e.as_str()))
            .cloned()
            .collect();
        Self {
            attempts,
            any_succeeded,
            errors,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.attempts.iter().filter(|a| a.success).count()
    }

    pub fn failed(&self) -> usize {
        self.attempts.len() - self.succeeded()
    }
}

pub struct NotificationDispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, send_timeout: Duration) -> Self {
        Self {
            channels,
            send_timeout,
        }
    }

    /// Deliver `message` for `alert` to every matching recipient.
    ///
    /// Inactive recipients and those not opted in to the alert's severity are
    /// skipped, as are channels a recipient has no address for.
    pub async fn dispatch(
        &self,
        alert: &Alert,
        message: &AlertMessage,
        recipients: &[NotificationRecipient],
    ) -> DispatchReport {
        let attempts = recipients
            .iter()
            .filter(|r| r.wants(alert.severity))
            .flat_map(|recipient| {
                self.channels.iter().filter_map(move |channel| {
                    channel
                        .kind()
                        .address(recipient)
                        .map(|address| self.attempt(channel.as_ref(), recipient, address, message))
                })
            });

        let report = DispatchReport::from_attempts(join_all(attempts).await);

        if report.attempts.is_empty() {
            tracing::info!(alert_id = alert.id, sensor_id = %alert.sensor_id, "No recipients to notify");
        } else if report.errors.is_empty() {
            tracing::info!(
                alert_id = alert.id,
                sensor_id = %alert.sensor_id,
                sent = report.succeeded(),
                "Alert notifications delivered"
            );
        } else {
            tracing::warn!(
                alert_id = alert.id,
                sensor_id = %alert.sensor_id,
                sent = report.succeeded(),
                failed = report.failed(),
                errors = ?report.errors,
                "Alert notifications partially failed"
            );
        }

        report
    }

    async fn attempt(
        &self,
        channel: &dyn NotificationChannel,
        recipient: &NotificationRecipient,
        address: &str,
        message: &AlertMessage,
    ) -> DeliveryAttempt {
        let kind = channel.kind();
        let result = match tokio::time::timeout(self.send_timeout, channel.send(address, message)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.send_timeout)),
        };

        let error = result.err().map(|e| {
            tracing::debug!(
                recipient_id = recipient.id,
                channel = %kind,
                error = %e,
                "Delivery attempt failed"
            );
            format!("{kind}: {e}")
        });

        DeliveryAttempt {
            recipient_id: recipient.id,
            recipient_name: recipient.name.clone(),
            channel: kind,
            success: error.is_none(),
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(id: DbId, channel: ChannelKind, error: Option<&str>) -> DeliveryAttempt {
        DeliveryAttempt {
            recipient_id: id,
            recipient_name: format!("r{id}"),
            channel,
            success: error.is_none(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn report_dedups_errors_in_order() {
        let report = DispatchReport::from_attempts(vec![
            attempt(1, ChannelKind::Email, Some("email: down")),
            attempt(2, ChannelKind::Email, Some("email: down")),
            attempt(2, ChannelKind::WhatsApp, Some("whatsapp: bad token")),
            attempt(3, ChannelKind::WhatsApp, None),
        ]);
        assert!(report.any_succeeded);
        assert_eq!(report.errors, vec!["email: down", "whatsapp: bad token"]);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 3);
    }

    #[test]
    fn empty_report_has_no_success() {
        let report = DispatchReport::from_attempts(Vec::new());
        assert!(!report.any_succeeded);
        assert!(report.errors.is_empty());
    }
}
