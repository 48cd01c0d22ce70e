//! Dispatch gate: message delivery with bounded retries and backoff.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{AlertId, Contact, ContactId, EmergencyAlert, LocationInfo};
use crate::providers::{ContactProvider, NotificationTransport, TransportError};

use super::message;

/// Configuration for the dispatch gate
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DispatchConfig {
    /// Maximum delivery attempts before reporting failure
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles on each retry
    pub initial_backoff: Duration,
    /// Hard ceiling on one dispatch including all retries
    pub hard_timeout: Duration,
    /// Maximum characters per transport segment
    pub max_segment_chars: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            hard_timeout: Duration::from_secs(15),
            max_segment_chars: 160,
        }
    }
}

/// Net result of a dispatch
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Delivery succeeded to these contacts
    Sent {
        /// Contacts that received the notification
        contact_ids: Vec<ContactId>,
        /// Location included in the message, if one was available
        location: Option<LocationInfo>,
    },
    /// No enabled contacts; nothing to deliver (a normal condition)
    Skipped,
    /// Retries exhausted or permanent transport failure
    Failed,
}

impl DispatchOutcome {
    /// Check whether delivery succeeded
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent { .. })
    }
}

/// Bundles message construction and delivery to the notification
/// transport.
///
/// Transient transport failures are retried with doubling backoff up to
/// a bounded attempt count; permanent failures are not retried. The
/// whole dispatch is capped by a hard timeout so the coordinator is
/// never blocked past it.
pub struct DispatchGate {
    config: DispatchConfig,
    contacts: Arc<dyn ContactProvider>,
    transport: Arc<dyn NotificationTransport>,
}

impl DispatchGate {
    /// Create a gate over the given providers.
    pub fn new(
        config: DispatchConfig,
        contacts: Arc<dyn ContactProvider>,
        transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        Self {
            config,
            contacts,
            transport,
        }
    }

    /// Get configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Compose and deliver the emergency notification for an alert.
    pub async fn dispatch(&self, alert: &EmergencyAlert) -> DispatchOutcome {
        let contacts = self.contacts.enabled_contacts().await;
        if contacts.is_empty() {
            tracing::info!(alert_id = %alert.id(), "no enabled contacts, dispatch skipped");
            return DispatchOutcome::Skipped;
        }

        let location = self.contacts.current_location().await;
        let body = message::compose(alert, location.as_ref());

        if self.deliver(alert.id(), &contacts, &body).await {
            DispatchOutcome::Sent {
                contact_ids: contacts.into_iter().map(|c| c.id).collect(),
                location,
            }
        } else {
            DispatchOutcome::Failed
        }
    }

    /// Deliver the cancellation notice owed for an already-sent alert.
    pub async fn dispatch_cancellation(&self, alert: &EmergencyAlert) -> DispatchOutcome {
        let contacts = self.contacts.enabled_contacts().await;
        if contacts.is_empty() {
            return DispatchOutcome::Skipped;
        }

        let body = message::compose_cancellation(alert);
        if self.deliver(alert.id(), &contacts, &body).await {
            DispatchOutcome::Sent {
                contact_ids: contacts.into_iter().map(|c| c.id).collect(),
                location: None,
            }
        } else {
            DispatchOutcome::Failed
        }
    }

    async fn deliver(&self, alert_id: &AlertId, contacts: &[Contact], body: &str) -> bool {
        let recipients: Vec<String> = contacts.iter().map(|c| c.phone.clone()).collect();
        let segments = message::segment(body, self.config.max_segment_chars);

        match tokio::time::timeout(
            self.config.hard_timeout,
            self.send_with_retry(alert_id, &recipients, &segments),
        )
        .await
        {
            Ok(delivered) => delivered,
            Err(_) => {
                tracing::warn!(
                    alert_id = %alert_id,
                    timeout_secs = self.config.hard_timeout.as_secs(),
                    "dispatch hit hard timeout"
                );
                false
            }
        }
    }

    async fn send_with_retry(
        &self,
        alert_id: &AlertId,
        recipients: &[String],
        segments: &[String],
    ) -> bool {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.send_segments(recipients, segments).await {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::debug!(alert_id = %alert_id, attempt, "dispatch succeeded on retry");
                    }
                    return true;
                }
                Err(TransportError::Permanent(reason)) => {
                    tracing::warn!(alert_id = %alert_id, %reason, "permanent transport failure");
                    return false;
                }
                Err(TransportError::Transient(reason)) => {
                    tracing::warn!(
                        alert_id = %alert_id,
                        attempt,
                        max_attempts,
                        %reason,
                        "transient transport failure"
                    );
                    if attempt < max_attempts {
                        // Cap the exponent so large attempt counts cannot
                        // overflow the multiplication
                        let exponent = (attempt - 1).min(16);
                        let backoff = self.config.initial_backoff.saturating_mul(1u32 << exponent);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        false
    }

    async fn send_segments(
        &self,
        recipients: &[String],
        segments: &[String],
    ) -> Result<(), TransportError> {
        for segment in segments {
            self.transport.send(recipients, segment).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DispatchGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchGate")
            .field("config", &self.config)
            .finish()
    }
}
