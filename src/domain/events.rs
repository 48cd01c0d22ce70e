//! Domain events emitted by the emergency coordinator.

use chrono::{DateTime, Utc};

use super::{AlertId, AlertType, ContactId};

/// Origin of a trigger request
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TriggerSource {
    /// Emitted by a classifier on the sample stream
    Sensor,
    /// Explicit user action (panic button, test trigger)
    Manual,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Sensor => write!(f, "sensor"),
            TriggerSource::Manual => write!(f, "manual"),
        }
    }
}

/// Lifecycle events broadcast to subscribers (UI, API, loggers).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum EmergencyEvent {
    /// A trigger was accepted and the countdown started
    Triggered {
        /// Alert that was created
        alert_id: AlertId,
        /// Kind of emergency
        alert_type: AlertType,
        /// Who requested the trigger
        source: TriggerSource,
        /// When the countdown started
        timestamp: DateTime<Utc>,
    },

    /// The active alert was cancelled before dispatch completed
    Cancelled {
        /// Alert that was cancelled
        alert_id: AlertId,
        /// When the cancellation took effect
        timestamp: DateTime<Utc>,
    },

    /// Notifications were delivered to contacts
    Dispatched {
        /// Alert that was sent
        alert_id: AlertId,
        /// Contacts that received the notification
        contact_ids: Vec<ContactId>,
        /// When delivery was recorded
        timestamp: DateTime<Utc>,
    },

    /// Dispatch gave up after exhausting its retries
    DispatchFailed {
        /// Alert that could not be delivered
        alert_id: AlertId,
        /// When the failure was recorded
        timestamp: DateTime<Utc>,
    },

    /// A cancellation notice was queued for an already-sent alert
    CancellationNoticeQueued {
        /// Alert the notice refers to
        alert_id: AlertId,
        /// When the notice was queued
        timestamp: DateTime<Utc>,
    },
}

impl EmergencyEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Triggered { timestamp, .. } => *timestamp,
            Self::Cancelled { timestamp, .. } => *timestamp,
            Self::Dispatched { timestamp, .. } => *timestamp,
            Self::DispatchFailed { timestamp, .. } => *timestamp,
            Self::CancellationNoticeQueued { timestamp, .. } => *timestamp,
        }
    }

    /// Get event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Triggered { .. } => "triggered",
            Self::Cancelled { .. } => "cancelled",
            Self::Dispatched { .. } => "dispatched",
            Self::DispatchFailed { .. } => "dispatch_failed",
            Self::CancellationNoticeQueued { .. } => "cancellation_notice_queued",
        }
    }

    /// Get the alert this event refers to
    pub fn alert_id(&self) -> &AlertId {
        match self {
            Self::Triggered { alert_id, .. } => alert_id,
            Self::Cancelled { alert_id, .. } => alert_id,
            Self::Dispatched { alert_id, .. } => alert_id,
            Self::DispatchFailed { alert_id, .. } => alert_id,
            Self::CancellationNoticeQueued { alert_id, .. } => alert_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let alert_id = AlertId::new();
        let event = EmergencyEvent::Triggered {
            alert_id: alert_id.clone(),
            alert_type: AlertType::Fall,
            source: TriggerSource::Sensor,
            timestamp: Utc::now(),
        };

        assert_eq!(event.event_type(), "triggered");
        assert_eq!(event.alert_id(), &alert_id);
    }
}
