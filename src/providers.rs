//! External collaborator interfaces.
//!
//! Everything the core does not own — contact storage, location
//! acquisition, the notification transport, alert history persistence —
//! sits behind these traits. In-memory implementations ship for tests
//! and simple deployments.

use parking_lot::RwLock;

use crate::domain::{Contact, EmergencyAlert, LocationInfo};
use crate::SentryError;

/// Result of a transport send that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Worth retrying: congestion, radio not ready, timeout
    #[error("transient transport failure: {0}")]
    Transient(String),
    /// Not worth retrying: invalid recipient, permission denied
    #[error("permanent transport failure: {0}")]
    Permanent(String),
}

/// Provider of emergency contacts and the current device location.
///
/// An empty contact list is a normal "do not dispatch" condition, not
/// an error.
#[async_trait::async_trait]
pub trait ContactProvider: Send + Sync {
    /// Contacts currently enabled for notification
    async fn enabled_contacts(&self) -> Vec<Contact>;

    /// Best-effort current location; `None` when unavailable
    async fn current_location(&self) -> Option<LocationInfo>;
}

/// Delivery of a message body to a set of recipients.
///
/// Implementations may fall back to a user-mediated compose flow; its
/// success or failure is reported through the same result.
#[async_trait::async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Send one body to all recipients
    async fn send(&self, recipients: &[String], body: &str) -> Result<(), TransportError>;
}

/// Append-only alert history.
///
/// The coordinator appends fire-and-forget; a failing sink is logged
/// and never aborts the emergency flow.
#[async_trait::async_trait]
pub trait AlertHistorySink: Send + Sync {
    /// Record a resolved or dispatched alert
    async fn append(&self, alert: &EmergencyAlert) -> Result<(), SentryError>;
}

/// Fixed-list contact provider.
#[derive(Debug, Default)]
pub struct StaticContactProvider {
    contacts: Vec<Contact>,
    location: Option<LocationInfo>,
}

impl StaticContactProvider {
    /// Create a provider over a fixed contact list
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts,
            location: None,
        }
    }

    /// Attach a fixed location
    pub fn with_location(mut self, location: LocationInfo) -> Self {
        self.location = Some(location);
        self
    }
}

#[async_trait::async_trait]
impl ContactProvider for StaticContactProvider {
    async fn enabled_contacts(&self) -> Vec<Contact> {
        self.contacts.iter().filter(|c| c.enabled).cloned().collect()
    }

    async fn current_location(&self) -> Option<LocationInfo> {
        self.location.clone()
    }
}

/// In-memory alert history.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    alerts: RwLock<Vec<EmergencyAlert>>,
}

impl InMemoryHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded alerts, oldest first
    pub fn alerts(&self) -> Vec<EmergencyAlert> {
        self.alerts.read().clone()
    }

    /// Number of recorded alerts
    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    /// Check whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }
}

#[async_trait::async_trait]
impl AlertHistorySink for InMemoryHistory {
    async fn append(&self, alert: &EmergencyAlert) -> Result<(), SentryError> {
        self.alerts.write().push(alert.clone());
        Ok(())
    }
}
