//! Emergency alert entity and supporting value objects.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ContactId, LocationInfo};

/// Unique identifier for an emergency alert
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Create a new random alert ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of event raised the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AlertType {
    /// Free-fall followed by impact confirmation
    Fall,
    /// Sharp acceleration spike with device-movement corroboration
    Impact,
    /// User-initiated panic / SOS action
    Manual,
    /// Prolonged absence of motion reported by an external monitor
    Inactivity,
}

impl AlertType {
    /// Short human-readable phrase used in notification bodies
    pub fn phrase(&self) -> &'static str {
        match self {
            AlertType::Fall => "a fall was detected",
            AlertType::Impact => "a severe impact was detected",
            AlertType::Manual => "an SOS was triggered manually",
            AlertType::Inactivity => "prolonged inactivity was detected",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::Fall => write!(f, "FALL"),
            AlertType::Impact => write!(f, "IMPACT"),
            AlertType::Manual => write!(f, "MANUAL"),
            AlertType::Inactivity => write!(f, "INACTIVITY"),
        }
    }
}

/// Alert severity levels
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Severity {
    /// Critical - immediate response expected
    Critical = 1,
    /// High - urgent attention needed
    High = 2,
    /// Medium - important but not urgent
    Medium = 3,
}

impl Severity {
    /// Derive severity from the alert type
    pub fn from_type(alert_type: AlertType) -> Self {
        match alert_type {
            AlertType::Fall => Severity::Critical,
            AlertType::Impact => Severity::Critical,
            AlertType::Manual => Severity::Critical,
            AlertType::Inactivity => Severity::High,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
        }
    }
}

/// Lifecycle status of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AlertStatus {
    /// Alert created, countdown not yet started
    Triggered,
    /// Countdown running, cancellation still possible
    CountingDown,
    /// Notifications delivered to contacts
    Sent,
    /// Cancelled by the user
    Cancelled,
    /// Dispatch exhausted its retries without delivering
    Failed,
}

/// The single mutable object representing a current emergency.
///
/// At most one alert is active at any time; the coordinator enforces
/// that invariant and is the only writer once an alert is created.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmergencyAlert {
    id: AlertId,
    alert_type: AlertType,
    severity: Severity,
    status: AlertStatus,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    location: Option<LocationInfo>,
    custom_message: Option<String>,
    notified_contact_ids: Vec<ContactId>,
}

impl EmergencyAlert {
    /// Create a new alert in `Triggered` status with severity derived
    /// from the alert type.
    pub fn new(alert_type: AlertType) -> Self {
        Self {
            id: AlertId::new(),
            alert_type,
            severity: Severity::from_type(alert_type),
            status: AlertStatus::Triggered,
            created_at: Utc::now(),
            resolved_at: None,
            location: None,
            custom_message: None,
            notified_contact_ids: Vec::new(),
        }
    }

    /// Attach a custom message to include in the notification body
    pub fn with_custom_message(mut self, message: impl Into<String>) -> Self {
        self.custom_message = Some(message.into());
        self
    }

    /// Get the alert ID
    pub fn id(&self) -> &AlertId {
        &self.id
    }

    /// Get the alert type
    pub fn alert_type(&self) -> AlertType {
        self.alert_type
    }

    /// Get the severity
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the status
    pub fn status(&self) -> AlertStatus {
        self.status
    }

    /// Get creation time
    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    /// Get resolution time, if the alert has reached a terminal status
    pub fn resolved_at(&self) -> Option<&DateTime<Utc>> {
        self.resolved_at.as_ref()
    }

    /// Get the attached location, if one was acquired
    pub fn location(&self) -> Option<&LocationInfo> {
        self.location.as_ref()
    }

    /// Get the custom message, if any
    pub fn custom_message(&self) -> Option<&str> {
        self.custom_message.as_deref()
    }

    /// Contacts that were notified when the alert was dispatched
    pub fn notified_contact_ids(&self) -> &[ContactId] {
        &self.notified_contact_ids
    }

    /// Mark the countdown as started
    pub fn start_countdown(&mut self) {
        self.status = AlertStatus::CountingDown;
    }

    /// Record successful dispatch with the contacts that were reached
    pub fn mark_sent(&mut self, contacts: Vec<ContactId>, location: Option<LocationInfo>) {
        self.status = AlertStatus::Sent;
        self.notified_contact_ids = contacts;
        self.location = location;
        self.resolved_at = Some(Utc::now());
    }

    /// Record a user cancellation
    pub fn mark_cancelled(&mut self) {
        self.status = AlertStatus::Cancelled;
        self.resolved_at = Some(Utc::now());
    }

    /// Record dispatch failure after retries were exhausted
    pub fn mark_failed(&mut self) {
        self.status = AlertStatus::Failed;
        self.resolved_at = Some(Utc::now());
    }

    /// Check if the alert has reached a terminal status
    pub fn is_resolved(&self) -> bool {
        matches!(
            self.status,
            AlertStatus::Sent | AlertStatus::Cancelled | AlertStatus::Failed
        )
    }

    /// Time since the alert was created
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_creation() {
        let alert = EmergencyAlert::new(AlertType::Fall);
        assert_eq!(alert.alert_type(), AlertType::Fall);
        assert_eq!(alert.severity(), Severity::Critical);
        assert_eq!(alert.status(), AlertStatus::Triggered);
        assert!(!alert.is_resolved());
        assert!(alert.notified_contact_ids().is_empty());
    }

    #[test]
    fn test_alert_lifecycle_to_sent() {
        let mut alert = EmergencyAlert::new(AlertType::Impact);
        alert.start_countdown();
        assert_eq!(alert.status(), AlertStatus::CountingDown);

        let contact = ContactId::new();
        alert.mark_sent(vec![contact.clone()], None);
        assert_eq!(alert.status(), AlertStatus::Sent);
        assert_eq!(alert.notified_contact_ids(), &[contact]);
        assert!(alert.is_resolved());
        assert!(alert.resolved_at().is_some());
    }

    #[test]
    fn test_alert_cancellation() {
        let mut alert = EmergencyAlert::new(AlertType::Manual);
        alert.start_countdown();
        alert.mark_cancelled();
        assert_eq!(alert.status(), AlertStatus::Cancelled);
        assert!(alert.is_resolved());
    }

    #[test]
    fn test_severity_from_type() {
        assert_eq!(Severity::from_type(AlertType::Fall), Severity::Critical);
        assert_eq!(Severity::from_type(AlertType::Manual), Severity::Critical);
        assert_eq!(Severity::from_type(AlertType::Inactivity), Severity::High);
    }

    #[test]
    fn test_custom_message() {
        let alert = EmergencyAlert::new(AlertType::Manual).with_custom_message("I need help");
        assert_eq!(alert.custom_message(), Some("I need help"));
    }
}
