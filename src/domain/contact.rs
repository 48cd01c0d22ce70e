//! Emergency contact and location value objects.

use uuid::Uuid;

/// Unique identifier for an emergency contact
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ContactId(Uuid);

impl ContactId {
    /// Create a new random contact ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An emergency contact eligible to receive alert notifications
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Contact {
    /// Contact identifier
    pub id: ContactId,
    /// Display name
    pub name: String,
    /// Phone number in the transport's expected format
    pub phone: String,
    /// Whether this contact currently receives notifications
    pub enabled: bool,
}

impl Contact {
    /// Create an enabled contact
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: ContactId::new(),
            name: name.into(),
            phone: phone.into(),
            enabled: true,
        }
    }
}

/// A resolved device location attached to dispatched alerts
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocationInfo {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Reverse-geocoded address, when available
    pub address: Option<String>,
}

impl LocationInfo {
    /// Create a location from coordinates
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
        }
    }

    /// Attach a reverse-geocoded address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

impl std::fmt::Display for LocationInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.address {
            Some(addr) => write!(f, "{} ({:.5}, {:.5})", addr, self.latitude, self.longitude),
            None => write!(f, "({:.5}, {:.5})", self.latitude, self.longitude),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_enabled_by_default() {
        let contact = Contact::new("Alice", "+15550100");
        assert!(contact.enabled);
        assert_eq!(contact.name, "Alice");
    }

    #[test]
    fn test_location_display_with_address() {
        let location = LocationInfo::new(59.3293, 18.0686).with_address("Stockholm");
        let rendered = location.to_string();
        assert!(rendered.starts_with("Stockholm"));
        assert!(rendered.contains("59.32930"));
    }
}
