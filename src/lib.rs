//! # fallsentry
//!
//! Continuous fall and impact detection over 3-axis motion-sensor
//! streams, coordinating a time-boxed emergency-response lifecycle:
//! local alerting, a cancellable countdown, notification dispatch, and
//! post-event guard/cooldown windows.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        fallsentry                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐      ┌──────────────┐   │
//! │  │ Detection  │   │ Detection  │      │   Alerting   │   │
//! │  │(foreground)│   │(background)│      │ local+dispatch│  │
//! │  └─────┬──────┘   └─────┬──────┘      └──────▲───────┘   │
//! │        └────────┬───────┘                    │           │
//! │                 ▼                            │           │
//! │        ┌─────────────────┐                   │           │
//! │        │    Emergency    ├───────────────────┘           │
//! │        │   Coordinator   │                               │
//! │        └─────────────────┘                               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Two monitoring contexts run the same classifiers on private state;
//! the coordinator is the only shared mutable resource and serializes
//! every lifecycle transition, so concurrent triggers, cancellations,
//! and timer expiries resolve to exactly one net effect.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fallsentry::{
//!     SentryConfig, EmergencyCoordinator, MonitorSession, MonitorContext,
//!     LocalAlertOrchestrator, DispatchGate, StaticContactProvider,
//!     InMemoryHistory, Contact,
//! };
//! use fallsentry::providers::NotificationTransport;
//!
//! # async fn run(transport: Arc<dyn NotificationTransport>) {
//! let config = SentryConfig::builder()
//!     .countdown_secs(30)
//!     .cooldown_secs(5 * 60)
//!     .build();
//!
//! let contacts = Arc::new(StaticContactProvider::new(vec![
//!     Contact::new("Alice", "+15550100"),
//! ]));
//! let gate = Arc::new(DispatchGate::new(config.dispatch.clone(), contacts, transport));
//! let orchestrator = Arc::new(LocalAlertOrchestrator::with_log_channels());
//! let history = Arc::new(InMemoryHistory::new());
//!
//! let coordinator = EmergencyCoordinator::new(
//!     config.coordinator.clone(),
//!     orchestrator,
//!     gate,
//!     history,
//! );
//!
//! let mut session = MonitorSession::new(
//!     MonitorContext::Foreground,
//!     &config,
//!     Arc::clone(&coordinator),
//! );
//! # let _ = session;
//! # }
//! ```

#![warn(missing_docs)]

pub mod alerting;
pub mod detection;
pub mod domain;
pub mod emergency;
pub mod providers;

// Re-export main types
pub use alerting::{
    AlertChannel, DispatchConfig, DispatchGate, DispatchOutcome, LocalAlertOrchestrator,
    LogAlertChannel,
};
pub use detection::{
    Detection, FallClassifier, FallClassifierConfig, ImpactClassifier, ImpactClassifierConfig,
    MonitorContext, MonitorSession, SampleBuffer,
};
pub use domain::{
    AlertId, AlertStatus, AlertType, Contact, ContactId, EmergencyAlert, EmergencyEvent,
    LocationInfo, MotionSample, Severity, TriggerSource,
};
pub use emergency::{
    CoordinatorConfig, CoordinatorStatus, EmergencyCoordinator, RejectReason, TriggerOutcome,
};
pub use providers::{
    AlertHistorySink, ContactProvider, InMemoryHistory, NotificationTransport,
    StaticContactProvider, TransportError,
};

use std::time::Duration;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for fallsentry operations
pub type Result<T> = std::result::Result<T, SentryError>;

/// Unified error type for fallsentry operations
#[derive(Debug, thiserror::Error)]
pub enum SentryError {
    /// A local alert channel failed to start or stop
    #[error("alert channel error: {0}")]
    Channel(String),

    /// Notification transport failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Alert history sink failure
    #[error("history error: {0}")]
    History(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Top-level configuration for the whole system.
///
/// Every numeric policy value is an input here; nothing is hard-coded
/// in the components. Intended to be rebuilt between monitoring
/// sessions when settings change.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SentryConfig {
    /// Sample buffer capacity per monitoring context
    pub buffer_size: usize,
    /// Fall classifier thresholds and windows
    pub fall: FallClassifierConfig,
    /// Impact classifier thresholds and counters
    pub impact: ImpactClassifierConfig,
    /// Coordinator countdown and window durations
    pub coordinator: CoordinatorConfig,
    /// Dispatch retry and segmentation policy
    pub dispatch: DispatchConfig,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            fall: FallClassifierConfig::default(),
            impact: ImpactClassifierConfig::default(),
            coordinator: CoordinatorConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl SentryConfig {
    /// Create a new configuration builder
    pub fn builder() -> SentryConfigBuilder {
        SentryConfigBuilder::default()
    }
}

/// Builder for [`SentryConfig`]
#[derive(Debug, Default)]
pub struct SentryConfigBuilder {
    config: SentryConfig,
}

impl SentryConfigBuilder {
    /// Set the sample buffer capacity
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size.max(1);
        self
    }

    /// Set the free-fall threshold in g
    pub fn free_fall_threshold_g(mut self, threshold: f64) -> Self {
        self.config.fall.free_fall_threshold_g = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the fall-confirming impact threshold in g
    pub fn fall_impact_threshold_g(mut self, threshold: f64) -> Self {
        self.config.fall.impact_threshold_g = threshold.max(0.0);
        self
    }

    /// Set the impact classifier's baseline-deviation threshold in g
    pub fn impact_threshold_g(mut self, threshold: f64) -> Self {
        self.config.impact.impact_threshold_g = threshold.max(0.0);
        self
    }

    /// Set the consecutive confirmations required for an impact
    pub fn impact_confirmation_count(mut self, count: u32) -> Self {
        self.config.impact.confirmation_count = count.max(1);
        self
    }

    /// Set the countdown duration in seconds
    pub fn countdown_secs(mut self, secs: u64) -> Self {
        self.config.coordinator.countdown = Duration::from_secs(secs);
        self
    }

    /// Set the post-cancellation guard window
    pub fn guard_window(mut self, window: Duration) -> Self {
        self.config.coordinator.guard_window = window;
        self
    }

    /// Set the post-event cooldown in seconds
    pub fn cooldown_secs(mut self, secs: u64) -> Self {
        self.config.coordinator.cooldown = Duration::from_secs(secs);
        self
    }

    /// Set the maximum dispatch attempts
    pub fn dispatch_max_attempts(mut self, attempts: u32) -> Self {
        self.config.dispatch.max_attempts = attempts.max(1);
        self
    }

    /// Build the configuration
    pub fn build(self) -> SentryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SentryConfig::builder()
            .buffer_size(50)
            .countdown_secs(20)
            .cooldown_secs(600)
            .impact_confirmation_count(5)
            .build();

        assert_eq!(config.buffer_size, 50);
        assert_eq!(config.coordinator.countdown, Duration::from_secs(20));
        assert_eq!(config.coordinator.cooldown, Duration::from_secs(600));
        assert_eq!(config.impact.confirmation_count, 5);
    }

    #[test]
    fn test_builder_clamps_degenerate_values() {
        let config = SentryConfig::builder()
            .buffer_size(0)
            .free_fall_threshold_g(2.5)
            .impact_confirmation_count(0)
            .dispatch_max_attempts(0)
            .build();

        assert_eq!(config.buffer_size, 1);
        assert!((config.fall.free_fall_threshold_g - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.impact.confirmation_count, 1);
        assert_eq!(config.dispatch.max_attempts, 1);
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
