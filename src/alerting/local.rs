//! Local alert orchestration: audio, vibration, flashlight as one unit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;

use crate::SentryError;

/// A single local alerting capability (siren, vibration motor,
/// flashlight strobe) behind a uniform start/stop contract.
///
/// `start` and `stop` must tolerate repeated and out-of-order calls;
/// device APIs are not always synchronous, so `is_active` is consulted
/// after a stop to verify cessation.
#[async_trait::async_trait]
pub trait AlertChannel: Send + Sync {
    /// Channel name for logs
    fn name(&self) -> &str;

    /// Begin alerting on this channel
    async fn start(&self) -> Result<(), SentryError>;

    /// Stop alerting on this channel
    async fn stop(&self) -> Result<(), SentryError>;

    /// Whether the channel reports itself as currently alerting
    async fn is_active(&self) -> bool;
}

/// Fan-out/fan-in facade over the local alert channels.
///
/// `start()` and `stop()` are idempotent and safe to call concurrently
/// or before the other completes; one channel failing never blocks the
/// rest. `stop()` verifies each channel actually went quiet and retries
/// once per channel that reports itself still active.
pub struct LocalAlertOrchestrator {
    channels: Vec<Arc<dyn AlertChannel>>,
}

impl LocalAlertOrchestrator {
    /// Create an orchestrator over the given channels.
    pub fn new(channels: Vec<Arc<dyn AlertChannel>>) -> Self {
        Self { channels }
    }

    /// Create an orchestrator with logging placeholders for the three
    /// standard channels. Useful for wiring tests and headless runs.
    pub fn with_log_channels() -> Self {
        Self::new(vec![
            Arc::new(LogAlertChannel::new("audio")),
            Arc::new(LogAlertChannel::new("vibration")),
            Arc::new(LogAlertChannel::new("flashlight")),
        ])
    }

    /// Start all channels concurrently. Failures are logged and do not
    /// affect the other channels.
    pub async fn start(&self) {
        let results = join_all(self.channels.iter().map(|channel| async move {
            (channel.name().to_string(), channel.start().await)
        }))
        .await;

        for (name, result) in results {
            match result {
                Ok(()) => tracing::debug!(channel = %name, "alert channel started"),
                Err(error) => {
                    tracing::warn!(channel = %name, %error, "alert channel failed to start")
                }
            }
        }
    }

    /// Stop all channels concurrently, then verify cessation and retry
    /// once for any channel still reporting itself active.
    pub async fn stop(&self) {
        let results = join_all(self.channels.iter().map(|channel| async move {
            (channel.name().to_string(), channel.stop().await)
        }))
        .await;

        for (name, result) in results {
            if let Err(error) = result {
                tracing::warn!(channel = %name, %error, "alert channel failed to stop");
            }
        }

        // Post-stop verification pass
        for channel in &self.channels {
            if channel.is_active().await {
                tracing::warn!(
                    channel = %channel.name(),
                    "alert channel still active after stop, retrying"
                );
                if let Err(error) = channel.stop().await {
                    tracing::warn!(channel = %channel.name(), %error, "retry stop failed");
                }
                if channel.is_active().await {
                    tracing::warn!(
                        channel = %channel.name(),
                        "alert channel did not stop after retry"
                    );
                }
            }
        }
    }

    /// Whether any channel currently reports itself active.
    pub async fn any_active(&self) -> bool {
        for channel in &self.channels {
            if channel.is_active().await {
                return true;
            }
        }
        false
    }

    /// Number of managed channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl std::fmt::Debug for LocalAlertOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAlertOrchestrator")
            .field("channels", &self.channels.len())
            .finish()
    }
}

/// Logging placeholder channel. In production each channel wraps a real
/// device driver; this one just tracks its own state and logs.
#[derive(Debug)]
pub struct LogAlertChannel {
    name: &'static str,
    active: AtomicBool,
}

impl LogAlertChannel {
    /// Create a named placeholder channel
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            active: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl AlertChannel for LogAlertChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn start(&self) -> Result<(), SentryError> {
        self.active.store(true, Ordering::SeqCst);
        tracing::debug!(channel = self.name, "would start local alert");
        Ok(())
    }

    async fn stop(&self) -> Result<(), SentryError> {
        self.active.store(false, Ordering::SeqCst);
        tracing::debug!(channel = self.name, "would stop local alert");
        Ok(())
    }

    async fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Channel whose stop call silently fails to take effect a
    /// configurable number of times, mimicking asynchronous device APIs.
    struct StickyChannel {
        name: &'static str,
        active: AtomicBool,
        stops_to_ignore: AtomicBool,
    }

    impl StickyChannel {
        fn new(name: &'static str, ignore_first_stop: bool) -> Self {
            Self {
                name,
                active: AtomicBool::new(false),
                stops_to_ignore: AtomicBool::new(ignore_first_stop),
            }
        }
    }

    #[async_trait::async_trait]
    impl AlertChannel for StickyChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self) -> Result<(), SentryError> {
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<(), SentryError> {
            if self.stops_to_ignore.swap(false, Ordering::SeqCst) {
                // Stop reported success but the device kept going
                return Ok(());
            }
            self.active.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
    }

    struct FailingChannel;

    #[async_trait::async_trait]
    impl AlertChannel for FailingChannel {
        fn name(&self) -> &str {
            "broken"
        }

        async fn start(&self) -> Result<(), SentryError> {
            Err(SentryError::Channel("device not present".into()))
        }

        async fn stop(&self) -> Result<(), SentryError> {
            Err(SentryError::Channel("device not present".into()))
        }

        async fn is_active(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_start_stop_round_trip() {
        let orchestrator = LocalAlertOrchestrator::with_log_channels();

        orchestrator.start().await;
        assert!(orchestrator.any_active().await);

        orchestrator.stop().await;
        assert!(!orchestrator.any_active().await);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let orchestrator = LocalAlertOrchestrator::with_log_channels();

        orchestrator.start().await;
        orchestrator.stop().await;
        orchestrator.stop().await;
        assert!(!orchestrator.any_active().await);
    }

    #[tokio::test]
    async fn test_stop_before_start_is_safe() {
        let orchestrator = LocalAlertOrchestrator::with_log_channels();
        orchestrator.stop().await;
        assert!(!orchestrator.any_active().await);
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_others() {
        let orchestrator = LocalAlertOrchestrator::new(vec![
            Arc::new(FailingChannel),
            Arc::new(LogAlertChannel::new("audio")),
        ]);

        orchestrator.start().await;
        assert!(orchestrator.any_active().await);

        orchestrator.stop().await;
        assert!(!orchestrator.any_active().await);
    }

    #[tokio::test]
    async fn test_sticky_channel_stopped_on_retry() {
        let sticky = Arc::new(StickyChannel::new("vibration", true));
        let orchestrator = LocalAlertOrchestrator::new(vec![sticky.clone()]);

        orchestrator.start().await;
        assert!(sticky.is_active().await);

        // First stop is silently ignored by the device; the
        // verification pass must catch it and retry.
        orchestrator.stop().await;
        assert!(!sticky.is_active().await);
    }
}
