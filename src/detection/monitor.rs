//! Per-context monitoring session feeding the shared coordinator.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{MotionSample, TriggerSource};
use crate::emergency::{EmergencyCoordinator, TriggerOutcome};
use crate::SentryConfig;

use super::{FallClassifier, ImpactClassifier, SampleBuffer};

/// Which monitoring loop owns a session.
///
/// Foreground and background run the same classifiers independently;
/// the only shared resource between them is the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorContext {
    /// UI-attached monitoring loop
    Foreground,
    /// Unattended monitoring loop
    Background,
}

impl std::fmt::Display for MonitorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorContext::Foreground => write!(f, "foreground"),
            MonitorContext::Background => write!(f, "background"),
        }
    }
}

/// One monitoring context: a private sample buffer plus both
/// classifiers, forwarding detections to the shared coordinator.
///
/// Sessions own all their classifier state, so no locking happens on
/// the sample path; the coordinator serializes whatever the classifiers
/// emit.
pub struct MonitorSession {
    context: MonitorContext,
    buffer: SampleBuffer,
    fall: FallClassifier,
    impact: ImpactClassifier,
    coordinator: Arc<EmergencyCoordinator>,
}

impl MonitorSession {
    /// Create a session with classifier state built from `config`.
    pub fn new(
        context: MonitorContext,
        config: &SentryConfig,
        coordinator: Arc<EmergencyCoordinator>,
    ) -> Self {
        Self {
            context,
            buffer: SampleBuffer::new(config.buffer_size),
            fall: FallClassifier::new(config.fall.clone()),
            impact: ImpactClassifier::new(config.impact.clone()),
            coordinator,
        }
    }

    /// Feed one sample through both classifiers.
    ///
    /// Returns the coordinator's decision when a classifier emitted,
    /// `None` when the sample was unremarkable. Both classifiers see
    /// every sample regardless of what the other emits.
    pub async fn process(&mut self, sample: MotionSample) -> Option<TriggerOutcome> {
        self.buffer.push(sample);
        let baseline = self.buffer.baseline();

        let fall_detection = self.fall.on_sample(&sample);
        let impact_detection = self.impact.on_sample(&sample, baseline);

        let detection = fall_detection.or(impact_detection)?;
        tracing::info!(
            context = %self.context,
            kind = %detection.alert_type(),
            at_ms = detection.at().as_millis() as u64,
            "classifier emitted detection"
        );

        Some(
            self.coordinator
                .trigger(TriggerSource::Sensor, detection.alert_type())
                .await,
        )
    }

    /// Consume samples from a feed until the sender is dropped.
    pub async fn run(&mut self, mut samples: mpsc::Receiver<MotionSample>) {
        tracing::info!(context = %self.context, "monitoring session started");
        while let Some(sample) = samples.recv().await {
            self.process(sample).await;
        }
        tracing::info!(context = %self.context, "monitoring session ended");
    }

    /// Which context owns this session
    pub fn context(&self) -> MonitorContext {
        self.context
    }

    /// The session's private sample buffer
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }
}

impl std::fmt::Debug for MonitorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorSession")
            .field("context", &self.context)
            .field("buffered_samples", &self.buffer.len())
            .finish()
    }
}
