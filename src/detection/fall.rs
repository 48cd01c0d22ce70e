//! Two-phase fall classifier: free-fall candidate, then impact confirmation.
//!
//! A fall reads as a drop in acceleration magnitude toward zero (the
//! device falling unsupported) followed shortly by a sharp spike (the
//! landing). Requiring both stages, in order and inside tight windows,
//! is what separates a genuine fall from ordinary high-acceleration
//! motion such as running.

use std::time::Duration;

use crate::domain::MotionSample;

use super::Detection;

/// Configuration for the fall classifier
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FallClassifierConfig {
    /// Magnitude below which a sample counts as free fall (g)
    pub free_fall_threshold_g: f64,
    /// How long free fall must be sustained before an impact is expected
    pub free_fall_duration: Duration,
    /// Magnitude above which a sample confirms the landing impact (g)
    pub impact_threshold_g: f64,
    /// How long after free fall the confirming impact may arrive
    pub impact_window: Duration,
}

impl Default for FallClassifierConfig {
    fn default() -> Self {
        Self {
            free_fall_threshold_g: 0.5,
            free_fall_duration: Duration::from_millis(300),
            impact_threshold_g: 2.5,
            impact_window: Duration::from_millis(300),
        }
    }
}

/// Phase of the fall state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallPhase {
    /// Watching for the magnitude to drop below the free-fall threshold
    Monitoring,
    /// Magnitude dropped; timing how long the drop is sustained
    FreeFallCandidate { since: Duration },
    /// Free fall sustained; watching for the landing spike
    ImpactWindow { since: Duration },
}

/// Streaming classifier detecting falls from the sample stream.
///
/// One instance per monitoring context; never shared. All timing is
/// taken from sample timestamps, not the wall clock.
#[derive(Debug)]
pub struct FallClassifier {
    config: FallClassifierConfig,
    phase: FallPhase,
}

impl FallClassifier {
    /// Create a classifier in the `Monitoring` phase.
    pub fn new(config: FallClassifierConfig) -> Self {
        Self {
            config,
            phase: FallPhase::Monitoring,
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FallClassifierConfig::default())
    }

    /// Advance the state machine with a new sample.
    ///
    /// Returns `Some(Detection::Fall)` exactly once per detected fall.
    pub fn on_sample(&mut self, sample: &MotionSample) -> Option<Detection> {
        let magnitude = sample.accel_magnitude();
        let ts = sample.timestamp;

        match self.phase {
            FallPhase::Monitoring => {
                if magnitude < self.config.free_fall_threshold_g {
                    self.phase = FallPhase::FreeFallCandidate { since: ts };
                }
                None
            }

            FallPhase::FreeFallCandidate { since } => {
                let elapsed = ts.saturating_sub(since);

                if magnitude < self.config.free_fall_threshold_g {
                    // Still falling; once the drop has been sustained long
                    // enough, start watching for the landing.
                    if elapsed >= self.config.free_fall_duration {
                        self.phase = FallPhase::ImpactWindow { since: ts };
                    }
                    return None;
                }

                if elapsed >= self.config.free_fall_duration {
                    // Magnitude recovered after a sustained drop. The
                    // recovering sample itself may already be the impact.
                    self.phase = FallPhase::ImpactWindow { since: ts };
                    return self.check_impact(magnitude, ts, ts);
                }

                // Transient dip, not a fall
                self.phase = FallPhase::Monitoring;
                None
            }

            FallPhase::ImpactWindow { since } => {
                if ts.saturating_sub(since) > self.config.impact_window {
                    self.phase = FallPhase::Monitoring;
                    return None;
                }
                self.check_impact(magnitude, ts, since)
            }
        }
    }

    fn check_impact(&mut self, magnitude: f64, ts: Duration, since: Duration) -> Option<Detection> {
        if magnitude > self.config.impact_threshold_g {
            tracing::debug!(
                peak_g = magnitude,
                window_ms = ts.saturating_sub(since).as_millis() as u64,
                "fall confirmed by landing impact"
            );
            self.phase = FallPhase::Monitoring;
            Some(Detection::Fall {
                at: ts,
                peak_g: magnitude,
            })
        } else {
            None
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &FallClassifierConfig {
        &self.config
    }

    /// Drop any in-progress candidate and return to `Monitoring`.
    pub fn reset(&mut self) {
        self.phase = FallPhase::Monitoring;
    }
}
