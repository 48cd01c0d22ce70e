//! Impact classifier: baseline deviation with gyroscope corroboration.

use std::time::Duration;

use crate::domain::MotionSample;

use super::Detection;

/// Configuration for the impact classifier
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ImpactClassifierConfig {
    /// Minimum deviation from the rolling baseline to qualify (g)
    pub impact_threshold_g: f64,
    /// Minimum gyroscope magnitude proving the device itself moved (deg/s)
    pub gyro_movement_threshold: f64,
    /// Consecutive qualifying samples required before emitting
    pub confirmation_count: u32,
    /// Quiet period after an emission during which samples are ignored
    pub cooldown: Duration,
}

impl Default for ImpactClassifierConfig {
    fn default() -> Self {
        Self {
            impact_threshold_g: 15.0,
            gyro_movement_threshold: 0.1,
            confirmation_count: 3,
            cooldown: Duration::from_millis(2000),
        }
    }
}

/// Streaming classifier detecting severe impacts.
///
/// Independent of the fall classifier and run concurrently over the same
/// stream. A sample qualifies only when the magnitude deviates from the
/// buffer's rolling baseline *and* the gyroscope shows real device
/// movement; a lone accelerometer spike with a still gyroscope is read
/// as sensor noise. Requiring several consecutive qualifying samples
/// debounces single-sample glitches, and a local cooldown keeps one
/// physical event from emitting twice.
#[derive(Debug)]
pub struct ImpactClassifier {
    config: ImpactClassifierConfig,
    consecutive_high_readings: u32,
    cooldown_until: Option<Duration>,
}

impl ImpactClassifier {
    /// Create a classifier with zeroed counters.
    pub fn new(config: ImpactClassifierConfig) -> Self {
        Self {
            config,
            consecutive_high_readings: 0,
            cooldown_until: None,
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ImpactClassifierConfig::default())
    }

    /// Advance the classifier with a new sample and the current rolling
    /// baseline from the sample buffer.
    ///
    /// Returns `Some(Detection::Impact)` exactly once per confirmed
    /// impact; further emissions are suppressed for the cooldown period.
    pub fn on_sample(&mut self, sample: &MotionSample, baseline: f64) -> Option<Detection> {
        let ts = sample.timestamp;

        if let Some(until) = self.cooldown_until {
            if ts < until {
                return None;
            }
            self.cooldown_until = None;
        }

        let delta = (sample.accel_magnitude() - baseline).abs();
        let device_moved = sample.gyro_magnitude() > self.config.gyro_movement_threshold;

        if delta > self.config.impact_threshold_g && device_moved {
            self.consecutive_high_readings += 1;
        } else {
            self.consecutive_high_readings = 0;
            return None;
        }

        if self.consecutive_high_readings >= self.config.confirmation_count {
            tracing::debug!(
                delta_g = delta,
                readings = self.consecutive_high_readings,
                "impact confirmed"
            );
            self.consecutive_high_readings = 0;
            self.cooldown_until = Some(ts + self.config.cooldown);
            return Some(Detection::Impact { at: ts, peak_g: delta });
        }

        None
    }

    /// Current configuration.
    pub fn config(&self) -> &ImpactClassifierConfig {
        &self.config
    }

    /// Clear counters and any pending cooldown.
    pub fn reset(&mut self) {
        self.consecutive_high_readings = 0;
        self.cooldown_until = None;
    }
}
