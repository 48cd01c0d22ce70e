//! Motion sample value objects.

use std::time::Duration;

/// A single timestamped 3-axis accelerometer + gyroscope reading.
///
/// Timestamps are monotonic offsets from the start of the owning
/// monitoring session, so classifier timing is driven entirely by the
/// sample stream and stays deterministic under test.
///
/// Acceleration is expressed in g (1.0 = resting gravity), angular
/// velocity in degrees per second.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MotionSample {
    /// Monotonic timestamp relative to session start
    pub timestamp: Duration,
    /// Acceleration X axis (g)
    pub ax: f64,
    /// Acceleration Y axis (g)
    pub ay: f64,
    /// Acceleration Z axis (g)
    pub az: f64,
    /// Angular velocity X axis (deg/s)
    pub gx: f64,
    /// Angular velocity Y axis (deg/s)
    pub gy: f64,
    /// Angular velocity Z axis (deg/s)
    pub gz: f64,
}

impl MotionSample {
    /// Create a sample from accelerometer and gyroscope triples.
    pub fn new(timestamp: Duration, accel: (f64, f64, f64), gyro: (f64, f64, f64)) -> Self {
        Self {
            timestamp,
            ax: accel.0,
            ay: accel.1,
            az: accel.2,
            gx: gyro.0,
            gy: gyro.1,
            gz: gyro.2,
        }
    }

    /// Create an accelerometer-only sample (gyroscope axes zeroed).
    pub fn accel_only(timestamp: Duration, ax: f64, ay: f64, az: f64) -> Self {
        Self::new(timestamp, (ax, ay, az), (0.0, 0.0, 0.0))
    }

    /// Euclidean magnitude of the acceleration vector (g).
    pub fn accel_magnitude(&self) -> f64 {
        (self.ax * self.ax + self.ay * self.ay + self.az * self.az).sqrt()
    }

    /// Euclidean magnitude of the angular velocity vector (deg/s).
    pub fn gyro_magnitude(&self) -> f64 {
        (self.gx * self.gx + self.gy * self.gy + self.gz * self.gz).sqrt()
    }
}
