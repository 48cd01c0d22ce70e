//! Detection module: sample buffering and streaming classifiers.
//!
//! Each monitoring context owns private instances of everything here;
//! nothing in this module is shared between contexts, so no locking is
//! needed. Detections flow out to the shared emergency coordinator.

mod buffer;
mod fall;
mod impact;
mod monitor;

pub use buffer::SampleBuffer;
pub use fall::{FallClassifier, FallClassifierConfig};
pub use impact::{ImpactClassifier, ImpactClassifierConfig};
pub use monitor::{MonitorContext, MonitorSession};

use std::time::Duration;

use crate::domain::AlertType;

/// A terminal classifier emission, fed to the emergency coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    /// Free fall followed by a confirming landing impact
    Fall {
        /// Sample timestamp at which the fall was confirmed
        at: Duration,
        /// Magnitude of the confirming sample (g)
        peak_g: f64,
    },
    /// Baseline deviation confirmed over consecutive samples
    Impact {
        /// Sample timestamp at which the impact was confirmed
        at: Duration,
        /// Peak deviation from the rolling baseline (g)
        peak_g: f64,
    },
}

impl Detection {
    /// Alert type a detection maps to when triggering the coordinator
    pub fn alert_type(&self) -> AlertType {
        match self {
            Detection::Fall { .. } => AlertType::Fall,
            Detection::Impact { .. } => AlertType::Impact,
        }
    }

    /// Sample timestamp of the detection
    pub fn at(&self) -> Duration {
        match self {
            Detection::Fall { at, .. } => *at,
            Detection::Impact { at, .. } => *at,
        }
    }
}
