//! Fixed-capacity ring buffer of motion samples with rolling statistics.

use std::collections::VecDeque;

use crate::domain::MotionSample;

/// Fraction of samples trimmed from each tail when computing the baseline.
const TRIM_FRACTION: f64 = 0.1;

/// Minimum samples before trimming is applied; below this a plain mean is used.
const MIN_TRIMMED_SAMPLES: usize = 4;

/// Fixed-capacity ring buffer of timestamped motion samples.
///
/// Overflow is defined behavior: pushing beyond capacity evicts the
/// oldest sample. The buffer also answers the rolling-baseline query
/// consumed by the impact classifier.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: VecDeque<MotionSample>,
    capacity: usize,
}

impl SampleBuffer {
    /// Create a buffer holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Append a sample, evicting the oldest beyond capacity.
    pub fn push(&mut self, sample: MotionSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<&MotionSample> {
        self.samples.back()
    }

    /// Trimmed rolling mean of acceleration magnitudes (g).
    ///
    /// Drops the top and bottom 10 % of magnitudes before averaging so
    /// transient spikes do not drag the baseline toward themselves.
    /// Falls back to a plain mean for very short windows, and to the
    /// resting-gravity value of 1 g when the buffer is empty.
    pub fn baseline(&self) -> f64 {
        if self.samples.is_empty() {
            return 1.0;
        }

        let mut magnitudes: Vec<f64> = self
            .samples
            .iter()
            .map(MotionSample::accel_magnitude)
            .collect();

        if magnitudes.len() < MIN_TRIMMED_SAMPLES {
            return magnitudes.iter().sum::<f64>() / magnitudes.len() as f64;
        }

        magnitudes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let trim = (magnitudes.len() as f64 * TRIM_FRACTION).floor() as usize;
        let kept = &magnitudes[trim..magnitudes.len() - trim];

        kept.iter().sum::<f64>() / kept.len() as f64
    }
}
