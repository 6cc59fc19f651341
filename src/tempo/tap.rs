//! Tap tempo estimation
//!
//! Converts an ordered sequence of tap timestamps (seconds) into a BPM
//! estimate: `bpm = 60 / average_interval`.

use crate::error::{Result, SyncError};
use crate::model::{TempoEstimate, TempoSource};

/// Minimum taps needed to form one interval
pub const MIN_TAPS: usize = 2;

/// How inter-tap intervals are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntervalAverage {
    /// Arithmetic mean of all intervals. Outliers (double presses, missed
    /// beats) pull the estimate.
    #[default]
    Mean,

    /// Median interval. A single double press or missed beat does not move
    /// the estimate, at the cost of ignoring gradual tempo drift.
    Median,
}

/// Estimates tempo from tap timestamps
#[derive(Debug, Clone, Copy, Default)]
pub struct TapTempoEstimator {
    average: IntervalAverage,
}

impl TapTempoEstimator {
    /// Mean-interval estimator
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimator using the given interval average
    pub fn with_average(average: IntervalAverage) -> Self {
        Self { average }
    }

    /// Estimate BPM from ordered timestamps in seconds
    ///
    /// Two taps are the minimum; four or more give a usable average.
    pub fn estimate(&self, taps: &[f64]) -> Result<TempoEstimate> {
        if taps.len() < MIN_TAPS {
            return Err(SyncError::InsufficientData(format!(
                "need at least {} taps, got {}",
                MIN_TAPS,
                taps.len()
            )));
        }
        if taps.len() < 4 {
            log::warn!("Only {} taps; the estimate may be unstable", taps.len());
        }

        let mut intervals: Vec<f64> = taps.windows(2).map(|w| w[1] - w[0]).collect();

        let interval = match self.average {
            IntervalAverage::Mean => intervals.iter().sum::<f64>() / intervals.len() as f64,
            IntervalAverage::Median => {
                intervals.sort_by(|a, b| a.total_cmp(b));
                let mid = intervals.len() / 2;
                if intervals.len() % 2 == 0 {
                    (intervals[mid - 1] + intervals[mid]) / 2.0
                } else {
                    intervals[mid]
                }
            }
        };

        if !interval.is_finite() || interval <= 0.0 {
            return Err(SyncError::invalid_input(format!(
                "tap interval must be positive, got {:.4}s",
                interval
            )));
        }

        let bpm = 60.0 / interval;
        log::debug!(
            "Tap tempo: {} taps, {:?} interval {:.4}s -> {:.2} BPM",
            taps.len(),
            self.average,
            interval,
            bpm
        );

        TempoEstimate::new(bpm, TempoSource::Tap)
    }
}
