//! Detector that reports a fixed tempo
//!
//! Used when the tempo is already known (entered with `--bpm`) and in tests.

use super::traits::TempoDetector;
use crate::error::Result;
use crate::model::TempoEstimate;

/// Detector that ignores the audio and returns a preset BPM
#[derive(Debug, Clone, Copy)]
pub struct ManualDetector {
    estimate: TempoEstimate,
}

impl ManualDetector {
    pub fn new(bpm: f64) -> Result<Self> {
        Ok(Self {
            estimate: TempoEstimate::manual(bpm)?,
        })
    }
}

impl TempoDetector for ManualDetector {
    fn detect(&self, samples: &[f32], sample_rate: u32) -> Result<TempoEstimate> {
        log::debug!(
            "Manual detector: {} samples at {}Hz -> {:.1} BPM",
            samples.len(),
            sample_rate,
            self.estimate.bpm()
        );
        Ok(self.estimate)
    }
}
