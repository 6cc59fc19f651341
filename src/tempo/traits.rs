//! Tempo detector trait

use crate::error::Result;
use crate::model::TempoEstimate;

/// Tempo detector - allows swapping between real analysis and fixed values
pub trait TempoDetector: Send + Sync {
    /// Estimate the tempo of mono samples at the given sample rate
    fn detect(&self, samples: &[f32], sample_rate: u32) -> Result<TempoEstimate>;
}

impl<T: TempoDetector + ?Sized> TempoDetector for Box<T> {
    fn detect(&self, samples: &[f32], sample_rate: u32) -> Result<TempoEstimate> {
        (**self).detect(samples, sample_rate)
    }
}
