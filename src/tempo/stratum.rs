//! Tempo detection using stratum-dsp
//!
//! Runs stratum-dsp's tempo analysis over an in-memory mono buffer and
//! folds the result into a plausible BPM range.

use super::traits::TempoDetector;
use crate::error::{Result, SyncError};
use crate::model::{TempoEstimate, TempoSource};
use stratum_dsp::{analyze_audio, AnalysisConfig};

/// Tempo detector backed by stratum-dsp
#[derive(Debug, Clone)]
pub struct StratumDetector {
    /// Minimum BPM for detection range
    min_bpm: f32,
    /// Maximum BPM for detection range
    max_bpm: f32,
}

impl StratumDetector {
    pub fn new() -> Self {
        Self {
            min_bpm: 70.0,
            max_bpm: 170.0,
        }
    }

    /// Create detector with custom BPM range
    pub fn with_bpm_range(mut self, min: f32, max: f32) -> Self {
        self.min_bpm = min;
        self.max_bpm = max;
        self
    }
}

impl Default for StratumDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TempoDetector for StratumDetector {
    fn detect(&self, samples: &[f32], sample_rate: u32) -> Result<TempoEstimate> {
        log::debug!(
            "Analyzing {} samples ({:.1}s) at {}Hz with stratum-dsp",
            samples.len(),
            samples.len() as f32 / sample_rate.max(1) as f32,
            sample_rate
        );

        if sample_rate == 0 || samples.len() < sample_rate as usize {
            return Err(SyncError::Detection(
                "audio too short for tempo analysis (need at least 1s)".to_string(),
            ));
        }

        let result = analyze_audio(samples, sample_rate, AnalysisConfig::default())
            .map_err(|e| SyncError::Detection(format!("{:?}", e)))?;

        let bpm = fold_into_range(result.bpm, self.min_bpm, self.max_bpm);
        if bpm.is_nan() || bpm <= 0.0 {
            return Err(SyncError::Detection("could not detect BPM".to_string()));
        }

        log::info!(
            "Detected BPM: {:.1} (confidence: {:.2})",
            bpm,
            result.bpm_confidence
        );

        Ok(TempoEstimate::new(bpm as f64, TempoSource::Audio)?
            .with_confidence(result.bpm_confidence))
    }
}

/// Double or halve a BPM until it falls inside `[min_bpm, max_bpm]`
///
/// Leaves the value alone when no octave of it fits or the range is unset.
fn fold_into_range(bpm: f32, min_bpm: f32, max_bpm: f32) -> f32 {
    if bpm <= 0.0 || min_bpm <= 0.0 || max_bpm <= 0.0 {
        return bpm;
    }

    let octave = |b: &f32| {
        if *b < min_bpm && b * 2.0 <= max_bpm {
            Some(b * 2.0)
        } else if *b > max_bpm && b / 2.0 >= min_bpm {
            Some(b / 2.0)
        } else {
            None
        }
    };
    let folded = std::iter::successors(Some(bpm), octave)
        .last()
        .unwrap_or(bpm);

    if folded != bpm {
        log::debug!(
            "BPM folded from {:.1} to {:.1} (range {}-{})",
            bpm,
            folded,
            min_bpm,
            max_bpm
        );
    }
    folded
}
