use crate::error::{Result, SyncError};
use std::fmt;

/// Where a tempo estimate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoSource {
    /// Averaged from tap timestamps
    Tap,

    /// Detected from audio content
    Audio,

    /// Entered by hand
    Manual,
}

impl fmt::Display for TempoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TempoSource::Tap => "tap",
            TempoSource::Audio => "audio",
            TempoSource::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// A tempo estimate with its provenance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    /// Beats per minute, always finite and > 0
    bpm: f64,

    source: TempoSource,

    /// Detector confidence (0.0-1.0) when the producer reports one
    confidence: Option<f32>,
}

impl TempoEstimate {
    /// Create an estimate, rejecting non-positive or non-finite BPM
    pub fn new(bpm: f64, source: TempoSource) -> Result<Self> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(SyncError::invalid_input(format!(
                "BPM must be a positive number, got {}",
                bpm
            )));
        }

        Ok(Self {
            bpm,
            source,
            confidence: None,
        })
    }

    /// Shorthand for a hand-entered tempo
    pub fn manual(bpm: f64) -> Result<Self> {
        Self::new(bpm, TempoSource::Manual)
    }

    /// Attach a confidence score (clamped to 0.0-1.0)
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn source(&self) -> TempoSource {
        self.source
    }

    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_bpm() {
        assert!(TempoEstimate::manual(0.0).is_err());
        assert!(TempoEstimate::manual(-120.0).is_err());
        assert!(TempoEstimate::manual(f64::NAN).is_err());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let estimate = TempoEstimate::new(128.0, TempoSource::Audio)
            .unwrap()
            .with_confidence(1.7);
        assert_eq!(estimate.confidence(), Some(1.0));
        assert_eq!(estimate.source(), TempoSource::Audio);
    }
}
