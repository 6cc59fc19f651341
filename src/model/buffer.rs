use crate::error::{Result, SyncError};
use std::sync::Arc;

/// Mono audio held in immutable shared storage
///
/// Buffers are replaced wholesale, never edited in place, so cloning one is
/// just a reference-count bump. Playback tasks keep their own clone.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Sample data, nominally in [-1.0, 1.0]
    samples: Arc<[f32]>,

    /// Samples per second
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from owned samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SyncError::invalid_input("sample rate must be positive"));
        }

        Ok(Self {
            samples: samples.into(),
            sample_rate,
        })
    }

    /// Sample data
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Shared handle to the sample data
    pub fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Root-mean-square level over the whole buffer (0.0 when empty)
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / self.samples.len() as f64).sqrt() as f32
    }
}
