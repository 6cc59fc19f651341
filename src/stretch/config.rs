//! Phase vocoder frame configuration

use crate::error::{Result, SyncError};

/// Default analysis frame size in samples
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// Smallest frame size accepted
const MIN_FRAME_SIZE: usize = 16;

/// Frame and hop sizes for the phase vocoder
///
/// The hop is always a quarter frame (75% overlap) and is used for both
/// analysis and synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StretchConfig {
    frame_size: usize,
    hop_size: usize,
}

impl StretchConfig {
    /// Create a configuration; `frame_size` must be a power of two >= 16
    pub fn new(frame_size: usize) -> Result<Self> {
        if frame_size < MIN_FRAME_SIZE || !frame_size.is_power_of_two() {
            return Err(SyncError::invalid_input(format!(
                "frame size must be a power of two >= {}, got {}",
                MIN_FRAME_SIZE, frame_size
            )));
        }

        Ok(Self {
            frame_size,
            hop_size: frame_size / 4,
        })
    }

    /// Analysis frame size (FFT length)
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Hop between consecutive frames
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Number of frequency bins per frame (`frame_size / 2 + 1`)
    pub fn bins(&self) -> usize {
        self.frame_size / 2 + 1
    }
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_FRAME_SIZE / 4,
        }
    }
}
