//! Error taxonomy for tempo correction
//!
//! Every core operation returns an explicit [`Result`]; nothing is
//! silently defaulted. Device failures are carried through unchanged.

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised by tempo estimation, stretching, sessions and playback
#[derive(Debug, Error)]
pub enum SyncError {
    /// Not enough input to compute anything (e.g. fewer than two taps)
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A value was out of range (non-positive BPM, zero sample rate, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation needed audio but none is loaded
    #[error("no audio loaded")]
    NoAudioLoaded,

    /// Stretch rate was zero, negative or not finite
    #[error("invalid stretch rate: {0}")]
    InvalidRate(f64),

    /// Operation invoked out of sequence; names the missing field
    #[error("invalid state: {missing} is not set")]
    InvalidState { missing: &'static str },

    /// The audio device is already playing or recording
    #[error("audio device busy ({0})")]
    Busy(&'static str),

    /// Error reported by the audio device
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The tempo detector could not produce an estimate
    #[error("tempo detection failed: {0}")]
    Detection(String),

    /// Reading tap input failed
    #[error("input error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by an [`AudioDevice`](crate::playback::AudioDevice)
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    /// No usable input or output device
    #[error("audio device unavailable: {0}")]
    Unavailable(String),

    /// The device does not accept the requested stream format
    #[error("unsupported stream format: {0}")]
    Unsupported(String),

    /// Building or running the stream failed
    #[error("audio stream error: {0}")]
    Stream(String),
}

impl SyncError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        SyncError::InvalidInput(msg.into())
    }
}
