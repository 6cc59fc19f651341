//! Tempo Sync - match a recording's tempo to a reference BPM
//!
//! This library estimates the tempo of an audio buffer (from taps or by
//! analysis), computes how far it is from a reference tempo, and applies a
//! pitch-preserving time-stretch so the two line up.

pub mod config;
pub mod decode;
pub mod error;
pub mod input;
pub mod model;
pub mod playback;
pub mod session;
pub mod stretch;
pub mod tempo;

pub use config::SyncConfig;
pub use error::{DeviceError, Result, SyncError};
pub use model::{AudioBuffer, TempoEstimate, TempoSource};
pub use playback::{PlaybackController, PlaybackState};
pub use session::{CorrectionSession, SessionState};
pub use stretch::{PhaseVocoderStretcher, StretchConfig};
