//! Data model shared by estimation, stretching and playback
//!
//! These types are independent of where audio comes from (file, microphone)
//! and where it goes (device, tests).

mod buffer;
mod tempo;

pub use buffer::AudioBuffer;
pub use tempo::{TempoEstimate, TempoSource};
