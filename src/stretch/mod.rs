//! Pitch-preserving time-stretch
//!
//! A phase vocoder that rescales the time axis of a mono buffer by a single
//! uniform rate (`output_duration = input_duration / rate`).

mod config;
mod vocoder;

pub use config::StretchConfig;
pub use vocoder::{PhaseVocoderStretcher, MAX_STRETCH};
