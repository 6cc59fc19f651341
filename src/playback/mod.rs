//! Audio device access
//!
//! One physical device is shared by playback and recording. The
//! [`PlaybackController`] serializes every start/stop through a single lock;
//! the device itself sits behind the [`AudioDevice`] trait.

mod controller;
#[cfg(feature = "cpal")]
mod cpal_device;
mod device;

pub use controller::{PlaybackController, PlaybackState, RecordingTask};
#[cfg(feature = "cpal")]
pub use cpal_device::CpalDevice;
pub use device::{AudioDevice, NullDevice, StopSignal};
