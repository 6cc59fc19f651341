//! Audio device trait and a hardware-free implementation

use crate::error::DeviceError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Stop request for one `play` or `record` call
///
/// The controller creates one per task before the task's thread is spawned,
/// so a stop issued at any point after the start is seen by the device.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the operation holding this signal to return
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A playback/capture device
///
/// `play` and `record` block until done or until `stop` is raised, which
/// they must notice promptly.
pub trait AudioDevice: Send + Sync {
    /// Play mono samples until exhausted or stopped
    fn play(&self, samples: &[f32], sample_rate: u32, stop: &StopSignal)
        -> Result<(), DeviceError>;

    /// Capture mono samples for `duration_secs`, or fewer if stopped early
    fn record(
        &self,
        duration_secs: f64,
        sample_rate: u32,
        stop: &StopSignal,
    ) -> Result<Vec<f32>, DeviceError>;
}

/// Granularity at which [`NullDevice`] notices a stop
const SLICE: Duration = Duration::from_millis(5);

/// Device with no hardware behind it
///
/// Playback takes the buffer's real duration and recording returns silence,
/// both interruptible. Used when no audio backend is compiled in and in
/// tests.
#[derive(Debug, Default)]
pub struct NullDevice {
    plays: AtomicUsize,
    recordings: AtomicUsize,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `play` calls so far
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    /// Number of `record` calls so far
    pub fn recordings(&self) -> usize {
        self.recordings.load(Ordering::SeqCst)
    }
}

/// Sleep up to `duration`; returns the time actually waited
fn wait(duration: Duration, stop: &StopSignal) -> Duration {
    let start = Instant::now();
    loop {
        let elapsed = start.elapsed();
        if stop.is_raised() {
            return elapsed;
        }
        if elapsed >= duration {
            return duration;
        }
        thread::sleep(SLICE.min(duration - elapsed));
    }
}

impl AudioDevice for NullDevice {
    fn play(
        &self,
        samples: &[f32],
        sample_rate: u32,
        stop: &StopSignal,
    ) -> Result<(), DeviceError> {
        if sample_rate == 0 {
            return Err(DeviceError::Unsupported("sample rate 0".to_string()));
        }
        self.plays.fetch_add(1, Ordering::SeqCst);

        let duration = Duration::from_secs_f64(samples.len() as f64 / sample_rate as f64);
        let played = wait(duration, stop);
        log::debug!(
            "Null device played {:.3}s of {:.3}s",
            played.as_secs_f64(),
            duration.as_secs_f64()
        );
        Ok(())
    }

    fn record(
        &self,
        duration_secs: f64,
        sample_rate: u32,
        stop: &StopSignal,
    ) -> Result<Vec<f32>, DeviceError> {
        if sample_rate == 0 {
            return Err(DeviceError::Unsupported("sample rate 0".to_string()));
        }
        self.recordings.fetch_add(1, Ordering::SeqCst);

        let recorded = wait(Duration::from_secs_f64(duration_secs.max(0.0)), stop);
        let len = (recorded.as_secs_f64() * sample_rate as f64).round() as usize;
        Ok(vec![0.0; len])
    }
}
