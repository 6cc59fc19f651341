//! Serialized access to the audio device
//!
//! At most one of playback or recording runs at a time. Starting either
//! while the other is active fails with `Busy`; callers must `stop()` first.
//!
//! Every start bumps a generation counter. A background task only moves the
//! state back to `Idle` if the generation is still its own, so a `stop()`
//! racing a natural completion produces exactly one transition.
//!
//! Each task gets its own [`StopSignal`], created under the lock before the
//! thread is spawned. `stop()` raises it under the same lock, so the request
//! reaches the device even if the thread has not started running yet.

use super::device::{AudioDevice, StopSignal};
use crate::config::DEFAULT_SAMPLE_RATE;
use crate::error::{DeviceError, Result, SyncError};
use crate::model::AudioBuffer;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// What the device is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Recording,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Playing => "playing",
            PlaybackState::Recording => "recording",
        };
        f.write_str(name)
    }
}

/// State guarded by the controller's lock
struct Shared {
    state: PlaybackState,
    generation: u64,
    /// Stop request of the running task
    signal: Option<StopSignal>,
    playback: Option<JoinHandle<Result<()>>>,
}

/// Serializes play/record/stop against one [`AudioDevice`]
pub struct PlaybackController {
    device: Arc<dyn AudioDevice>,
    shared: Arc<Mutex<Shared>>,
    sample_rate: u32,
}

impl PlaybackController {
    /// Controller recording at the default sample rate (44.1 kHz)
    pub fn new(device: Arc<dyn AudioDevice>) -> Self {
        Self::with_sample_rate(device, DEFAULT_SAMPLE_RATE)
    }

    /// Controller recording at `sample_rate`
    pub fn with_sample_rate(device: Arc<dyn AudioDevice>, sample_rate: u32) -> Self {
        Self {
            device,
            shared: Arc::new(Mutex::new(Shared {
                state: PlaybackState::Idle,
                generation: 0,
                signal: None,
                playback: None,
            })),
            sample_rate,
        }
    }

    /// Sample rate used for recordings
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state
    }

    /// True while playing or recording
    pub fn is_active(&self) -> bool {
        self.state() != PlaybackState::Idle
    }

    /// Start playing `buffer` in the background
    pub fn start_playback(&self, buffer: &AudioBuffer) -> Result<()> {
        if buffer.is_empty() {
            return Err(SyncError::NoAudioLoaded);
        }

        let mut shared = self.shared.lock();
        check_idle(shared.state)?;

        shared.generation += 1;
        shared.state = PlaybackState::Playing;
        let generation = shared.generation;
        let signal = StopSignal::new();
        shared.signal = Some(signal.clone());
        let finished = shared.playback.take();

        let device = Arc::clone(&self.device);
        let state = Arc::clone(&self.shared);
        let samples = buffer.shared_samples();
        let sample_rate = buffer.sample_rate();

        let spawned = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                let result = device
                    .play(&samples, sample_rate, &signal)
                    .map_err(SyncError::from);
                if let Err(e) = &result {
                    log::warn!("Playback failed: {}", e);
                }
                finish(&state, generation, PlaybackState::Playing);
                result
            });

        match spawned {
            Ok(handle) => shared.playback = Some(handle),
            Err(e) => {
                shared.state = PlaybackState::Idle;
                shared.signal = None;
                return Err(SyncError::Io(e));
            }
        }
        drop(shared);

        log::info!(
            "Playback started: {:.1}s at {}Hz",
            buffer.duration_secs(),
            sample_rate
        );

        // The previous task already went idle; collect it
        if let Some(handle) = finished {
            reap(handle);
        }
        Ok(())
    }

    /// Start recording `duration_secs` of audio in the background
    pub fn start_recording(&self, duration_secs: f64) -> Result<RecordingTask> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(SyncError::invalid_input(format!(
                "recording duration must be positive, got {}",
                duration_secs
            )));
        }

        let mut shared = self.shared.lock();
        check_idle(shared.state)?;

        shared.generation += 1;
        shared.state = PlaybackState::Recording;
        let generation = shared.generation;
        let signal = StopSignal::new();
        shared.signal = Some(signal.clone());

        let device = Arc::clone(&self.device);
        let state = Arc::clone(&self.shared);
        let sample_rate = self.sample_rate;

        let spawned = thread::Builder::new()
            .name("recording".to_string())
            .spawn(move || {
                let result = device.record(duration_secs, sample_rate, &signal);
                finish(&state, generation, PlaybackState::Recording);
                let samples = result?;
                log::info!(
                    "Recording finished: {} samples ({:.1}s)",
                    samples.len(),
                    samples.len() as f64 / sample_rate as f64
                );
                AudioBuffer::new(samples, sample_rate)
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                shared.state = PlaybackState::Idle;
                shared.signal = None;
                return Err(SyncError::Io(e));
            }
        };

        log::info!("Recording {:.1}s at {}Hz", duration_secs, sample_rate);
        Ok(RecordingTask { handle })
    }

    /// Stop whatever is running; a no-op when idle
    pub fn stop(&self) {
        let handle = {
            let mut shared = self.shared.lock();
            if shared.state != PlaybackState::Idle {
                log::info!("Stopping ({})", shared.state);
                shared.state = PlaybackState::Idle;
                shared.generation += 1;
                if let Some(signal) = shared.signal.take() {
                    signal.raise();
                }
            }
            shared.playback.take()
        };

        if let Some(handle) = handle {
            reap(handle);
        }
    }

    /// Block until the current playback ends and return its outcome
    ///
    /// Returns `Ok(())` immediately when nothing has been played.
    pub fn wait(&self) -> Result<()> {
        let handle = self.shared.lock().playback.take();
        match handle {
            Some(handle) => handle.join().unwrap_or_else(|_| Err(panicked("playback"))),
            None => Ok(()),
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A background recording; `join` yields the captured buffer
pub struct RecordingTask {
    handle: JoinHandle<Result<AudioBuffer>>,
}

impl RecordingTask {
    /// Wait for the recording and return it
    pub fn join(self) -> Result<AudioBuffer> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(panicked("recording")))
    }
}

fn check_idle(state: PlaybackState) -> Result<()> {
    match state {
        PlaybackState::Idle => Ok(()),
        PlaybackState::Playing => Err(SyncError::Busy("already playing")),
        PlaybackState::Recording => Err(SyncError::Busy("already recording")),
    }
}

/// Return to idle if `generation` still owns the state
fn finish(shared: &Mutex<Shared>, generation: u64, expected: PlaybackState) {
    let mut shared = shared.lock();
    if shared.generation == generation && shared.state == expected {
        shared.state = PlaybackState::Idle;
        shared.signal = None;
        log::debug!("{} finished", expected);
    }
}

fn reap(handle: JoinHandle<Result<()>>) {
    match handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Earlier playback ended with error: {}", e),
        Err(_) => log::error!("Playback thread panicked"),
    }
}

fn panicked(task: &str) -> SyncError {
    SyncError::Device(DeviceError::Stream(format!("{} thread panicked", task)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::NullDevice;
    use std::time::Duration;

    fn long_buffer() -> AudioBuffer {
        AudioBuffer::new(vec![0.0; 44100 * 30], 44100).unwrap()
    }

    fn short_buffer() -> AudioBuffer {
        AudioBuffer::new(vec![0.0; 441], 44100).unwrap()
    }

    struct BrokenDevice;

    impl AudioDevice for BrokenDevice {
        fn play(
            &self,
            _samples: &[f32],
            _sample_rate: u32,
            _stop: &StopSignal,
        ) -> std::result::Result<(), DeviceError> {
            Err(DeviceError::Unavailable("no output device".to_string()))
        }

        fn record(
            &self,
            _duration_secs: f64,
            _sample_rate: u32,
            _stop: &StopSignal,
        ) -> std::result::Result<Vec<f32>, DeviceError> {
            Err(DeviceError::Unavailable("no input device".to_string()))
        }
    }

    #[test]
    fn test_stop_right_after_start_returns_promptly() {
        let controller = PlaybackController::new(Arc::new(NullDevice::new()));
        let buffer = AudioBuffer::new(vec![0.0; 44100 * 3], 44100).unwrap();

        for _ in 0..20 {
            controller.start_playback(&buffer).unwrap();
            let start = std::time::Instant::now();
            controller.stop();
            assert!(
                start.elapsed() < Duration::from_millis(100),
                "stop took {:?}",
                start.elapsed()
            );
            assert_eq!(controller.state(), PlaybackState::Idle);
        }
    }

    #[test]
    fn test_stop_right_after_recording_start_ends_capture() {
        let controller = PlaybackController::new(Arc::new(NullDevice::new()));
        let task = controller.start_recording(3.0).unwrap();
        controller.stop();

        let start = std::time::Instant::now();
        let buffer = task.join().unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(buffer.len() < 44100);
    }

    #[test]
    fn test_second_start_is_busy_until_stopped() {
        let controller = PlaybackController::new(Arc::new(NullDevice::new()));

        controller.start_playback(&long_buffer()).unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);

        let second = controller.start_playback(&long_buffer());
        assert!(matches!(second, Err(SyncError::Busy(_))));
        assert!(matches!(
            controller.start_recording(1.0),
            Err(SyncError::Busy(_))
        ));

        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(!controller.is_active());

        controller.start_playback(&long_buffer()).unwrap();
        assert!(controller.is_active());
        controller.stop();
    }

    #[test]
    fn test_natural_completion_returns_to_idle() {
        let controller = PlaybackController::new(Arc::new(NullDevice::new()));
        controller.start_playback(&short_buffer()).unwrap();
        controller.wait().unwrap();
        assert_eq!(controller.state(), PlaybackState::Idle);

        controller.start_playback(&short_buffer()).unwrap();
        controller.wait().unwrap();
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let device = Arc::new(NullDevice::new());
        let controller = PlaybackController::new(device);
        controller.stop();
        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_stopped_task_does_not_idle_newer_playback() {
        let controller = PlaybackController::new(Arc::new(NullDevice::new()));

        controller.start_playback(&long_buffer()).unwrap();
        controller.stop();
        controller.start_playback(&long_buffer()).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(controller.state(), PlaybackState::Playing);
        controller.stop();
    }

    #[test]
    fn test_concurrent_starts_admit_exactly_one() {
        let controller = Arc::new(PlaybackController::new(Arc::new(NullDevice::new())));
        let buffer = long_buffer();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let controller = Arc::clone(&controller);
                let buffer = buffer.clone();
                std::thread::spawn(move || controller.start_playback(&buffer).is_ok())
            })
            .collect();

        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();
        assert_eq!(started, 1);
        controller.stop();
    }

    #[test]
    fn test_recording_yields_buffer() {
        let controller =
            PlaybackController::with_sample_rate(Arc::new(NullDevice::new()), 8000);
        let task = controller.start_recording(0.05).unwrap();
        let buffer = task.join().unwrap();

        assert_eq!(buffer.len(), 400);
        assert_eq!(buffer.sample_rate(), 8000);
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_stop_cuts_recording_short() {
        let controller = PlaybackController::new(Arc::new(NullDevice::new()));
        let task = controller.start_recording(30.0).unwrap();
        assert_eq!(controller.state(), PlaybackState::Recording);

        std::thread::sleep(Duration::from_millis(20));
        controller.stop();

        let buffer = task.join().unwrap();
        assert!(buffer.len() < 44100 * 30);
    }

    #[test]
    fn test_invalid_recording_duration() {
        let controller = PlaybackController::new(Arc::new(NullDevice::new()));
        assert!(matches!(
            controller.start_recording(0.0),
            Err(SyncError::InvalidInput(_))
        ));
        assert!(matches!(
            controller.start_recording(f64::NAN),
            Err(SyncError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_device_errors_propagate() {
        let controller = PlaybackController::new(Arc::new(BrokenDevice));

        controller.start_playback(&short_buffer()).unwrap();
        let result = controller.wait();
        assert!(matches!(
            result,
            Err(SyncError::Device(DeviceError::Unavailable(_)))
        ));
        assert_eq!(controller.state(), PlaybackState::Idle);

        let recording = controller.start_recording(1.0).unwrap().join();
        assert!(matches!(
            recording,
            Err(SyncError::Device(DeviceError::Unavailable(_)))
        ));
    }
}
