//! Hardware audio through cpal's default host
//!
//! Streams are opened per call and dropped when the call returns, so
//! nothing device-specific outlives a `play` or `record`.

use super::device::{AudioDevice, StopSignal};
use crate::error::DeviceError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often a blocking call checks for completion or a stop request
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default input/output device of the system audio host
#[derive(Debug, Default)]
pub struct CpalDevice;

impl CpalDevice {
    pub fn new() -> Self {
        Self
    }
}

/// Block until `done` is set or `stop` is raised
fn wait_until(done: &AtomicBool, stop: &StopSignal) {
    while !done.load(Ordering::SeqCst) && !stop.is_raised() {
        thread::sleep(POLL_INTERVAL);
    }
}

impl AudioDevice for CpalDevice {
    fn play(
        &self,
        samples: &[f32],
        sample_rate: u32,
        stop: &StopSignal,
    ) -> Result<(), DeviceError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| DeviceError::Unavailable("no default output device".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(DeviceError::Unsupported(format!(
                "output sample format {:?}",
                supported.sample_format()
            )));
        }

        let channels = supported.channels() as usize;
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Default,
        };

        let data: Arc<[f32]> = samples.into();
        let done = Arc::new(AtomicBool::new(false));
        let finished = Arc::clone(&done);
        let mut position = 0usize;

        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in out.chunks_mut(channels) {
                        let sample = match data.get(position) {
                            Some(&s) => s,
                            None => {
                                finished.store(true, Ordering::SeqCst);
                                0.0
                            }
                        };
                        frame.fill(sample);
                        position += 1;
                    }
                },
                |err| log::error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceError::Stream(e.to_string()))?;
        log::debug!("Output stream open: {} channel(s) at {}Hz", channels, sample_rate);

        wait_until(&done, stop);
        drop(stream);
        Ok(())
    }

    fn record(
        &self,
        duration_secs: f64,
        sample_rate: u32,
        stop: &StopSignal,
    ) -> Result<Vec<f32>, DeviceError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| DeviceError::Unavailable("no default input device".to_string()))?;
        let supported = device
            .default_input_config()
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(DeviceError::Unsupported(format!(
                "input sample format {:?}",
                supported.sample_format()
            )));
        }

        let channels = supported.channels() as usize;
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Default,
        };

        let target = (duration_secs * sample_rate as f64).round() as usize;
        let captured = Arc::new(Mutex::new(Vec::with_capacity(target)));
        let done = Arc::new(AtomicBool::new(false));

        let sink = Arc::clone(&captured);
        let finished = Arc::clone(&done);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut sink = sink.lock();
                    for frame in data.chunks(channels) {
                        if sink.len() >= target {
                            finished.store(true, Ordering::SeqCst);
                            break;
                        }
                        // Convert to mono (average channels)
                        sink.push(frame.iter().sum::<f32>() / frame.len() as f32);
                    }
                },
                |err| log::error!("Input stream error: {}", err),
                None,
            )
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceError::Stream(e.to_string()))?;
        log::debug!("Input stream open: {} channel(s) at {}Hz", channels, sample_rate);

        wait_until(&done, stop);
        drop(stream);

        let mut samples = std::mem::take(&mut *captured.lock());
        samples.truncate(target);
        Ok(samples)
    }
}
