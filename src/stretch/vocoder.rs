//! Phase vocoder time-stretch
//!
//! ## Algorithm
//!
//! 1. **Analysis**: zero-pad by half a frame on each side, cut Hann-windowed
//!    frames every `hop` samples and FFT them (frames run in parallel).
//! 2. **Resampling**: walk the analysis frames at positions `0, rate, 2*rate, ...`.
//!    Magnitude is interpolated between neighbouring frames. Phase is
//!    accumulated from each bin's instantaneous frequency, estimated from
//!    the phase difference between consecutive analysis frames.
//! 3. **Synthesis**: inverse FFT, window, overlap-add at the same hop and
//!    divide by the summed squared window.
//!
//! Given the same frame size and rate the output is deterministic.

use super::config::StretchConfig;
use crate::error::{Result, SyncError};
use crate::model::AudioBuffer;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

const TWO_PI: f64 = 2.0 * PI;

/// Window sums below this are left undivided
const WINDOW_SUM_FLOOR: f64 = 1e-10;

/// Synthesis hop over analysis hop. Both hops are a quarter frame.
const HOP_RATIO: f64 = 1.0;

/// Largest stretch factor in either direction; bounds output length to 16x input
pub const MAX_STRETCH: f64 = 16.0;

type Spectrum = Vec<Complex<f64>>;

/// Pitch-preserving time-stretcher
///
/// FFT plans and the window are built once and reused for every call.
pub struct PhaseVocoderStretcher {
    config: StretchConfig,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl PhaseVocoderStretcher {
    pub fn new(config: StretchConfig) -> Self {
        let size = config.frame_size();
        let mut planner = FftPlanner::<f64>::new();

        Self {
            config,
            window: periodic_hann(size),
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        }
    }

    pub fn config(&self) -> &StretchConfig {
        &self.config
    }

    /// Stretch an optional buffer; `None` is reported as `NoAudioLoaded`
    pub fn run(&self, input: Option<&AudioBuffer>, rate: f64) -> Result<AudioBuffer> {
        let input = input.ok_or(SyncError::NoAudioLoaded)?;
        self.stretch(input, rate)
    }

    /// Time-scale `input` by `rate` without changing its pitch
    ///
    /// `rate > 1` shortens (speeds up), `rate < 1` lengthens. The result has
    /// `round(len / rate)` samples at the input's sample rate. Rates outside
    /// `[1 / MAX_STRETCH, MAX_STRETCH]` are rejected.
    pub fn stretch(&self, input: &AudioBuffer, rate: f64) -> Result<AudioBuffer> {
        if input.is_empty() {
            return Err(SyncError::NoAudioLoaded);
        }
        if !rate.is_finite() || !(1.0 / MAX_STRETCH..=MAX_STRETCH).contains(&rate) {
            return Err(SyncError::InvalidRate(rate));
        }

        let target_len = (input.len() as f64 / rate).round() as usize;
        log::debug!(
            "Stretching {} samples by {:.4} -> {} samples (frame {}, hop {})",
            input.len(),
            rate,
            target_len,
            self.config.frame_size(),
            self.config.hop_size()
        );

        let spectra = self.analyze(input.samples());
        let frames = self.resample(&spectra, rate);
        let samples = self.synthesize(&frames, target_len);

        log::debug!(
            "Stretch done: {} analysis frames -> {} synthesis frames",
            spectra.len(),
            frames.len()
        );

        AudioBuffer::new(samples, input.sample_rate())
    }

    /// Short-time spectra of centered, windowed frames (bins `0..=N/2`)
    fn analyze(&self, samples: &[f32]) -> Vec<Spectrum> {
        let size = self.config.frame_size();
        let hop = self.config.hop_size();
        let bins = self.config.bins();
        let pad = size / 2;

        let mut padded = vec![0.0f64; samples.len() + size];
        for (dst, &s) in padded[pad..].iter_mut().zip(samples) {
            *dst = s as f64;
        }

        let frame_count = 1 + (padded.len() - size) / hop;

        (0..frame_count)
            .into_par_iter()
            .map(|t| {
                let start = t * hop;
                let mut buf: Spectrum = padded[start..start + size]
                    .iter()
                    .zip(&self.window)
                    .map(|(&x, &w)| Complex::new(x * w, 0.0))
                    .collect();
                self.forward.process(&mut buf);
                buf.truncate(bins);
                buf
            })
            .collect()
    }

    /// Resample the frame sequence at spacing `rate`, keeping phase coherent
    fn resample(&self, spectra: &[Spectrum], rate: f64) -> Vec<Spectrum> {
        let size = self.config.frame_size() as f64;
        let hop = self.config.hop_size() as f64;
        let bins = self.config.bins();
        let frame_count = spectra.len();

        // Phase advance of bin k over one hop
        let advance: Vec<f64> = (0..bins)
            .map(|k| TWO_PI * k as f64 * hop / size)
            .collect();

        // One trailing silent frame lets the last step interpolate
        let silent: Spectrum = vec![Complex::new(0.0, 0.0); bins];
        let frame = |i: usize| spectra.get(i).unwrap_or(&silent);

        let mut phase: Vec<f64> = frame(0).iter().map(|c| c.arg()).collect();

        let out_count = (frame_count as f64 / rate).ceil() as usize;
        let mut out = Vec::with_capacity(out_count);

        for t in 0..out_count {
            let position = t as f64 * rate;
            if position >= frame_count as f64 {
                break;
            }
            let index = position.floor() as usize;
            let alpha = position - index as f64;
            let current = frame(index);
            let next = frame(index + 1);

            let column: Spectrum = (0..bins)
                .map(|k| {
                    let mag = (1.0 - alpha) * current[k].norm() + alpha * next[k].norm();
                    Complex::from_polar(mag, phase[k])
                })
                .collect();
            out.push(column);

            for k in 0..bins {
                let deviation = wrap_phase(next[k].arg() - current[k].arg() - advance[k]);
                let instantaneous = advance[k] + deviation;
                phase[k] = (phase[k] + instantaneous * HOP_RATIO).rem_euclid(TWO_PI);
            }
        }

        out
    }

    /// Inverse transform and overlap-add, trimmed to `target_len` samples
    fn synthesize(&self, frames: &[Spectrum], target_len: usize) -> Vec<f32> {
        let size = self.config.frame_size();
        let hop = self.config.hop_size();
        let bins = self.config.bins();
        let scale = 1.0 / size as f64;

        let segments: Vec<Vec<f64>> = frames
            .par_iter()
            .map(|spectrum| {
                let mut buf: Spectrum = vec![Complex::new(0.0, 0.0); size];
                buf[..bins].copy_from_slice(spectrum);
                for k in 1..size / 2 {
                    buf[size - k] = spectrum[k].conj();
                }
                self.inverse.process(&mut buf);
                buf.iter()
                    .zip(&self.window)
                    .map(|(c, &w)| c.re * scale * w)
                    .collect()
            })
            .collect();

        let total = size + hop * frames.len().saturating_sub(1);
        let mut signal = vec![0.0f64; total];
        let mut window_sum = vec![0.0f64; total];

        for (t, segment) in segments.iter().enumerate() {
            let start = t * hop;
            for (i, (&s, &w)) in segment.iter().zip(&self.window).enumerate() {
                signal[start + i] += s;
                window_sum[start + i] += w * w;
            }
        }

        let mut out: Vec<f32> = signal
            .iter()
            .zip(&window_sum)
            .skip(size / 2)
            .take(target_len)
            .map(|(&s, &w)| (if w > WINDOW_SUM_FLOOR { s / w } else { s }) as f32)
            .collect();
        out.resize(target_len, 0.0);
        out
    }
}

impl Default for PhaseVocoderStretcher {
    fn default() -> Self {
        Self::new(StretchConfig::default())
    }
}

/// Periodic Hann window (constant squared-sum at 75% overlap)
fn periodic_hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (TWO_PI * i as f64 / size as f64).cos()))
        .collect()
}

/// Wrap a phase into [-pi, pi]
fn wrap_phase(phase: f64) -> f64 {
    phase - TWO_PI * (phase / TWO_PI).round()
}
