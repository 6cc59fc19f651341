//! Correction session: tempo state, audio state and the correction workflow

use super::state::SessionState;
use crate::config::SyncConfig;
use crate::decode::load_audio_file;
use crate::error::{Result, SyncError};
use crate::input::InputSource;
use crate::model::{AudioBuffer, TempoEstimate};
use crate::playback::PlaybackController;
use crate::stretch::PhaseVocoderStretcher;
use crate::tempo::{lag_ms, TapTempoEstimator, TempoDetector};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Fields guarded by the session lock
#[derive(Debug, Default)]
struct CorrectionState {
    current_bpm: Option<f64>,
    reference_bpm: Option<f64>,
    /// Always derived from the BPM pair; 0.0 until both are set
    lag_ms: f64,
    audio: Option<AudioBuffer>,
    /// Only valid for the current `audio`
    corrected: Option<AudioBuffer>,
}

impl CorrectionState {
    fn state(&self) -> SessionState {
        if self.current_bpm.is_none() {
            SessionState::Uninitialized
        } else if self.reference_bpm.is_none() {
            SessionState::BpmKnown
        } else if self.corrected.is_some() {
            SessionState::Corrected
        } else {
            SessionState::ReferenceKnown
        }
    }

    fn apply_current_bpm(&mut self, bpm: f64) -> Result<()> {
        let lag = match self.reference_bpm {
            Some(reference) => lag_ms(Some(bpm), Some(reference))?,
            None => 0.0,
        };
        self.current_bpm = Some(bpm);
        self.lag_ms = lag;
        self.corrected = None;
        Ok(())
    }
}

/// Point-in-time copy of a session's state for display
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub current_bpm: Option<f64>,
    pub reference_bpm: Option<f64>,
    pub lag_ms: f64,
    /// Duration of the loaded audio, if any
    pub audio_secs: Option<f64>,
    /// Duration of the corrected audio, if any
    pub corrected_secs: Option<f64>,
}

/// Tempo-correction workflow over one audio buffer
///
/// ```text
/// Uninitialized -> BpmKnown -> ReferenceKnown -> Corrected
/// ```
pub struct CorrectionSession {
    inner: Mutex<CorrectionState>,
    stretcher: PhaseVocoderStretcher,
    taps: TapTempoEstimator,
    detector: Box<dyn TempoDetector>,
    playback: Arc<PlaybackController>,
}

impl CorrectionSession {
    /// Create a session with the given tempo detector and device controller
    pub fn new(
        config: &SyncConfig,
        detector: Box<dyn TempoDetector>,
        playback: Arc<PlaybackController>,
    ) -> Self {
        Self {
            inner: Mutex::new(CorrectionState::default()),
            stretcher: PhaseVocoderStretcher::new(config.stretch),
            taps: TapTempoEstimator::with_average(config.interval_average),
            detector,
            playback,
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state()
    }

    pub fn current_bpm(&self) -> Option<f64> {
        self.inner.lock().current_bpm
    }

    pub fn reference_bpm(&self) -> Option<f64> {
        self.inner.lock().reference_bpm
    }

    pub fn lag_ms(&self) -> f64 {
        self.inner.lock().lag_ms
    }

    /// Loaded audio, if any
    pub fn audio(&self) -> Option<AudioBuffer> {
        self.inner.lock().audio.clone()
    }

    /// Corrected audio, if the last correction is still valid
    pub fn corrected(&self) -> Option<AudioBuffer> {
        self.inner.lock().corrected.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            state: inner.state(),
            current_bpm: inner.current_bpm,
            reference_bpm: inner.reference_bpm,
            lag_ms: inner.lag_ms,
            audio_secs: inner.audio.as_ref().map(AudioBuffer::duration_secs),
            corrected_secs: inner.corrected.as_ref().map(AudioBuffer::duration_secs),
        }
    }

    /// Set the tempo of the loaded signal
    ///
    /// Drops any corrected audio and recomputes the lag if a reference is set.
    pub fn set_current_bpm(&self, estimate: TempoEstimate) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.apply_current_bpm(estimate.bpm())?;
        log::info!(
            "Current BPM set to {:.2} ({})",
            estimate.bpm(),
            estimate.source()
        );
        Ok(())
    }

    /// Set the reference tempo and return the resulting lag in ms
    pub fn set_reference_bpm(&self, reference_bpm: f64) -> Result<f64> {
        let mut inner = self.inner.lock();
        let current = inner.current_bpm.ok_or(SyncError::InvalidState {
            missing: "current_bpm",
        })?;
        if !reference_bpm.is_finite() || reference_bpm <= 0.0 {
            return Err(SyncError::invalid_input(format!(
                "reference BPM must be positive, got {}",
                reference_bpm
            )));
        }

        let lag = lag_ms(Some(current), Some(reference_bpm))?;
        inner.reference_bpm = Some(reference_bpm);
        inner.lag_ms = lag;
        inner.corrected = None;

        log::info!("Reference BPM {:.2}, lag {:.2} ms", reference_bpm, lag);
        Ok(lag)
    }

    /// Collect taps from `source` and use them as the current tempo
    pub fn tap_tempo(&self, source: &mut dyn InputSource) -> Result<TempoEstimate> {
        let taps = source.collect_taps()?;
        let estimate = self.taps.estimate(&taps)?;
        self.set_current_bpm(estimate)?;
        Ok(estimate)
    }

    /// Replace the loaded audio; drops any corrected audio
    pub fn load_audio(&self, buffer: AudioBuffer) {
        let mut inner = self.inner.lock();
        log::info!(
            "Audio loaded: {:.1}s at {}Hz",
            buffer.duration_secs(),
            buffer.sample_rate()
        );
        inner.audio = Some(buffer);
        inner.corrected = None;
    }

    /// Decode `path` and load it
    pub fn load_audio_file(&self, path: &Path) -> anyhow::Result<()> {
        let buffer = load_audio_file(path)?;
        self.load_audio(buffer);
        Ok(())
    }

    /// Record from the device and load the result
    ///
    /// Fails with `Busy` while the device is playing or recording.
    pub fn record_audio(&self, duration_secs: f64) -> Result<AudioBuffer> {
        let buffer = self.playback.start_recording(duration_secs)?.join()?;
        self.load_audio(buffer.clone());
        Ok(buffer)
    }

    /// Run the tempo detector over the loaded audio and use its estimate
    pub fn detect_tempo(&self) -> Result<TempoEstimate> {
        let mut inner = self.inner.lock();
        let audio = inner.audio.as_ref().ok_or(SyncError::NoAudioLoaded)?;
        let estimate = self.detector.detect(audio.samples(), audio.sample_rate())?;
        inner.apply_current_bpm(estimate.bpm())?;

        log::info!("Detected tempo {:.2} BPM", estimate.bpm());
        Ok(estimate)
    }

    /// Stretch the loaded audio to the reference tempo
    ///
    /// Returns the rate applied (`current / reference`). On success the
    /// current tempo becomes the reference and the lag drops to zero; on
    /// failure nothing changes.
    pub fn auto_correct(&self) -> Result<f64> {
        let mut inner = self.inner.lock();
        let current = inner.current_bpm.ok_or(SyncError::InvalidState {
            missing: "current_bpm",
        })?;
        let reference = inner.reference_bpm.ok_or(SyncError::InvalidState {
            missing: "reference_bpm",
        })?;

        let rate = current / reference;
        log::info!("Correcting tempo with rate {:.4}", rate);

        let corrected = self.stretcher.run(inner.audio.as_ref(), rate)?;
        let lag = lag_ms(Some(reference), Some(reference))?;

        inner.corrected = Some(corrected);
        inner.current_bpm = Some(reference);
        inner.lag_ms = lag;

        log::info!("Tempo corrected to {:.2} BPM", reference);
        Ok(rate)
    }

    /// Play the loaded audio in the background
    pub fn play_original(&self) -> Result<()> {
        let audio = self.audio().ok_or(SyncError::NoAudioLoaded)?;
        self.playback.start_playback(&audio)
    }

    /// Play the corrected audio in the background
    pub fn play_corrected(&self) -> Result<()> {
        let corrected = self.corrected().ok_or(SyncError::NoAudioLoaded)?;
        self.playback.start_playback(&corrected)
    }

    /// Stop playback or recording
    pub fn stop(&self) {
        self.playback.stop();
    }

    /// True while the device is playing or recording
    pub fn is_active(&self) -> bool {
        self.playback.is_active()
    }

    pub fn playback(&self) -> &Arc<PlaybackController> {
        &self.playback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TempoSource;
    use crate::playback::{NullDevice, PlaybackState};
    use crate::tempo::ManualDetector;
    use std::f32::consts::PI;

    fn session_with(detector_bpm: f64) -> CorrectionSession {
        let playback = Arc::new(PlaybackController::new(Arc::new(NullDevice::new())));
        let detector = Box::new(ManualDetector::new(detector_bpm).unwrap());
        CorrectionSession::new(&SyncConfig::new(), detector, playback)
    }

    fn tone(seconds: f32) -> AudioBuffer {
        let len = (seconds * 44100.0) as usize;
        let samples = (0..len)
            .map(|i| 0.4 * (2.0 * PI * 330.0 * i as f32 / 44100.0).sin())
            .collect();
        AudioBuffer::new(samples, 44100).unwrap()
    }

    #[test]
    fn test_starts_uninitialized() {
        let session = session_with(120.0);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Uninitialized);
        assert_eq!(snapshot.lag_ms, 0.0);
        assert!(snapshot.audio_secs.is_none());
    }

    #[test]
    fn test_auto_correct_moves_to_reference() {
        let session = session_with(120.0);
        let audio = tone(1.0);
        session.load_audio(audio.clone());
        session.set_current_bpm(TempoEstimate::manual(140.0).unwrap()).unwrap();
        session.set_reference_bpm(120.0).unwrap();
        assert_eq!(session.state(), SessionState::ReferenceKnown);

        let rate = session.auto_correct().unwrap();
        assert!((rate - 140.0 / 120.0).abs() < 1e-12);

        assert_eq!(session.current_bpm(), Some(120.0));
        assert_eq!(session.lag_ms(), 0.0);
        assert_eq!(session.state(), SessionState::Corrected);

        let corrected = session.corrected().unwrap();
        let expected = (audio.len() as f64 / rate).round() as usize;
        assert_eq!(corrected.len(), expected);
    }

    #[test]
    fn test_auto_correct_before_reference_is_invalid_state() {
        let session = session_with(120.0);
        session.load_audio(tone(0.2));
        assert!(matches!(
            session.auto_correct(),
            Err(SyncError::InvalidState {
                missing: "current_bpm"
            })
        ));

        session.set_current_bpm(TempoEstimate::manual(100.0).unwrap()).unwrap();
        assert!(matches!(
            session.auto_correct(),
            Err(SyncError::InvalidState {
                missing: "reference_bpm"
            })
        ));
    }

    #[test]
    fn test_auto_correct_without_audio_leaves_state() {
        let session = session_with(120.0);
        session.set_current_bpm(TempoEstimate::manual(100.0).unwrap()).unwrap();
        session.set_reference_bpm(120.0).unwrap();
        let before = session.snapshot();

        assert!(matches!(session.auto_correct(), Err(SyncError::NoAudioLoaded)));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn test_degenerate_tempo_pair_is_invalid_rate() {
        let session = session_with(120.0);
        session.load_audio(tone(0.1));
        session.set_current_bpm(TempoEstimate::manual(1e-300).unwrap()).unwrap();
        session.set_reference_bpm(1.0).unwrap();
        let before = session.snapshot();

        assert!(matches!(session.auto_correct(), Err(SyncError::InvalidRate(_))));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn test_reference_requires_current_bpm() {
        let session = session_with(120.0);
        assert!(matches!(
            session.set_reference_bpm(120.0),
            Err(SyncError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_reference_must_be_positive() {
        let session = session_with(120.0);
        session.set_current_bpm(TempoEstimate::manual(100.0).unwrap()).unwrap();
        assert!(matches!(
            session.set_reference_bpm(0.0),
            Err(SyncError::InvalidInput(_))
        ));
        assert!(matches!(
            session.set_reference_bpm(-90.0),
            Err(SyncError::InvalidInput(_))
        ));
        assert_eq!(session.state(), SessionState::BpmKnown);
    }

    #[test]
    fn test_lag_follows_tempo_pair() {
        let session = session_with(120.0);
        session.set_current_bpm(TempoEstimate::manual(120.0).unwrap()).unwrap();
        let lag = session.set_reference_bpm(100.0).unwrap();
        assert!((lag - 100.0).abs() < 1e-9);

        session.set_current_bpm(TempoEstimate::manual(100.0).unwrap()).unwrap();
        assert_eq!(session.lag_ms(), 0.0);
        assert_eq!(session.state(), SessionState::ReferenceKnown);
    }

    #[test]
    fn test_loading_audio_clears_correction() {
        let session = session_with(120.0);
        session.load_audio(tone(0.3));
        session.set_current_bpm(TempoEstimate::manual(128.0).unwrap()).unwrap();
        session.set_reference_bpm(124.0).unwrap();
        session.auto_correct().unwrap();
        assert!(session.corrected().is_some());

        session.load_audio(tone(0.2));
        assert!(session.corrected().is_none());
        assert_eq!(session.state(), SessionState::ReferenceKnown);
    }

    #[test]
    fn test_new_current_bpm_clears_correction() {
        let session = session_with(120.0);
        session.load_audio(tone(0.3));
        session.set_current_bpm(TempoEstimate::manual(128.0).unwrap()).unwrap();
        session.set_reference_bpm(124.0).unwrap();
        session.auto_correct().unwrap();

        session.set_current_bpm(TempoEstimate::manual(130.0).unwrap()).unwrap();
        assert!(session.corrected().is_none());
        assert!(session.lag_ms() > 0.0);
    }

    #[test]
    fn test_detect_tempo_uses_detector() {
        let session = session_with(126.0);
        assert!(matches!(session.detect_tempo(), Err(SyncError::NoAudioLoaded)));

        session.load_audio(tone(0.1));
        let estimate = session.detect_tempo().unwrap();
        assert_eq!(estimate.source(), TempoSource::Manual);
        assert_eq!(session.current_bpm(), Some(126.0));
        assert_eq!(session.state(), SessionState::BpmKnown);
    }

    #[test]
    fn test_tap_tempo_sets_current_bpm() {
        let session = session_with(120.0);
        let mut taps = vec![0.0, 0.5, 1.0, 1.5];
        let estimate = session.tap_tempo(&mut taps).unwrap();
        assert_eq!(estimate.source(), TempoSource::Tap);
        assert!((session.current_bpm().unwrap() - 120.0).abs() < 0.01);

        let mut one = vec![0.0];
        assert!(matches!(
            session.tap_tempo(&mut one),
            Err(SyncError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_record_audio_loads_buffer() {
        let session = session_with(120.0);
        let buffer = session.record_audio(0.05).unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(session.audio().unwrap().len(), buffer.len());
    }

    #[test]
    fn test_play_requires_buffers() {
        let session = session_with(120.0);
        assert!(matches!(session.play_original(), Err(SyncError::NoAudioLoaded)));
        assert!(matches!(session.play_corrected(), Err(SyncError::NoAudioLoaded)));

        session.load_audio(tone(5.0));
        session.play_original().unwrap();
        assert_eq!(session.playback().state(), PlaybackState::Playing);
        assert!(matches!(session.play_original(), Err(SyncError::Busy(_))));
        assert!(matches!(session.record_audio(1.0), Err(SyncError::Busy(_))));

        session.stop();
        assert!(!session.is_active());
    }
}
