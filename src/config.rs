//! Session configuration

use crate::stretch::StretchConfig;
use crate::tempo::IntervalAverage;

/// Sample rate used for recording when nothing else is specified
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Configuration for a tempo-correction session
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Phase vocoder frame/hop sizes
    pub stretch: StretchConfig,

    /// Lower bound of the tempo detector's BPM range
    pub min_bpm: f32,

    /// Upper bound of the tempo detector's BPM range
    pub max_bpm: f32,

    /// Sample rate for microphone recordings
    pub sample_rate: u32,

    /// Default recording length in seconds
    pub record_secs: f64,

    /// Tap collection stops automatically after this many taps
    pub max_taps: usize,

    /// How tap intervals are averaged
    pub interval_average: IntervalAverage,
}

impl SyncConfig {
    /// Create a configuration with the defaults used by the command-line tool
    pub fn new() -> Self {
        Self {
            stretch: StretchConfig::default(),
            min_bpm: 70.0,
            max_bpm: 170.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            record_secs: 5.0,
            max_taps: 4,
            interval_average: IntervalAverage::Mean,
        }
    }

    /// Set the phase vocoder configuration
    pub fn with_stretch(mut self, stretch: StretchConfig) -> Self {
        self.stretch = stretch;
        self
    }

    /// Set the detector BPM range
    pub fn with_bpm_range(mut self, min: f32, max: f32) -> Self {
        self.min_bpm = min;
        self.max_bpm = max;
        self
    }

    /// Set the recording sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the default recording length
    pub fn with_record_secs(mut self, secs: f64) -> Self {
        self.record_secs = secs;
        self
    }

    /// Set the number of taps collected before stopping
    pub fn with_max_taps(mut self, taps: usize) -> Self {
        self.max_taps = taps;
        self
    }

    /// Use median instead of mean tap intervals
    pub fn with_interval_average(mut self, average: IntervalAverage) -> Self {
        self.interval_average = average;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
