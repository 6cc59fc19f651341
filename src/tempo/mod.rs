//! Tempo estimation and tempo-offset calculation
//!
//! Tempo can come from tap timestamps ([`TapTempoEstimator`]) or from a
//! [`TempoDetector`] run over audio. Detection sits behind a trait so the
//! stratum-dsp detector can be swapped for a fixed value in tests.

mod fixed;
mod lag;
mod stratum;
mod tap;
mod traits;

pub use fixed::ManualDetector;
pub use lag::{beat_period_ms, lag_ms};
pub use stratum::StratumDetector;
pub use tap::{IntervalAverage, TapTempoEstimator};
pub use traits::TempoDetector;
