//! Tap input collection
//!
//! An [`InputSource`] blocks until the user has finished tapping and hands
//! back the ordered timestamps. It knows nothing about tempo.

mod line;

pub use line::LineTapSource;

use crate::error::Result;

/// Produces an ordered sequence of tap timestamps in seconds
pub trait InputSource {
    fn collect_taps(&mut self) -> Result<Vec<f64>>;
}

/// Pre-recorded timestamps
impl InputSource for Vec<f64> {
    fn collect_taps(&mut self) -> Result<Vec<f64>> {
        Ok(std::mem::take(self))
    }
}
