//! Line-based tap input (press Enter to tap)

use super::InputSource;
use crate::error::Result;
use std::io::BufRead;
use std::time::Instant;

/// Reads taps from a line-oriented reader such as a locked stdin
///
/// Every empty line is a tap, stamped with a monotonic clock at the moment
/// it is read. `q` or end of input finishes early; collection also ends
/// once `max_taps` taps have been read.
pub struct LineTapSource<R> {
    reader: R,
    max_taps: usize,
}

impl<R: BufRead> LineTapSource<R> {
    pub fn new(reader: R, max_taps: usize) -> Self {
        Self { reader, max_taps }
    }
}

impl<R: BufRead> InputSource for LineTapSource<R> {
    fn collect_taps(&mut self) -> Result<Vec<f64>> {
        let start = Instant::now();
        let mut taps = Vec::with_capacity(self.max_taps);
        let mut line = String::new();

        while taps.len() < self.max_taps {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }

            match line.trim() {
                "" => {
                    taps.push(start.elapsed().as_secs_f64());
                    log::info!("Tap {}", taps.len());
                }
                "q" | "Q" => break,
                other => {
                    log::warn!("Ignoring {:?} (press Enter to tap, q to finish)", other)
                }
            }
        }

        log::debug!("Collected {} taps", taps.len());
        Ok(taps)
    }
}
