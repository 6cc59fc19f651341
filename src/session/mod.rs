//! Tempo-correction sessions
//!
//! A [`CorrectionSession`] owns the tempo pair, the loaded audio and its
//! corrected version, and sequences estimation, lag calculation and
//! stretching. All of that state lives behind one lock per session.

mod correction;
mod state;

pub use correction::{CorrectionSession, SessionSnapshot};
pub use state::SessionState;
