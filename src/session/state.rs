use std::fmt;

/// Progress of a correction session
///
/// Derived from which fields are set rather than stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// No current tempo yet
    Uninitialized,

    /// Current tempo known, no reference
    BpmKnown,

    /// Both tempos known, lag computed
    ReferenceKnown,

    /// Corrected audio matches the reference tempo
    Corrected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::BpmKnown => "bpm known",
            SessionState::ReferenceKnown => "reference known",
            SessionState::Corrected => "corrected",
        };
        f.write_str(name)
    }
}
