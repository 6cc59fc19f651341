//! Per-beat timing offset between two tempos

use crate::error::{Result, SyncError};

/// Duration of one beat in milliseconds
pub fn beat_period_ms(bpm: f64) -> f64 {
    60_000.0 / bpm
}

/// Difference in beat period between the reference and the current tempo
///
/// `lag = 60000/reference - 60000/current`. Positive means the current
/// signal's beats are shorter than the reference's, i.e. it runs fast.
///
/// Both tempos are required. `current_bpm` must be positive and
/// `reference_bpm` non-zero; anything else is `InvalidInput`, never 0.
pub fn lag_ms(current_bpm: Option<f64>, reference_bpm: Option<f64>) -> Result<f64> {
    let current = current_bpm.ok_or_else(|| SyncError::invalid_input("current BPM is not set"))?;
    let reference =
        reference_bpm.ok_or_else(|| SyncError::invalid_input("reference BPM is not set"))?;

    if !current.is_finite() || current <= 0.0 {
        return Err(SyncError::invalid_input(format!(
            "current BPM must be positive, got {}",
            current
        )));
    }
    if !reference.is_finite() || reference == 0.0 {
        return Err(SyncError::invalid_input(format!(
            "reference BPM must be non-zero, got {}",
            reference
        )));
    }

    let lag = beat_period_ms(reference) - beat_period_ms(current);
    log::debug!(
        "Lag: current={:.2} BPM, reference={:.2} BPM -> {:.2} ms",
        current,
        reference,
        lag
    );
    Ok(lag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faster_current_gives_positive_lag() {
        let lag = lag_ms(Some(120.0), Some(100.0)).unwrap();
        assert!((lag - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_slower_current_gives_negative_lag() {
        let lag = lag_ms(Some(100.0), Some(120.0)).unwrap();
        assert!((lag + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_tempos_have_no_lag() {
        assert_eq!(lag_ms(Some(128.0), Some(128.0)).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_reference_is_rejected() {
        assert!(matches!(
            lag_ms(Some(120.0), Some(0.0)),
            Err(SyncError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_values_are_rejected() {
        assert!(matches!(lag_ms(None, Some(120.0)), Err(SyncError::InvalidInput(_))));
        assert!(matches!(lag_ms(Some(120.0), None), Err(SyncError::InvalidInput(_))));
        assert!(matches!(
            lag_ms(Some(0.0), Some(120.0)),
            Err(SyncError::InvalidInput(_))
        ));
    }
}
