//! PPR calibration against a known reference speed.
//!
//! During calibration the capture callback is swapped for a `PulseCounter`
//! that only increments an atomic; the interval buffer is not touched.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tacho_traits::EdgeCallback;

use crate::error::CalibrationError;

/// Lock-free edge counter. Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct PulseCounter(Arc<AtomicU64>);

impl PulseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn callback(&self) -> EdgeCallback {
        let count = Arc::clone(&self.0);
        Box::new(move |_ts: Instant| {
            count.fetch_add(1, Ordering::AcqRel);
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationResult {
    pub pulse_count: u64,
    pub elapsed_s: f64,
    pub known_rpm: f64,
    /// `pulse_count * 60 / (known_rpm * elapsed_s)`
    pub measured_ppr: f64,
    pub configured_ppr: u32,
}

impl CalibrationResult {
    pub fn compute(
        pulse_count: u64,
        elapsed_s: f64,
        known_rpm: f64,
        configured_ppr: u32,
    ) -> Result<Self, CalibrationError> {
        validate_request(known_rpm, elapsed_s)?;
        if pulse_count == 0 {
            return Err(CalibrationError::NoPulses);
        }
        let measured_ppr = pulse_count as f64 * 60.0 / (known_rpm * elapsed_s);
        Ok(Self {
            pulse_count,
            elapsed_s,
            known_rpm,
            measured_ppr,
            configured_ppr,
        })
    }

    /// Relative deviation of the measured PPR from the configured one, in percent.
    pub fn deviation_percent(&self) -> f64 {
        let configured = f64::from(self.configured_ppr);
        100.0 * (self.measured_ppr - configured) / configured
    }
}

pub(crate) fn validate_request(known_rpm: f64, duration_s: f64) -> Result<(), CalibrationError> {
    if !(known_rpm.is_finite() && known_rpm > 0.0) {
        return Err(CalibrationError::InvalidKnownRpm(known_rpm));
    }
    if !(duration_s.is_finite() && duration_s > 0.0) {
        return Err(CalibrationError::InvalidDuration(duration_s));
    }
    Ok(())
}

/// Validated request turned into the counting window. Durations too long for
/// `Duration` are rejected rather than saturated.
pub(crate) fn request_window(known_rpm: f64, duration_s: f64) -> Result<Duration, CalibrationError> {
    validate_request(known_rpm, duration_s)?;
    Duration::try_from_secs_f64(duration_s).map_err(|_| CalibrationError::InvalidDuration(duration_s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_callback_counts_edges() {
        let counter = PulseCounter::new();
        let mut cb = counter.callback();
        let now = Instant::now();
        for _ in 0..7 {
            cb(now);
        }
        assert_eq!(counter.count(), 7);
    }

    #[test]
    fn ppr_from_counted_pulses() {
        let r = CalibrationResult::compute(500, 3.0, 100.0, 1000).unwrap();
        assert!((r.measured_ppr - 100.0).abs() < 1e-9);
        assert!((r.deviation_percent() + 90.0).abs() < 1e-9);
    }

    #[test]
    fn zero_pulses_is_an_error() {
        assert_eq!(
            CalibrationResult::compute(0, 3.0, 100.0, 1000),
            Err(CalibrationError::NoPulses)
        );
    }

    #[test]
    fn request_validation() {
        assert!(matches!(validate_request(0.0, 1.0), Err(CalibrationError::InvalidKnownRpm(_))));
        assert!(matches!(validate_request(-5.0, 1.0), Err(CalibrationError::InvalidKnownRpm(_))));
        assert!(matches!(validate_request(100.0, 0.0), Err(CalibrationError::InvalidDuration(_))));
        assert!(matches!(
            validate_request(100.0, f64::INFINITY),
            Err(CalibrationError::InvalidDuration(_))
        ));
        assert!(validate_request(100.0, 0.5).is_ok());
    }

    #[test]
    fn window_rejects_durations_beyond_range() {
        assert_eq!(request_window(100.0, 2.5), Ok(Duration::from_millis(2500)));
        assert_eq!(request_window(100.0, 1e20), Err(CalibrationError::InvalidDuration(1e20)));
        assert!(matches!(request_window(0.0, 1e20), Err(CalibrationError::InvalidKnownRpm(_))));
    }
}
