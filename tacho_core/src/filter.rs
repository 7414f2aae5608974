//! Consumer-side smoothing for displayed RPM.
//!
//! Not used by the estimator itself. A raw value within the deadband of the
//! previous raw input is treated as noise and replaced by that previous
//! input before being folded into an exponential moving average. The first
//! value seeds the average.
use crate::config::FilterCfg;
use crate::error::{Result, TachoError};

#[derive(Debug, Clone)]
pub struct RpmFilter {
    alpha: f64,
    deadband_rpm: f64,
    last_raw: f64,
    filtered: Option<f64>,
}

impl RpmFilter {
    pub fn new(alpha: f64, deadband_rpm: f64) -> Result<Self> {
        if !(alpha.is_finite() && alpha > 0.0 && alpha <= 1.0) {
            return Err(TachoError::Config(format!("filter alpha must be in (0, 1], got {alpha}")));
        }
        if !(deadband_rpm.is_finite() && deadband_rpm >= 0.0) {
            return Err(TachoError::Config(format!(
                "filter deadband must be >= 0, got {deadband_rpm}"
            )));
        }
        Ok(Self {
            alpha,
            deadband_rpm,
            last_raw: 0.0,
            filtered: None,
        })
    }

    pub fn from_cfg(cfg: &FilterCfg) -> Result<Self> {
        Self::new(cfg.alpha, cfg.deadband_rpm)
    }

    pub fn filter(&mut self, raw_rpm: f64) -> f64 {
        let raw_rpm = if (raw_rpm - self.last_raw).abs() < self.deadband_rpm {
            self.last_raw
        } else {
            raw_rpm
        };
        let next = match self.filtered {
            None => raw_rpm,
            Some(prev) => self.alpha * raw_rpm + (1.0 - self.alpha) * prev,
        };
        self.filtered = Some(next);
        self.last_raw = raw_rpm;
        next
    }

    /// Current smoothed value; 0 before the first accepted input.
    pub fn value(&self) -> f64 {
        self.filtered.unwrap_or(0.0)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn deadband_rpm(&self) -> f64 {
        self.deadband_rpm
    }

    pub fn reset(&mut self) {
        self.last_raw = 0.0;
        self.filtered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_seeds_average() {
        let mut f = RpmFilter::new(0.1, 5.0).unwrap();
        assert_eq!(f.filter(1000.0), 1000.0);
    }

    #[test]
    fn deadband_suppresses_small_changes() {
        let mut f = RpmFilter::new(0.5, 10.0).unwrap();
        f.filter(1000.0);
        assert_eq!(f.filter(1005.0), 1000.0);
        assert_eq!(f.filter(995.0), 1000.0);
        // outside deadband: EMA step
        assert_eq!(f.filter(1100.0), 1050.0);
    }

    #[test]
    fn jitter_keeps_pulling_toward_last_accepted_input() {
        let mut f = RpmFilter::new(0.5, 10.0).unwrap();
        f.filter(1000.0);
        f.filter(1100.0); // 1050
        // 1104 is jitter around 1100, so the average still moves toward 1100
        assert_eq!(f.filter(1104.0), 1075.0);
    }

    #[test]
    fn values_near_zero_start_inside_deadband() {
        let mut f = RpmFilter::new(0.5, 10.0).unwrap();
        assert_eq!(f.filter(3.0), 0.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(RpmFilter::new(0.0, 5.0).is_err());
        assert!(RpmFilter::new(1.5, 5.0).is_err());
        assert!(RpmFilter::new(0.5, -1.0).is_err());
        assert!(RpmFilter::new(1.0, 0.0).is_ok());
    }
}
