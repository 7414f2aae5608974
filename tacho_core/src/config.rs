//! Runtime configuration for the tachometer.
//!
//! These are the validated structs used by `Tachometer` and its workers.
//! They are separate from the TOML-deserialized config in `tacho_config`.

use std::time::Duration;

use crate::error::{Result, TachoError};

/// Encoder resolution and plausible speed range, with the derived pulse
/// frequency and interval bounds. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    pulses_per_rev: u32,
    rpm_min: f64,
    rpm_max: f64,
    min_freq_hz: f64,
    max_freq_hz: f64,
    min_interval_s: f64,
    max_interval_s: f64,
}

impl EncoderConfig {
    pub fn new(pulses_per_rev: u32, rpm_min: f64, rpm_max: f64) -> Result<Self> {
        if pulses_per_rev == 0 {
            return Err(TachoError::Config("pulses_per_rev must be > 0".into()));
        }
        if !rpm_min.is_finite() || rpm_min < 0.0 {
            return Err(TachoError::Config(format!("rpm_min must be >= 0, got {rpm_min}")));
        }
        if !rpm_max.is_finite() || rpm_max <= rpm_min {
            return Err(TachoError::Config(format!(
                "rpm_max must be > rpm_min, got {rpm_min}..{rpm_max}"
            )));
        }
        let ppr = f64::from(pulses_per_rev);
        let min_freq_hz = rpm_min * ppr / 60.0;
        let max_freq_hz = rpm_max * ppr / 60.0;
        Ok(Self {
            pulses_per_rev,
            rpm_min,
            rpm_max,
            min_freq_hz,
            max_freq_hz,
            min_interval_s: 1.0 / max_freq_hz,
            max_interval_s: 1.0 / min_freq_hz.max(1.0),
        })
    }

    pub fn pulses_per_rev(&self) -> u32 {
        self.pulses_per_rev
    }
    pub fn rpm_min(&self) -> f64 {
        self.rpm_min
    }
    pub fn rpm_max(&self) -> f64 {
        self.rpm_max
    }
    pub fn min_freq_hz(&self) -> f64 {
        self.min_freq_hz
    }
    pub fn max_freq_hz(&self) -> f64 {
        self.max_freq_hz
    }
    /// Shortest plausible pulse interval (at `rpm_max`).
    pub fn min_interval_s(&self) -> f64 {
        self.min_interval_s
    }
    /// Longest in-range pulse interval (at `rpm_min`, floored at 1 Hz).
    pub fn max_interval_s(&self) -> f64 {
        self.max_interval_s
    }

    /// Edge debounce: `30000 / max_freq_hz` ms truncated, clamped to 1..=10 ms.
    pub fn bounce_ms(&self) -> u64 {
        let raw = 30_000.0 / self.max_freq_hz;
        if raw.is_finite() {
            (raw as u64).clamp(1, 10)
        } else {
            10
        }
    }

    pub fn bounce(&self) -> Duration {
        Duration::from_millis(self.bounce_ms())
    }

    /// Expected pulse frequency at `rpm`.
    #[inline]
    pub fn rpm_to_hz(&self, rpm: f64) -> f64 {
        rpm * f64::from(self.pulses_per_rev) / 60.0
    }

    #[inline]
    pub fn contains_rpm(&self, rpm: f64) -> bool {
        rpm >= self.rpm_min && rpm <= self.rpm_max
    }
}

/// Capture buffers, estimator window and worker cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorCfg {
    pub interval_capacity: usize,
    pub history_capacity: usize,
    /// Most recent intervals considered per estimate.
    pub window: usize,
    /// Below this many buffered intervals the tick is skipped.
    pub min_samples: usize,
    /// Windows at least this long get IQR outlier rejection.
    pub iqr_min_window: usize,
    /// Fence multiplier: values outside `[q1 - k*iqr, q3 + k*iqr]` are dropped.
    pub iqr_k: f64,
    pub period: Duration,
    pub stall_check_period: Duration,
    pub stall_timeout: Duration,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            interval_capacity: 50,
            history_capacity: 100,
            window: 10,
            min_samples: 3,
            iqr_min_window: 5,
            iqr_k: 1.5,
            period: Duration::from_millis(100),
            stall_check_period: Duration::from_millis(500),
            stall_timeout: Duration::from_secs(2),
        }
    }
}

impl EstimatorCfg {
    pub(crate) fn check(&self) -> std::result::Result<(), &'static str> {
        if self.interval_capacity == 0 || self.history_capacity == 0 {
            return Err("buffer capacities must be >= 1");
        }
        if self.window == 0 || self.window > self.interval_capacity {
            return Err("window must be in [1, interval_capacity]");
        }
        if self.min_samples == 0 {
            return Err("min_samples must be >= 1");
        }
        if !(self.iqr_k.is_finite() && self.iqr_k > 0.0) {
            return Err("iqr_k must be > 0");
        }
        if self.period.is_zero() || self.stall_check_period.is_zero() {
            return Err("worker periods must be > 0");
        }
        if self.stall_timeout.is_zero() {
            return Err("stall_timeout must be > 0");
        }
        Ok(())
    }
}

/// Statistics window and status thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsCfg {
    pub window: usize,
    pub low_speed_rpm: f64,
    pub high_speed_ratio: f64,
}

impl Default for StatsCfg {
    fn default() -> Self {
        Self {
            window: 20,
            low_speed_rpm: 100.0,
            high_speed_ratio: 0.9,
        }
    }
}

/// Consumer-side smoothing parameters for `RpmFilter`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCfg {
    /// Range: (0.0, 1.0]; smaller values smooth harder.
    pub alpha: f64,
    pub deadband_rpm: f64,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            deadband_rpm: 5.0,
        }
    }
}
