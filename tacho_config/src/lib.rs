#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the tachometer.
//!
//! `Config` and its sections are deserialized from TOML and checked with
//! `Config::validate()`. Everything except `[input]` and `[encoder]` has
//! defaults matching a 1000 PPR encoder on a 0..3000 RPM motor.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PullMode {
    Up,
    #[default]
    Down,
    Off,
}

#[derive(Debug, Deserialize)]
pub struct InputCfg {
    /// GPIO line number carrying the encoder pulse train.
    pub pin: u8,
    #[serde(default)]
    pub pull: PullMode,
}

#[derive(Debug, Deserialize)]
pub struct EncoderCfg {
    /// Pulses per revolution.
    pub ppr: u32,
    #[serde(default)]
    pub rpm_min: f64,
    pub rpm_max: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EstimatorCfg {
    pub interval_capacity: usize,
    pub history_capacity: usize,
    /// Most recent intervals used per estimate.
    pub window: usize,
    /// Fewer buffered intervals than this skips the tick.
    pub min_samples: usize,
    /// Windows at least this long get IQR outlier rejection.
    pub iqr_min_window: usize,
    pub iqr_k: f64,
    pub period_ms: u64,
    pub stall_check_ms: u64,
    /// No pulse for longer than this reports the motor as stopped.
    pub stall_timeout_ms: u64,
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
            period_ms: 100,
            stall_check_ms: 500,
            stall_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StatsCfg {
    pub window: usize,
    pub low_speed_rpm: f64,
    /// Fraction of `encoder.rpm_max` above which the motor is "High Speed".
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilterCfg {
    /// Exponential smoothing factor in (0.0, 1.0]; smaller is smoother.
    pub alpha: f64,
    /// Raw changes smaller than this (RPM) are ignored.
    pub deadband_rpm: f64,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            alpha: 0.15,
            deadband_rpm: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    /// JSON-lines log file; console only when unset.
    pub file: Option<String>,
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: Option<String>,
    /// `never`, `daily` or `hourly`. Unset means `never`.
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SnapshotCfg {
    /// Directory receiving `motor_speed_log_<secs>.json` files.
    pub dir: String,
}

impl Default for SnapshotCfg {
    fn default() -> Self {
        Self { dir: ".".into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub input: InputCfg,
    pub encoder: EncoderCfg,
    #[serde(default)]
    pub estimator: EstimatorCfg,
    #[serde(default)]
    pub stats: StatsCfg,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub snapshot: SnapshotCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Encoder
        if self.encoder.ppr == 0 {
            eyre::bail!("encoder.ppr must be > 0");
        }
        if !self.encoder.rpm_min.is_finite() || self.encoder.rpm_min < 0.0 {
            eyre::bail!("encoder.rpm_min must be >= 0");
        }
        if !self.encoder.rpm_max.is_finite() || self.encoder.rpm_max <= self.encoder.rpm_min {
            eyre::bail!("encoder.rpm_max must be > encoder.rpm_min");
        }

        // Estimator
        let est = &self.estimator;
        if est.interval_capacity == 0 {
            eyre::bail!("estimator.interval_capacity must be >= 1");
        }
        if est.history_capacity == 0 {
            eyre::bail!("estimator.history_capacity must be >= 1");
        }
        if est.window == 0 || est.window > est.interval_capacity {
            eyre::bail!("estimator.window must be in [1, interval_capacity]");
        }
        if est.min_samples == 0 {
            eyre::bail!("estimator.min_samples must be >= 1");
        }
        if est.iqr_min_window < 2 {
            eyre::bail!("estimator.iqr_min_window must be >= 2");
        }
        if !(est.iqr_k.is_finite() && est.iqr_k > 0.0) {
            eyre::bail!("estimator.iqr_k must be > 0.0");
        }
        if est.period_ms == 0 {
            eyre::bail!("estimator.period_ms must be >= 1");
        }
        if est.stall_check_ms == 0 {
            eyre::bail!("estimator.stall_check_ms must be >= 1");
        }
        if est.stall_timeout_ms == 0 {
            eyre::bail!("estimator.stall_timeout_ms must be >= 1");
        }
        if est.stall_timeout_ms > 60 * 60 * 1000 {
            eyre::bail!("estimator.stall_timeout_ms is unreasonably large (>1h)");
        }

        // Stats
        if self.stats.window == 0 {
            eyre::bail!("stats.window must be >= 1");
        }
        if !self.stats.low_speed_rpm.is_finite() || self.stats.low_speed_rpm < 0.0 {
            eyre::bail!("stats.low_speed_rpm must be >= 0");
        }
        if !(self.stats.high_speed_ratio > 0.0 && self.stats.high_speed_ratio <= 1.0) {
            eyre::bail!("stats.high_speed_ratio must be in (0.0, 1.0]");
        }

        // Filter
        if !(self.filter.alpha > 0.0 && self.filter.alpha <= 1.0) {
            eyre::bail!("filter.alpha must be in (0.0, 1.0]");
        }
        if !self.filter.deadband_rpm.is_finite() || self.filter.deadband_rpm < 0.0 {
            eyre::bail!("filter.deadband_rpm must be >= 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly");
            }
        }

        Ok(())
    }
}
