//! Conversions from `tacho_config` sections to the core runtime structs.

use std::time::Duration;

use tacho_traits::Pull;

use crate::config::{EncoderConfig, EstimatorCfg, FilterCfg, StatsCfg};
use crate::error::TachoError;

// ── EncoderConfig ────────────────────────────────────────────────────────────

impl TryFrom<&tacho_config::EncoderCfg> for EncoderConfig {
    type Error = TachoError;

    fn try_from(c: &tacho_config::EncoderCfg) -> Result<Self, Self::Error> {
        EncoderConfig::new(c.ppr, c.rpm_min, c.rpm_max)
    }
}

// ── EstimatorCfg ─────────────────────────────────────────────────────────────

impl From<&tacho_config::EstimatorCfg> for EstimatorCfg {
    fn from(c: &tacho_config::EstimatorCfg) -> Self {
        Self {
            interval_capacity: c.interval_capacity,
            history_capacity: c.history_capacity,
            window: c.window,
            min_samples: c.min_samples,
            iqr_min_window: c.iqr_min_window,
            iqr_k: c.iqr_k,
            period: Duration::from_millis(c.period_ms),
            stall_check_period: Duration::from_millis(c.stall_check_ms),
            stall_timeout: Duration::from_millis(c.stall_timeout_ms),
        }
    }
}

// ── StatsCfg / FilterCfg ─────────────────────────────────────────────────────

impl From<&tacho_config::StatsCfg> for StatsCfg {
    fn from(c: &tacho_config::StatsCfg) -> Self {
        Self {
            window: c.window,
            low_speed_rpm: c.low_speed_rpm,
            high_speed_ratio: c.high_speed_ratio,
        }
    }
}

impl From<&tacho_config::FilterCfg> for FilterCfg {
    fn from(c: &tacho_config::FilterCfg) -> Self {
        Self {
            alpha: c.alpha,
            deadband_rpm: c.deadband_rpm,
        }
    }
}

// ── Pull ─────────────────────────────────────────────────────────────────────

/// Bias setting for the input pin. Both enums live in foreign crates, so this
/// is a function rather than a `From` impl.
pub fn pull_from_cfg(p: tacho_config::PullMode) -> Pull {
    match p {
        tacho_config::PullMode::Up => Pull::Up,
        tacho_config::PullMode::Down => Pull::Down,
        tacho_config::PullMode::Off => Pull::Off,
    }
}
