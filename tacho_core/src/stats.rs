//! Descriptive statistics over the recent RPM history.
use serde::Serialize;

use crate::config::{EncoderConfig, StatsCfg};
use crate::state::EstimatorState;
use crate::util::{mean, median_sorted, sample_stdev, sort_f64};

/// Fewer history samples than this yield the reduced field set.
pub const MIN_STATS_SAMPLES: usize = 3;
/// Stability is reported as 0 below this many samples.
pub const MIN_STABILITY_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotorStatus {
    Stopped,
    Initializing,
    #[serde(rename = "Low Speed")]
    LowSpeed,
    Normal,
    #[serde(rename = "High Speed")]
    HighSpeed,
}

impl MotorStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MotorStatus::Stopped => "Stopped",
            MotorStatus::Initializing => "Initializing",
            MotorStatus::LowSpeed => "Low Speed",
            MotorStatus::Normal => "Normal",
            MotorStatus::HighSpeed => "High Speed",
        }
    }
}

impl std::fmt::Display for MotorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpmSummary {
    pub avg_rpm: f64,
    pub median_rpm: f64,
    pub std_rpm: f64,
    pub min_rpm: f64,
    pub max_rpm: f64,
    pub pulse_frequency_hz: f64,
    pub stability_percent: f64,
}

/// `summary` is `None` (and omitted from JSON) until enough history exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpmStats {
    pub current_rpm: f64,
    pub samples: usize,
    pub status: MotorStatus,
    #[serde(flatten)]
    pub summary: Option<RpmSummary>,
}

impl RpmStats {
    pub fn is_reduced(&self) -> bool {
        self.summary.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct StatsAggregator {
    encoder: EncoderConfig,
    cfg: StatsCfg,
}

impl StatsAggregator {
    pub fn new(encoder: EncoderConfig, cfg: StatsCfg) -> Self {
        Self { encoder, cfg }
    }

    pub fn compute(&self, state: &EstimatorState) -> RpmStats {
        let current_rpm = state.current_rpm;
        let total = state.history.len();
        if total < MIN_STATS_SAMPLES {
            let status = if current_rpm > 0.0 {
                MotorStatus::Initializing
            } else {
                MotorStatus::Stopped
            };
            return RpmStats {
                current_rpm,
                samples: total,
                status,
                summary: None,
            };
        }

        let recent: Vec<f64> = state.history.recent(self.cfg.window.max(1)).copied().collect();
        let samples = recent.len();
        let mut sorted = recent.clone();
        sort_f64(&mut sorted);
        // recent is non-empty here, the fallbacks are unreachable
        let avg_rpm = mean(&recent).unwrap_or(0.0);
        let median_rpm = median_sorted(&sorted).unwrap_or(0.0);
        let std_rpm = sample_stdev(&recent);
        let min_rpm = sorted.first().copied().unwrap_or(0.0);
        let max_rpm = sorted.last().copied().unwrap_or(0.0);

        let stability_percent = if samples < MIN_STABILITY_SAMPLES {
            0.0
        } else {
            let cv_percent = if avg_rpm > 0.0 {
                100.0 * std_rpm / avg_rpm
            } else {
                0.0
            };
            (100.0 - cv_percent).clamp(0.0, 100.0)
        };

        RpmStats {
            current_rpm,
            samples,
            status: self.classify(current_rpm),
            summary: Some(RpmSummary {
                avg_rpm,
                median_rpm,
                std_rpm,
                min_rpm,
                max_rpm,
                pulse_frequency_hz: self.encoder.rpm_to_hz(current_rpm),
                stability_percent,
            }),
        }
    }

    pub fn classify(&self, rpm: f64) -> MotorStatus {
        if rpm <= 0.0 {
            MotorStatus::Stopped
        } else if rpm < self.cfg.low_speed_rpm {
            MotorStatus::LowSpeed
        } else if rpm > self.cfg.high_speed_ratio * self.encoder.rpm_max() {
            MotorStatus::HighSpeed
        } else {
            MotorStatus::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg() -> StatsAggregator {
        let enc = EncoderConfig::new(1000, 0.0, 3000.0).unwrap();
        StatsAggregator::new(enc, StatsCfg::default())
    }

    #[test]
    fn classification_thresholds() {
        let a = agg();
        assert_eq!(a.classify(0.0), MotorStatus::Stopped);
        assert_eq!(a.classify(99.9), MotorStatus::LowSpeed);
        assert_eq!(a.classify(100.0), MotorStatus::Normal);
        assert_eq!(a.classify(2700.0), MotorStatus::Normal);
        assert_eq!(a.classify(2700.1), MotorStatus::HighSpeed);
    }

    #[test]
    fn status_labels_match_serialized_form() {
        assert_eq!(MotorStatus::LowSpeed.to_string(), "Low Speed");
        assert_eq!(MotorStatus::HighSpeed.as_str(), "High Speed");
    }
}
