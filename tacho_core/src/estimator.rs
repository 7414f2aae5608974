//! Interval window → RPM estimation.
//!
//! Each tick takes the most recent `window` intervals, trims outliers outside
//! the Tukey fences `[q1 - k*iqr, q3 + k*iqr]` once the window is long enough,
//! and converts the median interval to RPM. A single glitch pulse (contact
//! bounce, EMI) moves the median very little, so it never reaches the output.
//! Out-of-range results are dropped and the previous estimate is kept.

use std::time::{Duration, Instant};

use crate::config::{EncoderConfig, EstimatorCfg};
use crate::state::{EstimatorState, MotionState};
use crate::util::{median_sorted, percentile_sorted, sort_f64};

#[derive(Debug, Clone)]
pub struct RpmEstimator {
    encoder: EncoderConfig,
    window: usize,
    min_samples: usize,
    iqr_min_window: usize,
    iqr_k: f64,
    stall_timeout: Duration,
    // Scratch buffers reused across ticks.
    recent: Vec<f64>,
    sorted: Vec<f64>,
}

impl RpmEstimator {
    pub fn new(encoder: &EncoderConfig, cfg: &EstimatorCfg) -> Self {
        Self {
            encoder: *encoder,
            window: cfg.window.max(1),
            min_samples: cfg.min_samples.max(1),
            iqr_min_window: cfg.iqr_min_window,
            iqr_k: cfg.iqr_k,
            stall_timeout: cfg.stall_timeout,
            recent: Vec::with_capacity(cfg.window.max(1)),
            sorted: Vec::with_capacity(cfg.window.max(1)),
        }
    }

    /// Raw RPM from the tail of `intervals` (seconds), before range checking.
    ///
    /// Returns `None` for an empty input or a non-positive median.
    pub fn estimate(&mut self, intervals: &[f64]) -> Option<f64> {
        let skip = intervals.len().saturating_sub(self.window);
        self.recent.clear();
        self.recent.extend_from_slice(&intervals[skip..]);
        self.window_rpm()
    }

    fn window_rpm(&mut self) -> Option<f64> {
        if self.recent.len() >= self.iqr_min_window {
            self.sorted.clear();
            self.sorted.extend_from_slice(&self.recent);
            sort_f64(&mut self.sorted);
            if let (Some(q1), Some(q3)) = (
                percentile_sorted(&self.sorted, 25.0),
                percentile_sorted(&self.sorted, 75.0),
            ) {
                let iqr = q3 - q1;
                let lo = q1 - self.iqr_k * iqr;
                let hi = q3 + self.iqr_k * iqr;
                let kept = self.recent.iter().filter(|&&x| lo <= x && x <= hi).count();
                // Everything fenced out: keep the unfiltered window.
                if kept > 0 {
                    self.recent.retain(|&x| lo <= x && x <= hi);
                }
            }
        }

        self.sorted.clear();
        self.sorted.extend_from_slice(&self.recent);
        sort_f64(&mut self.sorted);
        let median_interval = median_sorted(&self.sorted)?;
        if !(median_interval.is_finite() && median_interval > 0.0) {
            return None;
        }
        let frequency = 1.0 / median_interval;
        Some(frequency * 60.0 / f64::from(self.encoder.pulses_per_rev()))
    }

    /// One estimation pass over the shared state. Returns the accepted RPM.
    pub fn tick(&mut self, state: &mut EstimatorState, now: Instant) -> Option<f64> {
        if state.intervals.len() < self.min_samples {
            if state.intervals.is_empty()
                && state.idle_for(now).is_none_or(|idle| idle > self.stall_timeout)
            {
                state.current_rpm = 0.0;
            }
            return None;
        }

        let skip = state.intervals.len().saturating_sub(self.window);
        self.recent.clear();
        self.recent.extend(state.intervals.iter().skip(skip).copied());
        let rpm = self.window_rpm()?;

        if !self.encoder.contains_rpm(rpm) {
            tracing::trace!(rpm, "estimate out of range; keeping previous");
            return None;
        }
        state.current_rpm = rpm;
        state.history.push(rpm);
        if state.motion == MotionState::Stalled {
            state.motion = MotionState::Running;
            tracing::info!(rpm, "motor running");
        }
        tracing::trace!(rpm, window = self.recent.len(), "rpm estimate");
        Some(rpm)
    }
}
