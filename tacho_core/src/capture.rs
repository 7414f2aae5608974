//! Edge-to-interval capture. Runs in the input driver's callback context, so
//! the work per edge is one timestamp compare and one bounded push.
use std::sync::Arc;
use std::time::{Duration, Instant};

use tacho_traits::EdgeCallback;

use crate::config::EncoderConfig;
use crate::state::{EstimatorState, SharedState};

/// Interval plausibility bounds derived from the encoder range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalLimits {
    pub min_s: f64,
    pub max_s: f64,
    pub stall_s: f64,
}

impl IntervalLimits {
    pub fn new(encoder: &EncoderConfig, stall_timeout: Duration) -> Self {
        Self {
            min_s: encoder.min_interval_s(),
            max_s: encoder.max_interval_s(),
            stall_s: stall_timeout.as_secs_f64(),
        }
    }

    /// In range, or slower than range but still short of a stall.
    #[inline]
    pub fn accepts(&self, dt_s: f64) -> bool {
        (self.min_s <= dt_s && dt_s <= self.max_s) || (dt_s > self.max_s && dt_s < self.stall_s)
    }
}

impl EstimatorState {
    /// Record an edge at `ts`. Returns whether an interval was buffered.
    ///
    /// The timestamp is always remembered, even when the interval is rejected.
    #[inline]
    pub fn record_pulse(&mut self, ts: Instant, limits: &IntervalLimits) -> bool {
        let accepted = match self.last_pulse_time {
            Some(prev) => {
                let dt = ts.saturating_duration_since(prev).as_secs_f64();
                if limits.accepts(dt) {
                    self.intervals.push(dt);
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        self.last_pulse_time = Some(ts);
        accepted
    }
}

/// Edge handler bound to a shared estimator state.
#[derive(Debug, Clone)]
pub struct PulseCapture {
    shared: Arc<SharedState>,
    limits: IntervalLimits,
}

impl PulseCapture {
    pub fn new(shared: Arc<SharedState>, limits: IntervalLimits) -> Self {
        Self { shared, limits }
    }

    #[inline]
    pub fn on_edge(&self, ts: Instant) -> bool {
        self.shared.lock().record_pulse(ts, &self.limits)
    }

    pub fn into_callback(self) -> EdgeCallback {
        Box::new(move |ts| {
            self.on_edge(ts);
        })
    }
}
