use std::time::{Duration, Instant};

/// Software edge debouncer: accepts an edge only when at least `min_gap`
/// has passed since the previously accepted edge.
#[derive(Debug, Clone)]
pub struct Debouncer {
    min_gap: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(min_gap: Duration) -> Self {
        Self { min_gap, last: None }
    }

    #[inline]
    pub fn accept(&mut self, ts: Instant) -> bool {
        match self.last {
            Some(prev) if ts.saturating_duration_since(prev) < self.min_gap => false,
            _ => {
                self.last = Some(ts);
                true
            }
        }
    }
}

/// Pulse period for a shaft speed, or `None` when the shaft is not turning.
pub fn pulse_period(rpm: f64, ppr: u32) -> Option<Duration> {
    let hz = rpm * f64::from(ppr) / 60.0;
    if !(hz.is_finite() && hz > 0.0) {
        return None;
    }
    Some(Duration::from_secs_f64(1.0 / hz))
}
