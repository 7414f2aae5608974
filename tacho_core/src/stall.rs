//! Stall detection: no pulse within the timeout means the shaft stopped.
use std::time::{Duration, Instant};

use crate::state::{EstimatorState, MotionState};

#[derive(Debug, Clone, Copy)]
pub struct StallMonitor {
    timeout: Duration,
}

impl StallMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Zero the speed and drop buffered intervals if the shaft has been idle
    /// longer than the timeout. Returns `true` on the Running → Stalled
    /// transition.
    ///
    /// History is kept so statistics still describe the last run.
    pub fn check(&self, state: &mut EstimatorState, now: Instant) -> bool {
        let Some(idle) = state.idle_for(now) else {
            return false;
        };
        if idle <= self.timeout {
            return false;
        }
        state.current_rpm = 0.0;
        state.intervals.clear();
        if state.motion == MotionState::Running {
            state.motion = MotionState::Stalled;
            tracing::info!(idle_ms = idle.as_millis() as u64, "motor stalled");
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_beyond_timeout_zeroes_speed() {
        let t0 = Instant::now();
        let mut st = EstimatorState::new(50, 100);
        st.intervals.push(0.01);
        st.current_rpm = 600.0;
        st.motion = MotionState::Running;
        st.last_pulse_time = Some(t0);

        let mon = StallMonitor::new(Duration::from_secs(2));
        assert!(!mon.check(&mut st, t0 + Duration::from_millis(1999)));
        assert_eq!(st.current_rpm, 600.0);

        assert!(mon.check(&mut st, t0 + Duration::from_millis(2001)));
        assert_eq!(st.current_rpm, 0.0);
        assert!(st.intervals.is_empty());
        assert_eq!(st.motion, MotionState::Stalled);

        // already stalled: no second transition
        assert!(!mon.check(&mut st, t0 + Duration::from_secs(5)));
    }

    #[test]
    fn no_reference_point_never_stalls() {
        let mut st = EstimatorState::new(50, 100);
        let mon = StallMonitor::new(Duration::from_millis(10));
        assert!(!mon.check(&mut st, Instant::now()));
    }
}
