//! Estimator state shared between the edge callback and the periodic workers.
//!
//! Every read and write goes through the single mutex in `SharedState`; the
//! lock only ever guards in-memory updates, never I/O or sleeping.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::buffer::{IntervalBuffer, RpmHistory};
use crate::config::EstimatorCfg;

/// Running ⇄ Stalled motion state of one capture channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Running,
    Stalled,
}

#[derive(Debug)]
pub struct EstimatorState {
    pub(crate) intervals: IntervalBuffer,
    pub(crate) history: RpmHistory,
    pub(crate) current_rpm: f64,
    pub(crate) last_pulse_time: Option<Instant>,
    /// Stall reference used while no pulse has been seen since a re-arm.
    pub(crate) idle_since: Option<Instant>,
    pub(crate) motion: MotionState,
}

impl EstimatorState {
    pub fn new(interval_capacity: usize, history_capacity: usize) -> Self {
        Self {
            intervals: IntervalBuffer::new(interval_capacity),
            history: RpmHistory::new(history_capacity),
            current_rpm: 0.0,
            last_pulse_time: None,
            idle_since: None,
            motion: MotionState::Stalled,
        }
    }

    pub fn from_cfg(cfg: &EstimatorCfg) -> Self {
        Self::new(cfg.interval_capacity, cfg.history_capacity)
    }

    pub fn intervals(&self) -> &IntervalBuffer {
        &self.intervals
    }

    pub fn history(&self) -> &RpmHistory {
        &self.history
    }

    pub fn current_rpm(&self) -> f64 {
        self.current_rpm
    }

    pub fn last_pulse_time(&self) -> Option<Instant> {
        self.last_pulse_time
    }

    pub fn motion(&self) -> MotionState {
        self.motion
    }

    /// Time without pulses as seen from `now`, or `None` if there is no
    /// reference point (never pulsed, never re-armed).
    pub fn idle_for(&self, now: Instant) -> Option<Duration> {
        self.last_pulse_time
            .or(self.idle_since)
            .map(|t| now.saturating_duration_since(t))
    }

    /// Forget in-flight capture data and restart the stall clock at `now`.
    ///
    /// `current_rpm` and the history are kept; the stall monitor zeroes the
    /// speed if no pulse follows within the timeout.
    pub fn rearm(&mut self, now: Instant) {
        self.intervals.clear();
        self.last_pulse_time = None;
        self.idle_since = Some(now);
    }

    /// Fresh capture session: like `rearm` but also reports zero speed.
    pub(crate) fn restart(&mut self) {
        self.intervals.clear();
        self.last_pulse_time = None;
        self.idle_since = None;
        self.current_rpm = 0.0;
        self.motion = MotionState::Stalled;
    }
}

/// `EstimatorState` behind its mutex plus the worker pause flag.
#[derive(Debug)]
pub struct SharedState {
    state: Mutex<EstimatorState>,
    paused: AtomicBool,
}

impl SharedState {
    pub fn new(state: EstimatorState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            paused: AtomicBool::new(false),
        })
    }

    /// Lock the state. A panic while holding the lock cannot leave the
    /// buffers structurally invalid, so poisoning is ignored.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, EstimatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Workers skip their ticks while paused (during calibration).
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }
}
