//! The owned tachometer: one input pin, one capture callback, two workers.
//!
//! Lock order is input → state. The edge callback and the workers only take
//! the state lock.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tacho_traits::{Clock, Edge, EdgeInput, InputState, Pull};

use crate::builder::TachometerBuilder;
use crate::calibration::{CalibrationResult, PulseCounter, request_window};
use crate::capture::{IntervalLimits, PulseCapture};
use crate::config::{EncoderConfig, EstimatorCfg};
use crate::error::{CalibrationError, Result, TachoError};
use crate::estimator::RpmEstimator;
use crate::hw_error::{map_calibration_hw_error, map_hw_error};
use crate::snapshot::{Snapshot, unix_millis};
use crate::stall::StallMonitor;
use crate::state::{MotionState, SharedState};
use crate::stats::{RpmStats, StatsAggregator};
use crate::worker::PeriodicWorker;

/// Counter debounce while calibrating; the fastest the input layer allows.
const CALIBRATION_DEBOUNCE: Duration = Duration::from_millis(1);

struct Workers {
    _estimator: PeriodicWorker,
    _stall: PeriodicWorker,
}

pub struct Tachometer<I: EdgeInput + Send + 'static> {
    pub(crate) encoder: EncoderConfig,
    pub(crate) estimator_cfg: EstimatorCfg,
    pub(crate) stats: StatsAggregator,
    pub(crate) pin: u8,
    pub(crate) pull: Pull,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) shared: Arc<SharedState>,
    pub(crate) input: Mutex<I>,
    workers: Mutex<Option<Workers>>,
    running: AtomicBool,
    calibrating: AtomicBool,
    /// Set when `start` claimed the pin, so `stop` must release it.
    owns_pin: AtomicBool,
}

impl<I: EdgeInput + Send + 'static> std::fmt::Debug for Tachometer<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tachometer")
            .field("pin", &self.pin)
            .field("encoder", &self.encoder)
            .field("running", &self.is_running())
            .field("current_rpm", &self.current_rpm())
            .finish()
    }
}

impl<I: EdgeInput + Send + 'static> Tachometer<I> {
    pub fn builder() -> TachometerBuilder<I> {
        TachometerBuilder::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        input: I,
        encoder: EncoderConfig,
        estimator_cfg: EstimatorCfg,
        stats: StatsAggregator,
        pin: u8,
        pull: Pull,
        clock: Arc<dyn Clock + Send + Sync>,
        shared: Arc<SharedState>,
    ) -> Self {
        Self {
            encoder,
            estimator_cfg,
            stats,
            pin,
            pull,
            clock,
            shared,
            input: Mutex::new(input),
            workers: Mutex::new(None),
            running: AtomicBool::new(false),
            calibrating: AtomicBool::new(false),
            owns_pin: AtomicBool::new(false),
        }
    }

    pub fn encoder(&self) -> &EncoderConfig {
        &self.encoder
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating.load(Ordering::Acquire)
    }

    /// Latest accepted RPM; exactly 0 when stopped or stalled.
    pub fn current_rpm(&self) -> f64 {
        self.shared.lock().current_rpm()
    }

    pub fn motion(&self) -> MotionState {
        self.shared.lock().motion()
    }

    /// Accepted RPM samples, oldest first.
    pub fn history(&self) -> Vec<f64> {
        self.shared.lock().history().to_vec()
    }

    pub fn stats(&self) -> RpmStats {
        self.stats.compute(&self.shared.lock())
    }

    pub fn export_snapshot(&self) -> Snapshot {
        let (rpm_history, stats) = {
            let st = self.shared.lock();
            (st.history().to_vec(), self.stats.compute(&st))
        };
        Snapshot {
            timestamp: unix_millis(SystemTime::now()),
            ppr: self.encoder.pulses_per_rev(),
            rpm_range: [self.encoder.rpm_min(), self.encoder.rpm_max()],
            rpm_history,
            stats,
        }
    }

    /// Configure the pin, register the capture callback and spawn the
    /// estimator and stall workers.
    pub fn start(&self) -> Result<()> {
        {
            // Calibration claims its flag under the same lock.
            let mut input = self.lock_input();
            if self.is_calibrating() {
                return Err(TachoError::State("calibration in progress".into()));
            }
            if self.running.swap(true, Ordering::AcqRel) {
                return Err(TachoError::State("tachometer already running".into()));
            }
            if let Err(e) = self.arm(&mut input) {
                self.running.store(false, Ordering::Release);
                return Err(e);
            }
        }
        match self.spawn_workers() {
            Ok(workers) => *self.lock_workers() = Some(workers),
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.teardown();
                return Err(e);
            }
        }

        tracing::info!(
            pin = self.pin,
            ppr = self.encoder.pulses_per_rev(),
            rpm_min = self.encoder.rpm_min(),
            rpm_max = self.encoder.rpm_max(),
            bounce_ms = self.encoder.bounce_ms(),
            "tachometer started"
        );
        Ok(())
    }

    /// Deregister the callback, join the workers and release the pin.
    /// Safe to call repeatedly and before `start`.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.teardown();
        tracing::info!(pin = self.pin, "tachometer stopped");
    }

    /// Measure the encoder's actual pulses per revolution while the shaft
    /// turns at `known_rpm`, counting edges for `duration_s` seconds.
    ///
    /// The capture callback is swapped out and the workers are paused for
    /// the whole window. Both are restored on every exit path, unwinding
    /// included.
    pub fn calibrate(
        &self,
        known_rpm: f64,
        duration_s: f64,
    ) -> std::result::Result<CalibrationResult, CalibrationError> {
        let window = request_window(known_rpm, duration_s)?;
        let counter = PulseCounter::new();
        let session = self.begin_calibration(&counter)?;
        tracing::info!(known_rpm, duration_s, "calibration started");

        let started = self.clock.now();
        self.clock.sleep(window);
        let elapsed_s = self.clock.elapsed_s(started);

        let outcome = session.finish().and_then(|()| {
            CalibrationResult::compute(
                counter.count(),
                elapsed_s,
                known_rpm,
                self.encoder.pulses_per_rev(),
            )
        });

        match &outcome {
            Ok(r) => tracing::info!(
                pulses = r.pulse_count,
                elapsed_s = r.elapsed_s,
                measured_ppr = r.measured_ppr,
                configured_ppr = r.configured_ppr,
                "calibration finished"
            ),
            Err(e) => tracing::warn!(error = %e, "calibration failed"),
        }
        outcome
    }

    /// Claim the calibration slot and swap the counter in, both under the
    /// input lock so a concurrent `start` sees either the counter or nothing.
    fn begin_calibration(
        &self,
        counter: &PulseCounter,
    ) -> std::result::Result<CalibrationSession<'_, I>, CalibrationError> {
        let mut input = self.lock_input();
        if self
            .calibrating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CalibrationError::Busy);
        }
        self.shared.set_paused(true);

        let mut session = CalibrationSession {
            tacho: self,
            owns_pin: false,
            swapped: false,
        };
        session.owns_pin = self.swap_in_counter(&mut input, counter)?;
        session.swapped = true;
        Ok(session)
    }

    /// Put the counter in the callback slot. Returns whether the pin was
    /// configured just for this calibration.
    fn swap_in_counter(
        &self,
        input: &mut I,
        counter: &PulseCounter,
    ) -> std::result::Result<bool, CalibrationError> {
        let owns_pin = if self.is_running() {
            input
                .deregister_callback(self.pin)
                .map_err(|e| map_calibration_hw_error(&*e))?;
            false
        } else {
            let state = input
                .configure_input(self.pin, self.pull)
                .map_err(|e| map_calibration_hw_error(&*e))?;
            state == InputState::Configured
        };

        if let Err(e) = input.register_edge_callback(
            self.pin,
            Edge::Rising,
            CALIBRATION_DEBOUNCE,
            counter.callback(),
        ) {
            let err = map_calibration_hw_error(&*e);
            if let Err(restore_err) = self.restore_capture(input, owns_pin) {
                tracing::warn!(error = %restore_err, "restoring capture after failed swap");
            }
            return Err(err);
        }
        Ok(owns_pin)
    }

    /// Remove the counter and put capture back if the tachometer is running.
    fn restore_capture(&self, input: &mut I, owns_pin: bool) -> std::result::Result<(), CalibrationError> {
        let mut first_err = None;
        if let Err(e) = input.deregister_callback(self.pin) {
            first_err.get_or_insert(map_calibration_hw_error(&*e));
        }
        if self.is_running() {
            if let Err(e) = input.register_edge_callback(
                self.pin,
                Edge::Rising,
                self.encoder.bounce(),
                self.capture().into_callback(),
            ) {
                first_err.get_or_insert(map_calibration_hw_error(&*e));
            }
            self.shared.lock().rearm(self.clock.now());
        } else if owns_pin {
            if let Err(e) = input.release(self.pin) {
                first_err.get_or_insert(map_calibration_hw_error(&*e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn capture(&self) -> PulseCapture {
        let limits = IntervalLimits::new(&self.encoder, self.estimator_cfg.stall_timeout);
        PulseCapture::new(Arc::clone(&self.shared), limits)
    }

    /// Claim the pin and register capture, undoing the claim on failure.
    fn arm(&self, input: &mut I) -> Result<()> {
        match input
            .configure_input(self.pin, self.pull)
            .map_err(|e| map_hw_error(&*e))?
        {
            InputState::Configured => {
                self.owns_pin.store(true, Ordering::Release);
                tracing::debug!(pin = self.pin, pull = ?self.pull, "input configured");
            }
            InputState::AlreadyConfigured => {
                tracing::debug!(pin = self.pin, "input already configured; reusing");
            }
        }

        self.shared.lock().restart();
        let registered = input.register_edge_callback(
            self.pin,
            Edge::Rising,
            self.encoder.bounce(),
            self.capture().into_callback(),
        );
        if let Err(e) = registered {
            let err = map_hw_error(&*e);
            self.release_owned_pin(input);
            return Err(err);
        }
        Ok(())
    }

    fn spawn_workers(&self) -> Result<Workers> {
        let shared = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.clock);
        let mut estimator = RpmEstimator::new(&self.encoder, &self.estimator_cfg);
        let est = PeriodicWorker::spawn("tacho-estimator", self.estimator_cfg.period, move || {
            if shared.is_paused() {
                return;
            }
            let now = clock.now();
            estimator.tick(&mut shared.lock(), now);
        })
        .map_err(|e| TachoError::Io(e.to_string()))?;

        let shared = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.clock);
        let monitor = StallMonitor::new(self.estimator_cfg.stall_timeout);
        let stall = PeriodicWorker::spawn(
            "tacho-stall",
            self.estimator_cfg.stall_check_period,
            move || {
                if shared.is_paused() {
                    return;
                }
                let now = clock.now();
                monitor.check(&mut shared.lock(), now);
            },
        )
        .map_err(|e| TachoError::Io(e.to_string()))?;

        Ok(Workers {
            _estimator: est,
            _stall: stall,
        })
    }

    /// Callback first, then workers, then the pin.
    fn teardown(&self) {
        let mut input = self.lock_input();
        if let Err(e) = input.deregister_callback(self.pin) {
            tracing::warn!(pin = self.pin, error = %e, "deregistering edge callback failed");
        }
        drop(self.lock_workers().take());
        self.release_owned_pin(&mut input);
    }

    fn release_owned_pin(&self, input: &mut I) {
        if self.owns_pin.swap(false, Ordering::AcqRel) {
            if let Err(e) = input.release(self.pin) {
                tracing::warn!(pin = self.pin, error = %e, "releasing input failed");
            }
        }
    }

    fn lock_input(&self) -> MutexGuard<'_, I> {
        self.input.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_workers(&self) -> MutexGuard<'_, Option<Workers>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Live calibration window. Dropping it restores capture, resumes the
/// workers and frees the calibration slot.
struct CalibrationSession<'a, I: EdgeInput + Send + 'static> {
    tacho: &'a Tachometer<I>,
    owns_pin: bool,
    /// The counter occupies the callback slot.
    swapped: bool,
}

impl<I: EdgeInput + Send + 'static> CalibrationSession<'_, I> {
    /// Restore capture and report the first hardware error, if any.
    fn finish(mut self) -> std::result::Result<(), CalibrationError> {
        self.swapped = false;
        let mut input = self.tacho.lock_input();
        self.tacho.restore_capture(&mut input, self.owns_pin)
    }
}

impl<I: EdgeInput + Send + 'static> Drop for CalibrationSession<'_, I> {
    fn drop(&mut self) {
        if self.swapped {
            let mut input = self.tacho.lock_input();
            if let Err(e) = self.tacho.restore_capture(&mut input, self.owns_pin) {
                tracing::warn!(error = %e, "restoring capture after aborted calibration");
            }
        }
        self.tacho.shared.set_paused(false);
        self.tacho.calibrating.store(false, Ordering::Release);
    }
}

impl<I: EdgeInput + Send + 'static> Drop for Tachometer<I> {
    fn drop(&mut self) {
        self.stop();
    }
}
