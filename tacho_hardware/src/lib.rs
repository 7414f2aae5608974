//! Encoder input backends.
//!
//! `SimulatedEncoder` produces a synthetic pulse train on its own thread so the
//! full capture pipeline runs without hardware. `GpioInput` (feature
//! `hardware`) delivers real edges through rppal async interrupts.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod util;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tacho_traits::{Edge, EdgeCallback, EdgeInput, HwResult, InputState, Pull};

use crate::error::HwError;
use crate::util::pulse_period;

/// Speed knob shared between a `SimulatedEncoder` and its generator thread.
///
/// Stored as `f64` bits so the generator can read it lock-free.
#[derive(Debug, Clone)]
pub struct SimSpeed(Arc<AtomicU64>);

impl SimSpeed {
    pub fn set_rpm(&self, rpm: f64) {
        self.0.store(rpm.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn rpm(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

struct Generator {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl Generator {
    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "simulated encoder thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Simulated encoder: emits one rising edge every `60 / (rpm * ppr)` seconds
/// while a callback is registered. A speed of 0 RPM emits nothing.
///
/// Edges are clean, so the requested debounce is recorded but not applied.
pub struct SimulatedEncoder {
    ppr: u32,
    speed: SimSpeed,
    configured: HashMap<u8, Pull>,
    generators: HashMap<u8, Generator>,
}

impl SimulatedEncoder {
    pub fn new(ppr: u32, rpm: f64) -> Self {
        let speed = SimSpeed(Arc::new(AtomicU64::new(0)));
        speed.set_rpm(rpm);
        Self {
            ppr,
            speed,
            configured: HashMap::new(),
            generators: HashMap::new(),
        }
    }

    /// Handle for changing the simulated shaft speed while running.
    pub fn speed(&self) -> SimSpeed {
        self.speed.clone()
    }
}

impl EdgeInput for SimulatedEncoder {
    fn configure_input(&mut self, pin: u8, pull: Pull) -> HwResult<InputState> {
        if self.configured.contains_key(&pin) {
            return Ok(InputState::AlreadyConfigured);
        }
        self.configured.insert(pin, pull);
        tracing::debug!(pin, ?pull, "simulated input configured");
        Ok(InputState::Configured)
    }

    fn register_edge_callback(
        &mut self,
        pin: u8,
        edge: Edge,
        debounce: Duration,
        mut callback: EdgeCallback,
    ) -> HwResult<()> {
        if !self.configured.contains_key(&pin) {
            return Err(Box::new(HwError::NotConfigured(pin)));
        }
        if self.generators.contains_key(&pin) {
            return Err(Box::new(HwError::CallbackBusy(pin)));
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let speed = self.speed.clone();
        let ppr = self.ppr;

        let join_handle = std::thread::Builder::new()
            .name(format!("sim-encoder-{pin}"))
            .spawn(move || {
                let mut next = Instant::now();
                while !shutdown_clone.load(Ordering::Relaxed) {
                    let Some(period) = pulse_period(speed.rpm(), ppr) else {
                        std::thread::sleep(Duration::from_millis(5));
                        next = Instant::now();
                        continue;
                    };
                    next += period;
                    let now = Instant::now();
                    if next > now {
                        std::thread::sleep(next - now);
                    } else if now - next > Duration::from_millis(50) {
                        // Fell far behind (suspended, overloaded): resync instead of bursting.
                        next = now;
                    }
                    callback(Instant::now());
                }
                tracing::trace!("simulated encoder thread exiting cleanly");
            })
            .map_err(HwError::Io)?;

        tracing::debug!(pin, ?edge, ?debounce, "simulated edge callback registered");
        self.generators.insert(
            pin,
            Generator {
                shutdown,
                join_handle: Some(join_handle),
            },
        );
        Ok(())
    }

    fn deregister_callback(&mut self, pin: u8) -> HwResult<()> {
        if let Some(mut generator) = self.generators.remove(&pin) {
            generator.stop();
            tracing::debug!(pin, "simulated edge callback removed");
        }
        Ok(())
    }

    fn release(&mut self, pin: u8) -> HwResult<()> {
        self.deregister_callback(pin)?;
        self.configured.remove(&pin);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn configure_twice_reports_already_configured() {
        let mut sim = SimulatedEncoder::new(10, 600.0);
        assert_eq!(sim.configure_input(7, Pull::Down).unwrap(), InputState::Configured);
        assert_eq!(
            sim.configure_input(7, Pull::Down).unwrap(),
            InputState::AlreadyConfigured
        );
    }

    #[test]
    fn register_requires_configured_pin() {
        let mut sim = SimulatedEncoder::new(10, 600.0);
        let err = sim
            .register_edge_callback(7, Edge::Rising, Duration::from_millis(1), Box::new(|_| {}))
            .expect_err("pin not configured");
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn emits_edges_until_deregistered() {
        let mut sim = SimulatedEncoder::new(10, 600.0); // 100 Hz
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = count.clone();
        sim.configure_input(7, Pull::Down).unwrap();
        sim.register_edge_callback(
            7,
            Edge::Rising,
            Duration::from_millis(1),
            Box::new(move |_| {
                count_cb.fetch_add(1, Ordering::Relaxed);
            }),
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(200));
        sim.deregister_callback(7).unwrap();
        let seen = count.load(Ordering::Relaxed);
        assert!(seen >= 5, "expected edges, saw {seen}");
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::Relaxed), seen);
        // Deregistering again is a no-op.
        sim.deregister_callback(7).unwrap();
    }

    #[test]
    fn zero_rpm_emits_nothing() {
        let mut sim = SimulatedEncoder::new(10, 0.0);
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = count.clone();
        sim.configure_input(3, Pull::Up).unwrap();
        sim.register_edge_callback(
            3,
            Edge::Rising,
            Duration::from_millis(1),
            Box::new(move |_| {
                count_cb.fetch_add(1, Ordering::Relaxed);
            }),
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(50));
        sim.release(3).unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }
}
