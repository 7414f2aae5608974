//! Test and helper mocks for tacho_core

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tacho_traits::{Edge, EdgeCallback, EdgeInput, HwResult, InputState, Pull};

#[derive(Default)]
struct ScriptState {
    configured: HashSet<u8>,
    callbacks: HashMap<u8, EdgeCallback>,
    /// Edges delivered synchronously inside the next registration.
    pending_burst: u64,
    fail_configure: bool,
    registrations: usize,
    deregistrations: usize,
    releases: usize,
    last_debounce: Option<Duration>,
}

/// Edge input driven by the test itself.
///
/// Clones share state, so a test keeps one handle while the tachometer owns
/// another. `fire` invokes the registered callback on the calling thread.
#[derive(Clone, Default)]
pub struct ScriptedInput {
    inner: Arc<Mutex<ScriptState>>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// An input whose `configure_input` always fails.
    pub fn failing() -> Self {
        let me = Self::default();
        me.lock().fail_configure = true;
        me
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver one edge at `ts` to every registered callback. Returns `false`
    /// when nothing is registered.
    pub fn fire(&self, ts: Instant) -> bool {
        let mut st = self.lock();
        if st.callbacks.is_empty() {
            return false;
        }
        for cb in st.callbacks.values_mut() {
            cb(ts);
        }
        true
    }

    /// Fire `count` edges, `period` apart, starting at `start`.
    pub fn fire_train(&self, start: Instant, period: Duration, count: u32) -> Instant {
        let mut ts = start;
        for _ in 0..count {
            ts += period;
            self.fire(ts);
        }
        ts
    }

    /// Deliver `count` edges synchronously as soon as the next callback is
    /// registered.
    pub fn queue_burst(&self, count: u64) {
        self.lock().pending_burst = count;
    }

    pub fn registrations(&self) -> usize {
        self.lock().registrations
    }

    pub fn deregistrations(&self) -> usize {
        self.lock().deregistrations
    }

    pub fn releases(&self) -> usize {
        self.lock().releases
    }

    pub fn has_callback(&self, pin: u8) -> bool {
        self.lock().callbacks.contains_key(&pin)
    }

    pub fn is_configured(&self, pin: u8) -> bool {
        self.lock().configured.contains(&pin)
    }

    pub fn last_debounce(&self) -> Option<Duration> {
        self.lock().last_debounce
    }
}

impl EdgeInput for ScriptedInput {
    fn configure_input(&mut self, pin: u8, _pull: Pull) -> HwResult<InputState> {
        let mut st = self.lock();
        if st.fail_configure {
            return Err(Box::new(std::io::Error::other("scripted input unavailable")));
        }
        if st.configured.insert(pin) {
            Ok(InputState::Configured)
        } else {
            Ok(InputState::AlreadyConfigured)
        }
    }

    fn register_edge_callback(
        &mut self,
        pin: u8,
        _edge: Edge,
        debounce: Duration,
        mut callback: EdgeCallback,
    ) -> HwResult<()> {
        let mut st = self.lock();
        if !st.configured.contains(&pin) {
            return Err(Box::new(std::io::Error::other(format!("pin {pin} not configured"))));
        }
        if st.callbacks.contains_key(&pin) {
            return Err(Box::new(std::io::Error::other(format!(
                "pin {pin} already has a callback"
            ))));
        }
        let burst = std::mem::take(&mut st.pending_burst);
        let now = Instant::now();
        for _ in 0..burst {
            callback(now);
        }
        st.callbacks.insert(pin, callback);
        st.registrations += 1;
        st.last_debounce = Some(debounce);
        Ok(())
    }

    fn deregister_callback(&mut self, pin: u8) -> HwResult<()> {
        let mut st = self.lock();
        st.callbacks.remove(&pin);
        st.deregistrations += 1;
        Ok(())
    }

    fn release(&mut self, pin: u8) -> HwResult<()> {
        let mut st = self.lock();
        st.callbacks.remove(&pin);
        st.configured.remove(&pin);
        st.releases += 1;
        Ok(())
    }
}
