pub mod clock;

pub use clock::{Clock, MonotonicClock};
#[cfg(any(test, feature = "test-clock"))]
pub use clock::test_clock;

use std::time::{Duration, Instant};

/// Boxed error used at every hardware trait boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Callback invoked once per qualifying edge with the monotonic edge timestamp.
pub type EdgeCallback = Box<dyn FnMut(Instant) + Send + 'static>;

/// Input bias resistor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pull {
    Up,
    #[default]
    Down,
    Off,
}

/// Edge selection for interrupt registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

/// Outcome of `EdgeInput::configure_input`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// The pin was claimed and configured by this call.
    Configured,
    /// The pin was already configured as an input; nothing changed.
    AlreadyConfigured,
}

/// Digital input with edge-notification support.
///
/// Implementations deliver callbacks from their own context (an interrupt
/// thread, a simulation thread); callbacks must therefore be `Send`.
pub trait EdgeInput {
    fn configure_input(&mut self, pin: u8, pull: Pull) -> HwResult<InputState>;

    /// Register `callback` for `edge` transitions, suppressing edges closer
    /// together than `debounce`. Replaces nothing: callers deregister first.
    fn register_edge_callback(
        &mut self,
        pin: u8,
        edge: Edge,
        debounce: Duration,
        callback: EdgeCallback,
    ) -> HwResult<()>;

    /// Remove the callback registered on `pin`. Must be a no-op when none is.
    fn deregister_callback(&mut self, pin: u8) -> HwResult<()>;

    fn release(&mut self, pin: u8) -> HwResult<()>;
}
