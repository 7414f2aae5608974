//! rppal-backed edge input. Edges arrive on rppal's interrupt thread and are
//! timestamped there, then debounced in software before reaching the callback.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, Trigger};
use tacho_traits::{Edge, EdgeCallback, EdgeInput, HwResult, InputState, Pull};
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::Debouncer;

pub struct GpioInput {
    gpio: Gpio,
    pins: HashMap<u8, InputPin>,
}

impl GpioInput {
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        Ok(Self {
            gpio,
            pins: HashMap::new(),
        })
    }
}

fn trigger_for(edge: Edge) -> Trigger {
    match edge {
        Edge::Rising => Trigger::RisingEdge,
        Edge::Falling => Trigger::FallingEdge,
        Edge::Both => Trigger::Both,
    }
}

impl EdgeInput for GpioInput {
    fn configure_input(&mut self, pin: u8, pull: Pull) -> HwResult<InputState> {
        if self.pins.contains_key(&pin) {
            return Ok(InputState::AlreadyConfigured);
        }
        let raw = self
            .gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open encoder pin {pin}: {e}")))?;
        let input = match pull {
            Pull::Up => raw.into_input_pullup(),
            Pull::Down => raw.into_input_pulldown(),
            Pull::Off => raw.into_input(),
        };
        self.pins.insert(pin, input);
        debug!(pin, ?pull, "encoder input configured");
        Ok(InputState::Configured)
    }

    fn register_edge_callback(
        &mut self,
        pin: u8,
        edge: Edge,
        debounce: Duration,
        mut callback: EdgeCallback,
    ) -> HwResult<()> {
        let input = self.pins.get_mut(&pin).ok_or(HwError::NotConfigured(pin))?;
        let mut debouncer = Debouncer::new(debounce);
        input
            .set_async_interrupt(trigger_for(edge), move |_level| {
                let ts = Instant::now();
                if debouncer.accept(ts) {
                    callback(ts);
                }
            })
            .map_err(|e| HwError::Gpio(format!("register interrupt on pin {pin}: {e}")))?;
        debug!(pin, ?edge, ?debounce, "edge interrupt registered");
        Ok(())
    }

    fn deregister_callback(&mut self, pin: u8) -> HwResult<()> {
        if let Some(input) = self.pins.get_mut(&pin) {
            input
                .clear_async_interrupt()
                .map_err(|e| HwError::Gpio(format!("clear interrupt on pin {pin}: {e}")))?;
            trace!(pin, "edge interrupt cleared");
        }
        Ok(())
    }

    fn release(&mut self, pin: u8) -> HwResult<()> {
        self.deregister_callback(pin)?;
        // Dropping the InputPin restores the line to its previous mode.
        if self.pins.remove(&pin).is_some() {
            debug!(pin, "encoder input released");
        }
        Ok(())
    }
}
