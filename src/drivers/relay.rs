//! Contactor relay driver.
//!
//! Dumb actuator: the relay state machine in the core decides *whether* to
//! energise; this driver only knows *how*. Wiring polarity is handled here —
//! most contactor relay modules energise on LOW — so the core always speaks
//! in terms of "pump on".
//!
//! Writes are idempotent: the core commands the output every cycle and the
//! driver skips the GPIO write when nothing changed.
//!
//! [`PinRelay`] is generic over `embedded_hal::digital::OutputPin`; on the
//! main board that is an `esp_idf_hal` `PinDriver` over the relay GPIO,
//! and the same driver covers boards routing the relay through an I/O
//! expander.

use embedded_hal::digital::OutputPin;

use crate::app::ports::RelayPort;

/// Relay behind any HAL output pin.
pub struct PinRelay<P: OutputPin> {
    pin: P,
    active_low: bool,
    last: Option<bool>,
}

impl<P: OutputPin> PinRelay<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        Self {
            pin,
            active_low,
            last: None,
        }
    }
}

impl<P: OutputPin> RelayPort for PinRelay<P> {
    fn set_output(&mut self, on: bool) {
        if self.last == Some(on) {
            return;
        }
        let result = if on != self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            // Retried next cycle since `last` stays stale.
            log::warn!("relay pin write failed");
            return;
        }
        self.last = Some(on);
    }
}
