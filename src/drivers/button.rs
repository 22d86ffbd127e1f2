//! ISR-debounced start/stop button driver.
//!
//! ## Hardware
//!
//! Two active-low momentary switches with external pull-ups. Each GPIO
//! fires on the falling edge; the ISR records the raw timestamp into an
//! atomic, and `tick()` (called from the main loop at control-tick rate)
//! runs the debounce state machine.
//!
//! A held button produces exactly one edge: only the falling edge is
//! recorded, and contact bounce inside the debounce window is absorbed.

use core::sync::atomic::{AtomicU32, Ordering};

const DEBOUNCE_MS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    Start = 0,
    Stop = 1,
}

/// Raw ISR timestamps (milliseconds since boot, truncated to u32).
/// Written by the ISR, read by the main loop.
static ISR_TIMESTAMP: [AtomicU32; 2] = [AtomicU32::new(0), AtomicU32::new(0)];

/// Record a falling edge. Called from the GPIO ISR (and from tests).
/// Timestamp 0 means "never pressed", so a press at t=0 is nudged to 1.
pub fn record_press(id: ButtonId, now_ms: u32) {
    ISR_TIMESTAMP[id as usize].store(now_ms.max(1), Ordering::Release);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Settling { since_ms: u32 },
}

pub struct ButtonDriver {
    id: ButtonId,
    gpio: i32,
    state: DebounceState,
    last_isr_ms: u32,
}

impl ButtonDriver {
    pub fn new(id: ButtonId, gpio: i32) -> Self {
        Self {
            id,
            gpio,
            state: DebounceState::Idle,
            last_isr_ms: 0,
        }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Call from the main loop at each control tick.
    /// Returns `true` exactly once per debounced press.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        let isr_ms = ISR_TIMESTAMP[self.id as usize].load(Ordering::Acquire);
        let new_press = isr_ms != self.last_isr_ms && isr_ms != 0;

        match self.state {
            DebounceState::Idle => {
                if new_press {
                    self.last_isr_ms = isr_ms;
                    self.state = DebounceState::Settling { since_ms: now_ms };
                }
                false
            }
            DebounceState::Settling { since_ms } => {
                // Bounce edges inside the window are absorbed.
                if new_press {
                    self.last_isr_ms = isr_ms;
                }
                if now_ms.wrapping_sub(since_ms) >= DEBOUNCE_MS {
                    self.state = DebounceState::Idle;
                    return true;
                }
                false
            }
        }
    }
}
