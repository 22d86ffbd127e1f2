//! Wake events between interrupt context and the control loop.
//!
//! Producers are the periodic `esp_timer` callback (control tick) and the
//! button GPIO ISRs (a wake nudge; the actual edge timestamp lives in the
//! button driver's atomics). The single consumer is the main loop, which
//! drains the queue once per iteration.
//!
//! The queue is a fixed-size lock-free SPSC ring over a `static` buffer so
//! ISR callbacks can reach it without allocation or locking. A full queue
//! drops the event — every producer is periodic or re-armed by hardware, so
//! a dropped tick is made up by the next one.

use core::sync::atomic::{AtomicU8, Ordering};

/// Ring capacity. Power of two so the wrap is a mask.
const QUEUE_CAP: usize = 16;

/// Loop wake-up reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// A button ISR fired; poll the debouncers promptly.
    ButtonWake = 1,
    /// Control cycle due.
    ControlTick = 2,
    /// Remote reconciliation due.
    SyncTick = 3,
}

impl Event {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::ButtonWake),
            2 => Some(Self::ControlTick),
            3 => Some(Self::SyncTick),
            _ => None,
        }
    }
}

static HEAD: AtomicU8 = AtomicU8::new(0);
static TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: slots are written only by the producer side (push_event) before
// the Release store that publishes them, and read only by the consumer side
// (pop_event) after the matching Acquire load. SPSC discipline: ISRs and
// timer callbacks produce, the main task consumes.
static mut SLOTS: [u8; QUEUE_CAP] = [0; QUEUE_CAP];

/// Enqueue an event. ISR-safe. Returns `false` when the ring is full.
pub fn push_event(event: Event) -> bool {
    let head = HEAD.load(Ordering::Relaxed);
    let next = (head + 1) % QUEUE_CAP as u8;
    if next == TAIL.load(Ordering::Acquire) {
        return false;
    }
    // SAFETY: see SLOTS. The slot at `head` is unpublished until the
    // Release store below.
    unsafe {
        SLOTS[head as usize] = event as u8;
    }
    HEAD.store(next, Ordering::Release);
    true
}

/// Dequeue the oldest event, if any. Main-loop side only.
pub fn pop_event() -> Option<Event> {
    let tail = TAIL.load(Ordering::Relaxed);
    if tail == HEAD.load(Ordering::Acquire) {
        return None;
    }
    // SAFETY: see SLOTS. The Acquire load above ordered this read after
    // the producer's write.
    let raw = unsafe { SLOTS[tail as usize] };
    TAIL.store((tail + 1) % QUEUE_CAP as u8, Ordering::Release);
    Event::from_raw(raw)
}

/// Drain every pending event into `handler`, FIFO.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

pub fn queue_is_empty() -> bool {
    TAIL.load(Ordering::Relaxed) == HEAD.load(Ordering::Acquire)
}
