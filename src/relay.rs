//! Relay state machine: the single writer of relay state.
//!
//! Reconciles four independently-changing inputs — fault classification,
//! schedule decision, manual button edges, remote control intent — into one
//! relay decision per control cycle, with two hard temporal gates:
//!
//! * **Anti-chatter**: no off→on transition before `min_off_ms` has elapsed
//!   since the last off transition, regardless of who asks.
//! * **Fault lockout**: after a safety fault, "on" is refused until the
//!   lockout expires. Clean re-sampling alone never clears a fault.
//!
//! Priority per cycle: fault > manual edge > remote intent > schedule.
//! The controller never panics; malformed inputs are ignored and reported
//! as events for the caller to log.
//!
//! All timestamps are monotonic milliseconds. Wall-clock adjustments (NTP
//! sync, RTC correction) must never reach this module.

use serde::{Deserialize, Serialize};

use crate::config::ControlTiming;
use crate::fault::FaultCode;
use crate::telemetry::TelemetrySample;

/// One-shot remote command, consumed-and-cleared by the reconciler.
///
/// `force_on` and `force_off` together are mutually cancelling (an explicit
/// no-op): the remote writer's intent is ambiguous and guessing could
/// energize a pump by accident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlIntent {
    #[serde(default)]
    pub force_on: bool,
    #[serde(default)]
    pub force_off: bool,
    #[serde(default)]
    pub clear_manual_override: bool,
}

impl ControlIntent {
    /// True if the intent carries no action at all.
    pub fn is_empty(&self) -> bool {
        !self.force_on && !self.force_off && !self.clear_manual_override
    }
}

/// Coarse phase derived from relay state, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Off,
    Running,
    FaultLockout,
}

/// Who asked for a transition. Carried in lifecycle events so the log can
/// distinguish an operator action from automatic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    Manual,
    Remote,
    Schedule,
    Fault,
}

impl RequestSource {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Remote => "remote",
            Self::Schedule => "schedule",
            Self::Fault => "fault",
        }
    }
}

/// Why an "on" request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    AntiChatter,
    Lockout,
}

impl BlockReason {
    pub fn tag(self) -> &'static str {
        match self {
            Self::AntiChatter => "anti-chatter",
            Self::Lockout => "lockout",
        }
    }
}

/// Everything the state machine consumes in one control cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleInputs {
    /// Monotonic milliseconds.
    pub now_ms: u64,
    /// Latest fault classification (`FaultCode::None` when the meter was
    /// unavailable this cycle — sensor-unavailable handling is caller policy).
    pub fault: FaultCode,
    /// Latest telemetry, carried into fault events for the log.
    pub sample: TelemetrySample,
    /// Scheduler verdict for this instant (false when the clock is unsynced).
    pub schedule_on: bool,
    /// Debounced manual start edge.
    pub start_pressed: bool,
    /// Debounced manual stop edge.
    pub stop_pressed: bool,
    /// Remote intent fetched since the last cycle, if any.
    pub intent: Option<ControlIntent>,
}

/// Events emitted by a cycle, for the caller to log and forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelayEvent {
    RunStarted {
        source: RequestSource,
    },
    RunStopped {
        source: RequestSource,
        run_secs: u64,
    },
    FaultTripped {
        code: FaultCode,
        sample: TelemetrySample,
    },
    StartBlocked {
        source: RequestSource,
        reason: BlockReason,
    },
    LatchCleared,
    /// `force_on && force_off` — ambiguous, treated as a no-op.
    IntentIgnored,
}

/// Read-only snapshot handed to status reporting and reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct RelayState {
    pub commanded: bool,
    pub physical: bool,
    pub manual_latched: bool,
    pub last_fault: FaultCode,
    pub last_off_at_ms: u64,
    pub lockout_until_ms: u64,
}

/// Maximum events one cycle can produce (latch-clear + intent-ignored +
/// stop + start-blocked is the worst case).
const MAX_CYCLE_EVENTS: usize = 4;

pub type CycleEvents = heapless::Vec<RelayEvent, MAX_CYCLE_EVENTS>;

pub struct RelayController {
    commanded: bool,
    physical: bool,
    manual_latched: bool,
    last_fault: FaultCode,
    last_off_ms: u64,
    lockout_until_ms: u64,
    run_started_ms: u64,
    total_run_ms: u64,
    min_off_ms: u64,
    lockout_ms: u64,
}

impl RelayController {
    /// A fresh controller is off, unlatched, and treats boot as its last
    /// off transition — the anti-chatter gate therefore also debounces
    /// rapid power-restoration cycles.
    pub fn new(timing: &ControlTiming) -> Self {
        Self {
            commanded: false,
            physical: false,
            manual_latched: false,
            last_fault: FaultCode::None,
            last_off_ms: 0,
            lockout_until_ms: 0,
            run_started_ms: 0,
            total_run_ms: 0,
            min_off_ms: timing.min_off_ms,
            lockout_ms: timing.fault_lockout_ms,
        }
    }

    /// Advance the state machine by one control cycle.
    ///
    /// Re-evaluated from scratch every cycle; there is no long-lived
    /// operation to cancel, so a fault always pre-empts an in-progress
    /// "turn on" decision within one sampling period.
    pub fn step(&mut self, inp: &CycleInputs) -> CycleEvents {
        let mut events = CycleEvents::new();

        // Fault takes precedence over every other input source.
        if inp.fault.is_fault() && self.physical {
            self.last_fault = inp.fault;
            self.manual_latched = false;
            self.commanded = false;
            self.lockout_until_ms = inp.now_ms + self.lockout_ms;
            self.turn_off(inp.now_ms, RequestSource::Fault, &mut events);
            let _ = events.push(RelayEvent::FaultTripped {
                code: inp.fault,
                sample: inp.sample,
            });
            return events;
        }

        // Remote intent: like manual edges, but without touching the latch.
        let mut on_edge: Option<RequestSource> = None;
        let mut off_edge: Option<RequestSource> = None;

        if let Some(intent) = inp.intent {
            if intent.force_on && intent.force_off {
                let _ = events.push(RelayEvent::IntentIgnored);
            } else if intent.force_on {
                on_edge = Some(RequestSource::Remote);
            } else if intent.force_off {
                off_edge = Some(RequestSource::Remote);
            }
            if intent.clear_manual_override && self.manual_latched {
                self.manual_latched = false;
                let _ = events.push(RelayEvent::LatchCleared);
            }
        }

        // Manual edges win over remote within the same cycle and latch
        // manual priority.
        if inp.start_pressed {
            self.manual_latched = true;
            on_edge = Some(RequestSource::Manual);
        }
        if inp.stop_pressed {
            self.manual_latched = true;
            off_edge = Some(RequestSource::Manual);
        }

        // Off always succeeds immediately; stop beats start.
        if let Some(source) = off_edge {
            self.commanded = false;
            if self.physical {
                self.turn_off(inp.now_ms, source, &mut events);
            }
            return events;
        }

        if let Some(source) = on_edge {
            self.commanded = true;
            // Blocked edge requests are reported; silent schedule retries
            // below are not, to keep the log free of once-a-second noise.
            self.try_energize(inp.now_ms, source, true, &mut events);
            return events;
        }

        // Scheduler has authority only while the manual latch is clear.
        if !self.manual_latched {
            self.commanded = inp.schedule_on;
        }

        // Reconcile physical state with the commanded state.
        if self.commanded && !self.physical {
            let source = if self.manual_latched {
                RequestSource::Manual
            } else {
                RequestSource::Schedule
            };
            self.try_energize(inp.now_ms, source, false, &mut events);
        } else if !self.commanded && self.physical {
            self.turn_off(inp.now_ms, RequestSource::Schedule, &mut events);
        }

        events
    }

    // ── Queries ───────────────────────────────────────────────────

    pub fn physical(&self) -> bool {
        self.physical
    }

    pub fn state(&self) -> RelayState {
        RelayState {
            commanded: self.commanded,
            physical: self.physical,
            manual_latched: self.manual_latched,
            last_fault: self.last_fault,
            last_off_at_ms: self.last_off_ms,
            lockout_until_ms: self.lockout_until_ms,
        }
    }

    pub fn phase(&self, now_ms: u64) -> RelayPhase {
        if self.physical {
            RelayPhase::Running
        } else if now_ms < self.lockout_until_ms {
            RelayPhase::FaultLockout
        } else {
            RelayPhase::Off
        }
    }

    /// Accumulated runtime including the current run, for health estimation.
    pub fn total_run_secs(&self, now_ms: u64) -> u64 {
        let live = if self.physical {
            now_ms.saturating_sub(self.run_started_ms)
        } else {
            0
        };
        (self.total_run_ms + live) / 1000
    }

    // ── Internal ──────────────────────────────────────────────────

    fn try_energize(
        &mut self,
        now_ms: u64,
        source: RequestSource,
        report_blocked: bool,
        events: &mut CycleEvents,
    ) {
        if now_ms < self.lockout_until_ms {
            if report_blocked {
                let _ = events.push(RelayEvent::StartBlocked {
                    source,
                    reason: BlockReason::Lockout,
                });
            }
            return;
        }
        if now_ms.saturating_sub(self.last_off_ms) < self.min_off_ms {
            if report_blocked {
                let _ = events.push(RelayEvent::StartBlocked {
                    source,
                    reason: BlockReason::AntiChatter,
                });
            }
            return;
        }

        self.physical = true;
        self.run_started_ms = now_ms;
        let _ = events.push(RelayEvent::RunStarted { source });
    }

    fn turn_off(&mut self, now_ms: u64, source: RequestSource, events: &mut CycleEvents) {
        self.physical = false;
        self.last_off_ms = now_ms;
        let run_ms = now_ms.saturating_sub(self.run_started_ms);
        self.total_run_ms += run_ms;
        let _ = events.push(RelayEvent::RunStopped {
            source,
            run_secs: run_ms / 1000,
        });
    }
}
