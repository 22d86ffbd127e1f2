//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on
//! the other side decide what to do with them — log to serial, drive a
//! display, light an indicator.

use crate::fault::FaultCode;
use crate::relay::{BlockReason, RequestSource};
use crate::telemetry::TelemetrySample;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetrySample),

    /// The relay physically changed state.
    RelayChanged {
        on: bool,
        source: RequestSource,
        /// Seconds the pump ran; 0 on a start event.
        run_secs: u64,
    },

    /// A safety fault tripped the relay, with the triggering sample.
    FaultTripped {
        code: FaultCode,
        sample: TelemetrySample,
    },

    /// An explicit start request was refused by a temporal gate.
    StartBlocked {
        source: RequestSource,
        reason: BlockReason,
    },

    /// The manual priority latch was released by remote request.
    LatchCleared,

    /// A conflicting remote intent was dropped as a no-op.
    IntentIgnored,

    /// Pump drawing well under its rated power while running.
    LowEfficiency { ratio: f32, real_power_w: f32 },

    /// Configuration changed and was persisted.
    ConfigUpdated,

    /// The energy meter produced no sample this cycle.
    MeterUnavailable,
}
