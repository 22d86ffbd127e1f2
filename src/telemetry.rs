//! Electrical telemetry sample type and meter-reading sanitisation.
//!
//! The meter driver hands the core either a full sample or "unavailable".
//! Substituting safe defaults for an unavailable meter is *caller* policy
//! (this module), never the fault evaluator's concern: the evaluator is
//! only invoked on genuine samples, so a cold meter can never trip a fault.

use serde::{Deserialize, Serialize};

/// A point-in-time reading from the energy meter.
///
/// Transient: only the latest value is held in memory; history exists solely
/// as log entries and uploaded telemetry records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// RMS line voltage (V).
    pub voltage_v: f32,
    /// RMS load current (A).
    pub current_a: f32,
    /// Real power (W).
    pub real_power_w: f32,
    /// Power factor (0.0–1.0).
    pub power_factor: f32,
    /// Cumulative energy since meter reset (kWh).
    pub energy_kwh: f32,
    /// Wall-clock timestamp (Unix seconds); 0 if the clock is unsynced.
    pub sampled_at: u64,
}

impl TelemetrySample {
    /// True if every field is finite. NaN/Inf readings come from a meter
    /// mid-register-update and must not reach the fault evaluator.
    pub fn is_plausible(&self) -> bool {
        self.voltage_v.is_finite()
            && self.current_a.is_finite()
            && self.real_power_w.is_finite()
            && self.power_factor.is_finite()
            && self.energy_kwh.is_finite()
    }
}

/// Conservative non-trip placeholder used when the meter is unavailable:
/// zero volts/amps/watts and unity power factor. Telemetry and status
/// reporting keep flowing; the fault evaluator never sees this value.
pub fn fallback_sample(sampled_at: u64) -> TelemetrySample {
    TelemetrySample {
        voltage_v: 0.0,
        current_a: 0.0,
        real_power_w: 0.0,
        power_factor: 1.0,
        energy_kwh: 0.0,
        sampled_at,
    }
}

/// Replace any non-finite field with its fallback value, keeping the rest.
/// A meter that garbles a single register should not cost us the sample.
pub fn sanitize(mut sample: TelemetrySample) -> TelemetrySample {
    if !sample.voltage_v.is_finite() {
        sample.voltage_v = 0.0;
    }
    if !sample.current_a.is_finite() {
        sample.current_a = 0.0;
    }
    if !sample.real_power_w.is_finite() {
        sample.real_power_w = 0.0;
    }
    if !sample.power_factor.is_finite() {
        sample.power_factor = 1.0;
    }
    if !sample.energy_kwh.is_finite() {
        sample.energy_kwh = 0.0;
    }
    sample
}
