//! System configuration parameters
//!
//! Tunable safety limits and pump parameters for the PumpGuard controller.
//! Values can be overridden via NVS (non-volatile storage) or by the remote
//! config document during reconciliation; every mutation is range-validated
//! before it is persisted or applied.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::schedule::Schedule;

/// Versioned electrical safety limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum acceptable RMS line voltage (V).
    pub min_voltage_v: f32,
    /// Maximum acceptable RMS line voltage (V).
    pub max_voltage_v: f32,
    /// Maximum load current before an overload trip (A).
    pub max_current_a: f32,
    /// Current at or below which the pump may be running dry (A).
    pub min_current_a: f32,
    /// Power factor at or below which the pump may be running dry.
    pub min_power_factor: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        // Sized for a 1 HP single-phase borewell pump on a 230 V feed.
        Self {
            min_voltage_v: 180.0,
            max_voltage_v: 260.0,
            max_current_a: 9.0,
            min_current_a: 0.5,
            min_power_factor: 0.45,
        }
    }
}

/// Complete persisted configuration: safety limits, schedule, motor rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PumpConfig {
    pub thresholds: Thresholds,
    pub schedule: Schedule,
    /// Motor nameplate rating, used for the efficiency diagnostic.
    pub horsepower: f32,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            schedule: Schedule::default(),
            horsepower: 1.0,
        }
    }
}

impl PumpConfig {
    /// Motor rating in watts (1 HP = 745.7 W).
    pub fn rated_watts(&self) -> f32 {
        self.horsepower * 745.7
    }
}

/// Fixed control-loop timing. Not persisted; changing these is a firmware
/// decision, not a field tweak.
#[derive(Debug, Clone, Copy)]
pub struct ControlTiming {
    /// Control loop interval (milliseconds).
    pub control_loop_interval_ms: u32,
    /// Minimum enforced off-time before re-energisation (anti-chatter).
    pub min_off_ms: u64,
    /// Hold-off after a safety fault during which "on" is refused.
    pub fault_lockout_ms: u64,
    /// Remote reconciliation interval (seconds).
    pub sync_interval_secs: u32,
    /// Telemetry log interval (seconds).
    pub telemetry_interval_secs: u32,
}

impl Default for ControlTiming {
    fn default() -> Self {
        Self {
            control_loop_interval_ms: 1000, // 1 Hz
            min_off_ms: 15_000,
            fault_lockout_ms: 120_000,
            sync_interval_secs: 30,
            telemetry_interval_secs: 60,
        }
    }
}

/// Range-check a full configuration. Invalid values are rejected with the
/// offending field named, never silently clamped — a compromised remote
/// document must not be able to widen the safety envelope unnoticed.
pub fn validate_config(cfg: &PumpConfig) -> Result<(), StoreError> {
    validate_thresholds(&cfg.thresholds)?;
    validate_schedule(&cfg.schedule)?;
    if !(0.1..=20.0).contains(&cfg.horsepower) {
        return Err(StoreError::ValidationFailed("horsepower must be 0.1–20.0"));
    }
    Ok(())
}

pub fn validate_thresholds(t: &Thresholds) -> Result<(), StoreError> {
    if !(80.0..=300.0).contains(&t.min_voltage_v) {
        return Err(StoreError::ValidationFailed("min_voltage_v must be 80–300"));
    }
    if !(100.0..=320.0).contains(&t.max_voltage_v) {
        return Err(StoreError::ValidationFailed("max_voltage_v must be 100–320"));
    }
    if t.min_voltage_v >= t.max_voltage_v {
        return Err(StoreError::ValidationFailed(
            "min_voltage_v must be < max_voltage_v",
        ));
    }
    if !(0.5..=50.0).contains(&t.max_current_a) {
        return Err(StoreError::ValidationFailed("max_current_a must be 0.5–50"));
    }
    if !(0.0..=10.0).contains(&t.min_current_a) {
        return Err(StoreError::ValidationFailed("min_current_a must be 0–10"));
    }
    if !(0.0..=1.0).contains(&t.min_power_factor) {
        return Err(StoreError::ValidationFailed(
            "min_power_factor must be 0.0–1.0",
        ));
    }
    Ok(())
}

pub fn validate_schedule(s: &Schedule) -> Result<(), StoreError> {
    if s.on_hour > 23 || s.off_hour > 23 {
        return Err(StoreError::ValidationFailed("hour must be 0–23"));
    }
    if s.on_minute > 59 || s.off_minute > 59 {
        return Err(StoreError::ValidationFailed("minute must be 0–59"));
    }
    if !(1..=12).contains(&s.season_start_month) || !(1..=12).contains(&s.season_end_month) {
        return Err(StoreError::ValidationFailed("month must be 1–12"));
    }
    Ok(())
}
