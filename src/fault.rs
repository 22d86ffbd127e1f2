//! Electrical fault evaluation.
//!
//! Pure, deterministic classification of a telemetry sample against the
//! configured safety limits. Check order is a policy, not an accident:
//! voltage excursions are the most likely grid-side events and are checked
//! first, then overload, then dry-run. First match wins.
//!
//! Dry-run deliberately requires **both** low current **and** poor power
//! factor — a dry pump draws little current at a bad power factor, while
//! a lightly loaded healthy pump can show low current alone. Checking
//! current by itself would false-trip during normal low-load operation.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::telemetry::TelemetrySample;

/// Fault classification for one telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultCode {
    /// All readings within limits.
    #[default]
    None,
    /// Low current at poor power factor — pump running without water.
    DryRun,
    /// Load current above the configured maximum.
    Overload,
    /// Line voltage below the configured minimum.
    Undervoltage,
    /// Line voltage above the configured maximum.
    Overvoltage,
}

impl FaultCode {
    pub fn is_fault(self) -> bool {
        self != Self::None
    }

    /// Short stable tag used in log messages and the remote status patch.
    pub fn tag(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DryRun => "dry_run",
            Self::Overload => "overload",
            Self::Undervoltage => "undervoltage",
            Self::Overvoltage => "overvoltage",
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::DryRun => write!(f, "dry run"),
            Self::Overload => write!(f, "overload"),
            Self::Undervoltage => write!(f, "undervoltage"),
            Self::Overvoltage => write!(f, "overvoltage"),
        }
    }
}

/// Classify one sample against the thresholds. Pure; no side effects.
///
/// The voltage checks apply even at zero current so a meter that reports a
/// plausible but out-of-range voltage still trips. Callers must gate on
/// sample validity before calling — a sensor that has not produced a sample
/// yet never reaches this function, so a literal 0 V "not warmed up" reading
/// cannot be misread as undervoltage.
pub fn evaluate(sample: &TelemetrySample, thresholds: &Thresholds) -> FaultCode {
    if sample.voltage_v < thresholds.min_voltage_v {
        return FaultCode::Undervoltage;
    }
    if sample.voltage_v > thresholds.max_voltage_v {
        return FaultCode::Overvoltage;
    }
    if sample.current_a > thresholds.max_current_a {
        return FaultCode::Overload;
    }
    if sample.current_a <= thresholds.min_current_a
        && sample.power_factor <= thresholds.min_power_factor
    {
        return FaultCode::DryRun;
    }
    FaultCode::None
}
