//! Pump health estimation.
//!
//! While the pump runs, compares measured real power against the motor's
//! nameplate rating. A sustained ratio well below rating points at a worn
//! impeller, a partially blocked intake, or a derated supply. The diagnostic
//! is informational only; it never influences relay decisions.
//!
//! Rate-limited to one report per run so a marginal pump does not flood the
//! event log at the control-loop frequency.

use crate::telemetry::TelemetrySample;

/// Real power below this fraction of rated watts counts as low efficiency.
const LOW_EFFICIENCY_RATIO: f32 = 0.35;

/// Startup grace before efficiency is judged. Covers motor spin-up and the
/// meter's averaging window settling after the inrush transient.
const WARMUP_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthEvent {
    LowEfficiency { ratio: f32, real_power_w: f32 },
}

pub struct HealthMonitor {
    rated_watts: f32,
    run_started_ms: Option<u64>,
    reported_this_run: bool,
}

impl HealthMonitor {
    pub fn new(rated_watts: f32) -> Self {
        Self {
            rated_watts,
            run_started_ms: None,
            reported_this_run: false,
        }
    }

    /// Config reconciliation may change the motor rating at runtime.
    pub fn set_rated_watts(&mut self, rated_watts: f32) {
        self.rated_watts = rated_watts;
    }

    pub fn on_run_started(&mut self, now_ms: u64) {
        self.run_started_ms = Some(now_ms);
        self.reported_this_run = false;
    }

    pub fn on_run_stopped(&mut self) {
        self.run_started_ms = None;
    }

    /// Judge the latest sample. Returns at most one event per run, and only
    /// after the warmup grace has elapsed.
    pub fn check(&mut self, now_ms: u64, sample: &TelemetrySample) -> Option<HealthEvent> {
        let started = self.run_started_ms?;
        if self.reported_this_run || self.rated_watts <= 0.0 {
            return None;
        }
        if now_ms.saturating_sub(started) < WARMUP_MS {
            return None;
        }

        let ratio = sample.real_power_w / self.rated_watts;
        if ratio < LOW_EFFICIENCY_RATIO {
            self.reported_this_run = true;
            return Some(HealthEvent::LowEfficiency {
                ratio,
                real_power_w: sample.real_power_w,
            });
        }
        None
    }
}
