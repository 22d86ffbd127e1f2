//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A display or BLE adapter would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(s) => {
                info!(
                    "TELEM | V={:.1} I={:.2}A P={:.0}W PF={:.2} E={:.3}kWh",
                    s.voltage_v, s.current_a, s.real_power_w, s.power_factor, s.energy_kwh,
                );
            }
            AppEvent::RelayChanged {
                on,
                source,
                run_secs,
            } => {
                if *on {
                    info!("RELAY | on ({})", source.tag());
                } else {
                    info!("RELAY | off after {}s ({})", run_secs, source.tag());
                }
            }
            AppEvent::FaultTripped { code, sample } => {
                info!(
                    "FAULT | {} | V={:.1} I={:.2} PF={:.2}",
                    code, sample.voltage_v, sample.current_a, sample.power_factor,
                );
            }
            AppEvent::StartBlocked { source, reason } => {
                info!("RELAY | start blocked ({}, {})", source.tag(), reason.tag());
            }
            AppEvent::LatchCleared => {
                info!("RELAY | manual override cleared");
            }
            AppEvent::IntentIgnored => {
                info!("SYNC  | conflicting intent ignored");
            }
            AppEvent::LowEfficiency {
                ratio,
                real_power_w,
            } => {
                info!(
                    "HEALTH| low efficiency: {:.0}W ({:.0}% of rated)",
                    real_power_w,
                    ratio * 100.0,
                );
            }
            AppEvent::ConfigUpdated => {
                info!("CFG   | configuration updated");
            }
            AppEvent::MeterUnavailable => {
                info!("METER | unavailable");
            }
        }
    }
}
