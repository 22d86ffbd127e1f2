//! PumpGuard Firmware — Main Entry Point
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  MeterPort impl   LogEventSink   NvsConfigStore  Esp32Clock  │
//! │  (energy meter)   (EventSink)    (ConfigStore)   (ClockPort) │
//! │  FsLogStore       PinRelay       NullRemote                  │
//! │  (LogStore)       (RelayPort)    (RemotePort placeholder)    │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ──────────────────     │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │          ControlService (pure logic)               │      │
//! │  │  fault · schedule · relay · health                 │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  Reconciler (5-step sync, own cadence, same loop)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod error;
mod eventlog;
mod events;
mod fault;
mod health;
mod pins;
mod relay;
mod schedule;
mod sync;
mod telemetry;

pub mod app;
mod adapters;
mod drivers;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::log_sink::LogEventSink;
use adapters::log_store::FsLogStore;
use adapters::nvs::NvsConfigStore;
use adapters::remote::NullRemote;
use adapters::time::Esp32Clock;
use app::commands::AppCommand;
use app::ports::{ClockPort, ConfigStorePort, MeterPort, RelayPort};
use app::service::ControlService;
use config::{ControlTiming, PumpConfig};
use drivers::button::{ButtonDriver, ButtonId};
use drivers::relay::PinRelay;
use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};
use eventlog::EventLog;
use events::{drain_events, push_event, Event};
use sync::{Reconciler, StatusPatch};
use telemetry::TelemetrySample;

/// Directory for the event-log streams (LittleFS mount on device).
const LOG_DIR: &str = "/littlefs/pumpguard";

// ── Meter placeholder ─────────────────────────────────────────
//
// The energy-meter driver (register map, bus framing) ships with the
// board integration; until it is wired up the controller runs with the
// meter reported unavailable, which the core treats as a safe non-trip
// condition. Same pattern as the NullRemote sync placeholder.

struct NullMeter;

impl MeterPort for NullMeter {
    fn read_sample(&mut self) -> Option<TelemetrySample> {
        None
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PumpGuard v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Hardware peripherals ───────────────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    if let Err(e) = drivers::hw_init::init_isr_service() {
        log::error!("ISR service init failed: {} — continuing without button ISRs", e);
    }
    let watchdog = drivers::watchdog::Watchdog::new();

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let mut config_store = match NvsConfigStore::new() {
        Ok(s) => s,
        Err(e) => {
            warn!("NVS init failed ({e}), running with defaults and no persistence");
            NvsConfigStore::default()
        }
    };
    let config = match config_store.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({e}), using defaults");
            PumpConfig::default()
        }
    };
    let timing = ControlTiming::default();

    // ── 4. Construct adapters ─────────────────────────────────
    let clock = Esp32Clock::new();
    let mut meter = NullMeter;
    // SAFETY: RELAY_GPIO is an output-capable pin and is claimed only here.
    let relay_pin = PinDriver::output(unsafe { AnyOutputPin::new(pins::RELAY_GPIO) })
        .map_err(|e| anyhow::anyhow!("relay pin init failed: {e}"))?;
    let mut relay_out = PinRelay::new(relay_pin, pins::RELAY_ACTIVE_LOW);
    // De-energised before the first cycle, respecting module polarity.
    relay_out.set_output(false);
    let mut log_sink = LogEventSink::new();
    let mut start_button = ButtonDriver::new(ButtonId::Start, pins::START_BUTTON_GPIO);
    let mut stop_button = ButtonDriver::new(ButtonId::Stop, pins::STOP_BUTTON_GPIO);

    let log_store = FsLogStore::new(LOG_DIR)
        .map_err(|e| anyhow::anyhow!("log store init failed: {e}"))?;
    let event_log = EventLog::new(log_store)
        .map_err(|e| anyhow::anyhow!("event log init failed: {e}"))?;

    // ── 5. Construct app service + reconciler ─────────────────
    let mut service = ControlService::new(config, timing, event_log);
    service.log_boot(clock.epoch_secs().unwrap_or(0), "power-on");

    // The REST adapter replaces NullRemote once the board integration
    // wires up Wi-Fi and the auth token store.
    let mut reconciler = Reconciler::new(NullRemote::new());

    drivers::hw_timer::start_timers(timing.control_loop_interval_ms);

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    let sync_ticks = (u64::from(timing.sync_interval_secs) * 1000
        / u64::from(timing.control_loop_interval_ms))
    .max(1);
    let mut tick_counter: u64 = 0;

    loop {
        watchdog.feed();

        // Simulate the tick timer via sleep on non-espidf targets. On real
        // hardware the esp_timer callback pushes ControlTick; the short
        // sleep below just yields between queue polls.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(u64::from(
                timing.control_loop_interval_ms,
            )));
            push_event(Event::ControlTick);
        }
        #[cfg(target_os = "espidf")]
        {
            if events::queue_is_empty() {
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
        }

        // Poll the debounced buttons at loop rate.
        let now_ms32 = clock.monotonic_ms() as u32;
        if start_button.tick(now_ms32) {
            service.handle_command(AppCommand::StartPressed);
        }
        if stop_button.tick(now_ms32) {
            service.handle_command(AppCommand::StopPressed);
        }

        drain_events(|event| match event {
            Event::ControlTick => {
                service.tick(
                    &mut meter,
                    &clock,
                    &mut relay_out,
                    &mut config_store,
                    &mut log_sink,
                );

                tick_counter += 1;
                if tick_counter % sync_ticks == 0 {
                    push_event(Event::SyncTick);
                }
            }

            Event::SyncTick => {
                let status = service.status();
                let patch = StatusPatch {
                    online: true,
                    relay_on: status.relay_on,
                    last_fault: status.last_fault.tag(),
                    updated_at: clock.epoch_secs().unwrap_or(0),
                };
                let sample = service.take_upload_sample();
                let epoch = clock.epoch_secs().unwrap_or(0);
                let (config, event_log) = service.sync_parts();
                let outcome = reconciler.run_cycle(
                    &patch,
                    sample.as_ref(),
                    config,
                    &mut config_store,
                    event_log,
                    epoch,
                );
                if let Some(intent) = outcome.intent {
                    service.handle_command(AppCommand::ApplyIntent(intent));
                }
            }

            // Buttons are polled above; the wake event only interrupts
            // the idle sleep so a press is debounced promptly.
            Event::ButtonWake => {}
        });
    }
}
