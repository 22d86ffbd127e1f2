//! Application service — the hexagonal core.
//!
//! [`ControlService`] owns the relay state machine, the health monitor,
//! the active configuration, and the event log. It exposes a clean,
//! hardware-agnostic API. All I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  MeterPort ──▶ ┌──────────────────────────┐ ──▶ RelayPort
//!  ClockPort ──▶ │      ControlService       │ ──▶ EventSink
//!  AppCommand ─▶ │ fault · schedule · relay  │ ──▶ EventLog
//!                └──────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::{validate_config, ControlTiming, PumpConfig};
use crate::eventlog::{EventCategory, EventLog, LogEvent};
use crate::fault::{self, FaultCode};
use crate::health::{HealthEvent, HealthMonitor};
use crate::relay::{ControlIntent, CycleInputs, RelayController, RelayEvent};
use crate::telemetry::{fallback_sample, sanitize, TelemetrySample};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{ClockPort, ConfigStorePort, EventSink, LogStorePort, MeterPort, RelayPort};

/// Value snapshot for the reconciler's status patch. Taken at call time;
/// the reconciler never holds references into live state.
#[derive(Debug, Clone, Copy)]
pub struct StatusSnapshot {
    pub relay_on: bool,
    pub last_fault: FaultCode,
}

/// The application service orchestrates one control cycle at a time.
pub struct ControlService<S: LogStorePort> {
    config: PumpConfig,
    timing: ControlTiming,
    relay: RelayController,
    health: HealthMonitor,
    event_log: EventLog<S>,

    // Command flags consumed by the next tick.
    start_edge: bool,
    stop_edge: bool,
    pending_intent: Option<ControlIntent>,
    pending_config: Option<PumpConfig>,

    // Latest genuine sample since the reconciler last took one.
    upload_sample: Option<TelemetrySample>,
    meter_ok: bool,
    tick_count: u64,
    ticks_per_telemetry: u64,
}

impl<S: LogStorePort> ControlService<S> {
    pub fn new(config: PumpConfig, timing: ControlTiming, event_log: EventLog<S>) -> Self {
        let ticks_per_telemetry = (u64::from(timing.telemetry_interval_secs) * 1000
            / u64::from(timing.control_loop_interval_ms))
        .max(1);
        Self {
            relay: RelayController::new(&timing),
            health: HealthMonitor::new(config.rated_watts()),
            config,
            timing,
            event_log,
            start_edge: false,
            stop_edge: false,
            pending_intent: None,
            pending_config: None,
            upload_sample: None,
            meter_ok: true,
            tick_count: 0,
            ticks_per_telemetry,
        }
    }

    // ── Inbound commands ──────────────────────────────────────

    /// Queue a command for the next tick. Edges and intents are one-shot.
    pub fn handle_command(&mut self, command: AppCommand) {
        match command {
            AppCommand::StartPressed => self.start_edge = true,
            AppCommand::StopPressed => self.stop_edge = true,
            AppCommand::ApplyIntent(intent) => self.pending_intent = Some(intent),
            AppCommand::UpdateConfig(config) => self.pending_config = Some(config),
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle: read meter → classify → schedule →
    /// relay arbitration → drive output → health check → log.
    pub fn tick(
        &mut self,
        meter: &mut impl MeterPort,
        clock: &impl ClockPort,
        relay_out: &mut impl RelayPort,
        config_store: &mut impl ConfigStorePort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let now_ms = clock.monotonic_ms();
        let epoch = clock.epoch_secs().unwrap_or(0);

        self.apply_pending_config(config_store, sink, epoch);
        // Rating may have changed via remote reconciliation too.
        self.health.set_rated_watts(self.config.rated_watts());

        // 1. Meter read. The fault evaluator only sees genuine samples;
        //    an unavailable or garbled meter yields a non-trip fallback.
        let (sample, genuine) = match meter.read_sample() {
            Some(raw) if raw.is_plausible() => {
                self.meter_ok = true;
                (sanitize(raw), true)
            }
            Some(raw) => {
                warn!("meter returned non-finite reading, sanitised");
                self.meter_ok = true;
                (sanitize(raw), false)
            }
            None => {
                if self.meter_ok {
                    sink.emit(&AppEvent::MeterUnavailable);
                    warn!("energy meter unavailable");
                }
                self.meter_ok = false;
                (fallback_sample(epoch), false)
            }
        };
        if genuine {
            self.upload_sample = Some(sample);
        }

        // 2. Fault classification.
        let fault = if genuine {
            fault::evaluate(&sample, &self.config.thresholds)
        } else {
            FaultCode::None
        };

        // 3. Schedule. An unsynced wall clock contributes "off".
        let schedule_on = clock
            .wall_time()
            .is_some_and(|t| self.config.schedule.is_within_window(&t));

        // 4. Relay arbitration.
        let start_pressed = core::mem::take(&mut self.start_edge);
        let stop_pressed = core::mem::take(&mut self.stop_edge);
        if start_pressed {
            self.log_event(epoch, EventCategory::Button, "start button pressed");
        }
        if stop_pressed {
            self.log_event(epoch, EventCategory::Button, "stop button pressed");
        }

        let inputs = CycleInputs {
            now_ms,
            fault,
            sample,
            schedule_on,
            start_pressed,
            stop_pressed,
            intent: self.pending_intent.take(),
        };
        let events = self.relay.step(&inputs);

        // 5. Drive the output every cycle; the driver is idempotent.
        relay_out.set_output(self.relay.physical());

        for event in &events {
            self.dispatch_relay_event(event, now_ms, epoch, sink);
        }

        // 6. Health check while running, on genuine samples only.
        if self.relay.physical() && genuine {
            if let Some(HealthEvent::LowEfficiency {
                ratio,
                real_power_w,
            }) = self.health.check(now_ms, &sample)
            {
                warn!("low pump efficiency: {:.0} W at ratio {:.2}", real_power_w, ratio);
                sink.emit(&AppEvent::LowEfficiency {
                    ratio,
                    real_power_w,
                });
                self.log_event(
                    epoch,
                    EventCategory::Health,
                    format!("low efficiency: {real_power_w:.0} W ({ratio:.2} of rated)"),
                );
            }
        }

        // 7. Periodic telemetry emission.
        if self.tick_count % self.ticks_per_telemetry == 0 {
            sink.emit(&AppEvent::Telemetry(sample));
        }
    }

    fn dispatch_relay_event(
        &mut self,
        event: &RelayEvent,
        now_ms: u64,
        epoch: u64,
        sink: &mut impl EventSink,
    ) {
        match *event {
            RelayEvent::RunStarted { source } => {
                self.health.on_run_started(now_ms);
                info!("pump on ({})", source.tag());
                sink.emit(&AppEvent::RelayChanged {
                    on: true,
                    source,
                    run_secs: 0,
                });
                self.log_event(
                    epoch,
                    EventCategory::Run,
                    format!("run started ({})", source.tag()),
                );
            }
            RelayEvent::RunStopped { source, run_secs } => {
                self.health.on_run_stopped();
                info!("pump off after {run_secs}s ({})", source.tag());
                sink.emit(&AppEvent::RelayChanged {
                    on: false,
                    source,
                    run_secs,
                });
                self.log_event(
                    epoch,
                    EventCategory::Run,
                    format!("run stopped after {run_secs}s ({})", source.tag()),
                );
            }
            RelayEvent::FaultTripped { code, sample } => {
                warn!(
                    "fault: {} (V={:.1} I={:.2} PF={:.2})",
                    code, sample.voltage_v, sample.current_a, sample.power_factor
                );
                sink.emit(&AppEvent::FaultTripped { code, sample });
                self.log_event(
                    epoch,
                    EventCategory::Fault,
                    format!(
                        "{}: V={:.1} I={:.2} PF={:.2}",
                        code.tag(),
                        sample.voltage_v,
                        sample.current_a,
                        sample.power_factor
                    ),
                );
            }
            RelayEvent::StartBlocked { source, reason } => {
                info!("start blocked ({}, {})", source.tag(), reason.tag());
                sink.emit(&AppEvent::StartBlocked { source, reason });
                self.log_event(
                    epoch,
                    EventCategory::Run,
                    format!("start blocked ({}, {})", source.tag(), reason.tag()),
                );
            }
            RelayEvent::LatchCleared => {
                sink.emit(&AppEvent::LatchCleared);
                self.log_event(epoch, EventCategory::Cfg, "manual override cleared");
            }
            RelayEvent::IntentIgnored => {
                warn!("conflicting remote intent ignored");
                sink.emit(&AppEvent::IntentIgnored);
                self.log_event(epoch, EventCategory::Net, "conflicting intent ignored");
            }
        }
    }

    fn apply_pending_config(
        &mut self,
        config_store: &mut impl ConfigStorePort,
        sink: &mut impl EventSink,
        epoch: u64,
    ) {
        let Some(candidate) = self.pending_config.take() else {
            return;
        };
        if let Err(e) = validate_config(&candidate) {
            warn!("rejected config update: {e}");
            self.log_event(epoch, EventCategory::Cfg, format!("rejected update: {e}"));
            return;
        }
        self.config = candidate;
        if let Err(e) = config_store.save(&self.config) {
            warn!("config persist failed: {e}");
        }
        sink.emit(&AppEvent::ConfigUpdated);
        self.log_event(epoch, EventCategory::Cfg, "config updated");
    }

    fn log_event(&mut self, epoch: u64, category: EventCategory, message: impl Into<String>) {
        let entry = LogEvent::new(epoch, category, message);
        if let Err(e) = self.event_log.append(&entry) {
            warn!("event log append failed: {e}");
        }
    }

    // ── Reconciler interface ──────────────────────────────────

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            relay_on: self.relay.physical(),
            last_fault: self.relay.state().last_fault,
        }
    }

    /// Latest genuine sample since the last call, for telemetry upload.
    pub fn take_upload_sample(&mut self) -> Option<TelemetrySample> {
        self.upload_sample.take()
    }

    /// Split borrows for one reconciliation turn.
    pub fn sync_parts(&mut self) -> (&mut PumpConfig, &mut EventLog<S>) {
        (&mut self.config, &mut self.event_log)
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    pub fn timing(&self) -> &ControlTiming {
        &self.timing
    }

    pub fn relay_on(&self) -> bool {
        self.relay.physical()
    }

    /// Total pump runtime including any current run, in seconds.
    pub fn total_run_secs(&self, now_ms: u64) -> u64 {
        self.relay.total_run_secs(now_ms)
    }

    /// Record a boot marker in the event log.
    pub fn log_boot(&mut self, epoch: u64, reason: &str) {
        self.log_event(epoch, EventCategory::Boot, format!("boot: {reason}"));
    }
}
