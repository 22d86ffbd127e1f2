//! End-to-end control-loop scenarios: real `ControlService`, mock hardware.

use pumpguard::app::commands::AppCommand;
use pumpguard::app::events::AppEvent;
use pumpguard::app::service::ControlService;
use pumpguard::config::{ControlTiming, PumpConfig};
use pumpguard::eventlog::EventLog;
use pumpguard::fault::FaultCode;
use pumpguard::relay::{BlockReason, ControlIntent, RequestSource};

use crate::mock_hw::{CollectingSink, MemConfigStore, MemLogStore, MockClock, MockMeter, MockRelay};

const TICK_MS: u64 = 1_000;
const MIN_OFF_MS: u64 = 15_000;
const LOCKOUT_MS: u64 = 120_000;

/// A controller wired to mocks. The clock starts far enough past boot that
/// the boot-time anti-chatter window has already elapsed.
struct Rig {
    service: ControlService<MemLogStore>,
    meter: MockMeter,
    clock: MockClock,
    relay: MockRelay,
    store: MemConfigStore,
    sink: CollectingSink,
}

impl Rig {
    fn new(config: PumpConfig) -> Self {
        let event_log = EventLog::new(MemLogStore::default()).unwrap();
        let mut rig = Self {
            service: ControlService::new(config, ControlTiming::default(), event_log),
            meter: MockMeter::default(),
            clock: MockClock::new(100_000),
            relay: MockRelay::default(),
            store: MemConfigStore::default(),
            sink: CollectingSink::default(),
        };
        rig.meter.set(230.0, 4.0, 0.85); // healthy pump, nominal mains
        rig
    }

    /// One control cycle, then advance time by one tick interval.
    fn tick(&mut self) {
        self.service.tick(
            &mut self.meter,
            &self.clock,
            &mut self.relay,
            &mut self.store,
            &mut self.sink,
        );
        self.clock.advance(TICK_MS);
    }

    fn tick_n(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }
}

fn scheduled_config() -> PumpConfig {
    let mut config = PumpConfig::default();
    config.schedule.enabled = true;
    config.schedule.on_hour = 6;
    config.schedule.on_minute = 0;
    config.schedule.off_hour = 18;
    config.schedule.off_minute = 0;
    config
}

#[test]
fn schedule_window_turns_pump_on_and_off() {
    let mut rig = Rig::new(scheduled_config());

    // Wall clock defaults to noon, mid-window.
    rig.tick();
    assert!(rig.relay.is_on());
    assert!(rig.sink.any(|e| matches!(
        e,
        AppEvent::RelayChanged {
            on: true,
            source: RequestSource::Schedule,
            ..
        }
    )));

    // Window closes at 18:00.
    rig.clock.set_hour_minute(18, 0);
    rig.tick();
    assert!(!rig.relay.is_on());
    assert_eq!(rig.relay.transitions, vec![true, false]);
}

#[test]
fn unsynced_clock_keeps_schedule_off() {
    let mut rig = Rig::new(scheduled_config());
    rig.clock.set_wall(None);
    rig.tick_n(5);
    assert!(!rig.relay.is_on());
    assert!(rig.relay.transitions.is_empty());
}

#[test]
fn undervoltage_trips_relay_and_lockout_holds() {
    let mut rig = Rig::new(scheduled_config());
    rig.tick_n(3);
    assert!(rig.relay.is_on());

    rig.meter.set(150.0, 4.0, 0.85);
    rig.tick();
    assert!(!rig.relay.is_on());
    assert!(rig.sink.any(|e| matches!(
        e,
        AppEvent::FaultTripped {
            code: FaultCode::Undervoltage,
            ..
        }
    )));
    assert_eq!(rig.service.status().last_fault, FaultCode::Undervoltage);

    // Voltage recovers immediately, but the lockout holds the relay off
    // while the schedule silently retries.
    rig.meter.set(230.0, 4.0, 0.85);
    rig.tick_n(LOCKOUT_MS / TICK_MS - 1);
    assert!(!rig.relay.is_on());

    // Lockout expires (min-off elapsed long ago within it); the schedule
    // restarts the pump without operator action.
    rig.tick_n(3);
    assert!(rig.relay.is_on());
}

#[test]
fn manual_start_blocked_then_retries_after_min_off() {
    let mut rig = Rig::new(PumpConfig::default()); // schedule disabled

    rig.service.handle_command(AppCommand::StartPressed);
    rig.tick();
    assert!(rig.relay.is_on());

    rig.service.handle_command(AppCommand::StopPressed);
    rig.tick();
    assert!(!rig.relay.is_on());

    // Restart one second after stopping: anti-chatter refuses and says so.
    rig.service.handle_command(AppCommand::StartPressed);
    rig.tick();
    assert!(!rig.relay.is_on());
    assert!(rig.sink.any(|e| matches!(
        e,
        AppEvent::StartBlocked {
            source: RequestSource::Manual,
            reason: BlockReason::AntiChatter,
        }
    )));

    // The request stays commanded and succeeds once the gate opens.
    rig.tick_n(MIN_OFF_MS / TICK_MS + 1);
    assert!(rig.relay.is_on());
}

#[test]
fn manual_stop_latches_off_until_cleared_remotely() {
    let mut rig = Rig::new(scheduled_config());
    rig.tick();
    assert!(rig.relay.is_on());

    rig.service.handle_command(AppCommand::StopPressed);
    rig.tick();
    assert!(!rig.relay.is_on());

    // Mid-window, but the manual latch suppresses the schedule.
    rig.tick_n(MIN_OFF_MS / TICK_MS + 5);
    assert!(!rig.relay.is_on());

    rig.service.handle_command(AppCommand::ApplyIntent(ControlIntent {
        clear_manual_override: true,
        ..Default::default()
    }));
    rig.tick();
    assert!(rig.sink.any(|e| matches!(e, AppEvent::LatchCleared)));
    assert!(rig.relay.is_on(), "schedule resumes once latch clears");
}

#[test]
fn meter_unavailable_never_trips_and_reports_once() {
    let mut rig = Rig::new(scheduled_config());
    rig.tick();
    assert!(rig.relay.is_on());

    rig.meter.unavailable();
    rig.tick_n(5);

    assert!(rig.relay.is_on(), "no trip on a cold meter");
    assert!(!rig.sink.any(|e| matches!(e, AppEvent::FaultTripped { .. })));
    let unavailable = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::MeterUnavailable))
        .count();
    assert_eq!(unavailable, 1, "reported on the transition only");
}

#[test]
fn garbled_sample_is_sanitised_not_fault_evaluated() {
    let mut rig = Rig::new(scheduled_config());
    rig.tick();
    assert!(rig.relay.is_on());

    // NaN voltage sanitises to 0 V, which would read as undervoltage if it
    // ever reached the evaluator.
    rig.meter.set(f32::NAN, 4.0, 0.85);
    rig.tick_n(3);
    assert!(rig.relay.is_on());
    assert!(!rig.sink.any(|e| matches!(e, AppEvent::FaultTripped { .. })));
}

#[test]
fn config_update_validates_persists_and_reports() {
    let mut rig = Rig::new(PumpConfig::default());

    let mut updated = PumpConfig::default();
    updated.thresholds.max_current_a = 12.0;
    rig.service.handle_command(AppCommand::UpdateConfig(updated));
    rig.tick();
    assert!(rig.sink.any(|e| matches!(e, AppEvent::ConfigUpdated)));
    assert_eq!(rig.store.saved, Some(updated));
    assert_eq!(rig.service.config().thresholds.max_current_a, 12.0);

    // An invalid update is rejected wholesale.
    rig.sink.clear();
    let mut bad = updated;
    bad.thresholds.min_voltage_v = 400.0;
    rig.service.handle_command(AppCommand::UpdateConfig(bad));
    rig.tick();
    assert!(!rig.sink.any(|e| matches!(e, AppEvent::ConfigUpdated)));
    assert_eq!(rig.service.config().thresholds.min_voltage_v, 180.0);
    assert_eq!(rig.store.saved, Some(updated));
}

#[test]
fn upload_sample_is_latest_genuine_and_taken_once() {
    let mut rig = Rig::new(PumpConfig::default());
    rig.tick();
    rig.meter.set(232.5, 3.8, 0.82);
    rig.tick();

    let sample = rig.service.take_upload_sample().unwrap();
    assert!((sample.voltage_v - 232.5).abs() < 0.01);
    assert!(rig.service.take_upload_sample().is_none());

    // Fallback samples never become upload candidates.
    rig.meter.unavailable();
    rig.tick_n(3);
    assert!(rig.service.take_upload_sample().is_none());
}

#[test]
fn runtime_accumulates_across_manual_runs() {
    let mut rig = Rig::new(PumpConfig::default());

    rig.service.handle_command(AppCommand::StartPressed);
    rig.tick();
    rig.tick_n(9);
    rig.service.handle_command(AppCommand::StopPressed);
    rig.tick();
    assert!(!rig.relay.is_on());
    assert_eq!(rig.service.total_run_secs(rig.clock.now_ms()), 10);
}
