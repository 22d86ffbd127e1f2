//! Reconciler + control service wired together, mirroring the main loop's
//! sync turn: snapshot status, take the upload sample, run one cycle, feed
//! any intent back as a command.

use pumpguard::app::commands::AppCommand;
use pumpguard::app::service::ControlService;
use pumpguard::config::{ControlTiming, PumpConfig};
use pumpguard::eventlog::{EventCategory, EventLog, LogEvent, MAX_ACTIVE_ENTRIES};
use pumpguard::sync::{Reconciler, StatusPatch};

use crate::mock_hw::{
    CollectingSink, MemConfigStore, MemLogStore, MockClock, MockMeter, MockRelay, MockRemote,
};

const EPOCH: u64 = 1_750_000_000;

struct SyncRig {
    service: ControlService<MemLogStore>,
    reconciler: Reconciler<MockRemote>,
    meter: MockMeter,
    clock: MockClock,
    relay: MockRelay,
    store: MemConfigStore,
    sink: CollectingSink,
}

impl SyncRig {
    fn new(remote: MockRemote) -> Self {
        let event_log = EventLog::new(MemLogStore::default()).unwrap();
        let mut rig = Self {
            service: ControlService::new(
                PumpConfig::default(),
                ControlTiming::default(),
                event_log,
            ),
            reconciler: Reconciler::new(remote),
            meter: MockMeter::default(),
            clock: MockClock::new(100_000),
            relay: MockRelay::default(),
            store: MemConfigStore::default(),
            sink: CollectingSink::default(),
        };
        rig.meter.set(230.0, 4.0, 0.85);
        rig
    }

    fn tick(&mut self) {
        self.service.tick(
            &mut self.meter,
            &self.clock,
            &mut self.relay,
            &mut self.store,
            &mut self.sink,
        );
        self.clock.advance(1_000);
    }

    /// One sync turn exactly as the main loop performs it.
    fn sync_turn(&mut self) {
        let status = self.service.status();
        let patch = StatusPatch {
            online: true,
            relay_on: status.relay_on,
            last_fault: status.last_fault.tag(),
            updated_at: EPOCH,
        };
        let sample = self.service.take_upload_sample();
        let (config, event_log) = self.service.sync_parts();
        let outcome = self.reconciler.run_cycle(
            &patch,
            sample.as_ref(),
            config,
            &mut self.store,
            event_log,
            EPOCH,
        );
        if let Some(intent) = outcome.intent {
            self.service.handle_command(AppCommand::ApplyIntent(intent));
        }
    }
}

#[test]
fn remote_force_on_reaches_the_relay() {
    let mut remote = MockRemote {
        exists: true,
        ..Default::default()
    };
    remote.document.force_on = Some(true);
    let mut rig = SyncRig::new(remote);

    rig.tick();
    assert!(!rig.relay.is_on());

    rig.sync_turn();
    rig.tick();
    assert!(rig.relay.is_on(), "remote intent energises on the next tick");
    assert_eq!(rig.reconciler.remote().cleared, 1, "intent cleared remotely");

    // A second sync turn sees cleared flags and does nothing.
    rig.sync_turn();
    rig.tick();
    assert!(!rig.relay.is_on(), "no latch: schedule (off) resumes control");
}

#[test]
fn remote_config_fragment_applies_and_persists() {
    let mut remote = MockRemote {
        exists: true,
        ..Default::default()
    };
    remote.document.max_current_a = Some(6.5);
    remote.document.horsepower = Some(1.5);
    let mut rig = SyncRig::new(remote);

    rig.sync_turn();
    assert_eq!(rig.service.config().thresholds.max_current_a, 6.5);
    assert_eq!(rig.service.config().horsepower, 1.5);
    let saved = rig.store.saved.unwrap();
    assert_eq!(saved.thresholds.max_current_a, 6.5);
    // Untouched fields survive the overlay.
    assert_eq!(saved.schedule, PumpConfig::default().schedule);
}

#[test]
fn status_and_telemetry_reach_the_remote() {
    let remote = MockRemote {
        exists: true,
        ..Default::default()
    };
    let mut rig = SyncRig::new(remote);

    rig.tick(); // produces a genuine upload sample
    rig.sync_turn();

    let status = rig.reconciler.remote().last_status.unwrap();
    assert!(status.online);
    assert!(!status.relay_on);
    assert_eq!(status.last_fault, "none");
    assert_eq!(rig.reconciler.remote().pushed_telemetry.len(), 1);

    // No new sample between turns: nothing re-uploaded.
    rig.sync_turn();
    assert_eq!(rig.reconciler.remote().pushed_telemetry.len(), 1);
}

#[test]
fn rotated_log_batch_is_drained_to_the_remote() {
    let remote = MockRemote {
        exists: true,
        ..Default::default()
    };
    let mut rig = SyncRig::new(remote);

    // Overfill the active stream so a rotation has happened.
    {
        let (_, event_log) = rig.service.sync_parts();
        for n in 0..=MAX_ACTIVE_ENTRIES {
            event_log
                .append(&LogEvent::new(EPOCH, EventCategory::Run, format!("run {n}")))
                .unwrap();
        }
        assert!(event_log.has_pending());
    }

    rig.sync_turn();

    let (_, event_log) = rig.service.sync_parts();
    assert!(!event_log.has_pending(), "batch deleted after full upload");
    assert_eq!(
        rig.reconciler.remote().pushed_logs.len(),
        MAX_ACTIVE_ENTRIES
    );
}

#[test]
fn offline_remote_defers_first_contact() {
    let remote = MockRemote {
        offline: true,
        ..Default::default()
    };
    let mut rig = SyncRig::new(remote);

    rig.tick();
    rig.sync_turn();
    assert!(!rig.reconciler.remote().exists, "nothing created while offline");

    // Link comes up: the next turn creates the document from local config.
    rig.reconciler.remote_mut().offline = false;
    rig.sync_turn();
    let doc = rig.reconciler.remote().document;
    assert!(rig.reconciler.remote().exists);
    assert_eq!(doc.max_current_a, Some(9.0));
    assert_eq!(doc.force_on, Some(false));
}
