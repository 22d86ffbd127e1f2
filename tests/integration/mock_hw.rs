//! Mock adapters for integration tests.
//!
//! Every port the control service and reconciler consume has an in-memory
//! stand-in here, so tests can script meter readings, move time by hand,
//! and assert on the full relay/event history without real hardware.

use std::cell::Cell;
use std::collections::HashMap;

use pumpguard::app::events::AppEvent;
use pumpguard::app::ports::{
    ClockPort, ConfigStorePort, EventSink, LogStorePort, MeterPort, RelayPort, RemotePort,
};
use pumpguard::config::PumpConfig;
use pumpguard::eventlog::LogEvent;
use pumpguard::schedule::WallTime;
use pumpguard::sync::{RemoteDocument, StatusPatch};
use pumpguard::telemetry::TelemetrySample;
use pumpguard::{StoreError, SyncError};

// ── Meter ─────────────────────────────────────────────────────

/// Returns whatever the test last scripted; `None` = meter unavailable.
#[derive(Default)]
pub struct MockMeter {
    pub sample: Option<TelemetrySample>,
}

#[allow(dead_code)]
impl MockMeter {
    pub fn set(&mut self, voltage_v: f32, current_a: f32, power_factor: f32) {
        self.sample = Some(TelemetrySample {
            voltage_v,
            current_a,
            real_power_w: voltage_v * current_a * power_factor,
            power_factor,
            energy_kwh: 0.0,
            sampled_at: 0,
        });
    }

    pub fn unavailable(&mut self) {
        self.sample = None;
    }
}

impl MeterPort for MockMeter {
    fn read_sample(&mut self) -> Option<TelemetrySample> {
        self.sample
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Hand-cranked clock. Wall time defaults to a synced mid-June noon.
pub struct MockClock {
    now_ms: Cell<u64>,
    wall: Cell<Option<WallTime>>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
            wall: Cell::new(Some(WallTime {
                year: 2025,
                month: 6,
                day: 15,
                hour: 12,
                minute: 0,
                second: 0,
            })),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    pub fn set_wall(&self, wall: Option<WallTime>) {
        self.wall.set(wall);
    }

    pub fn set_hour_minute(&self, hour: u8, minute: u8) {
        if let Some(mut w) = self.wall.get() {
            w.hour = hour;
            w.minute = minute;
            self.wall.set(Some(w));
        }
    }
}

impl ClockPort for MockClock {
    fn monotonic_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn wall_time(&self) -> Option<WallTime> {
        self.wall.get()
    }

    fn epoch_secs(&self) -> Option<u64> {
        self.wall.get().map(|_| 1_750_000_000)
    }
}

// ── Relay ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRelay {
    on: bool,
    /// Physical transitions only, in order.
    pub transitions: Vec<bool>,
}

#[allow(dead_code)]
impl MockRelay {
    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl RelayPort for MockRelay {
    fn set_output(&mut self, on: bool) {
        if on != self.on {
            self.transitions.push(on);
        }
        self.on = on;
    }
}

// ── Config store ──────────────────────────────────────────────

#[derive(Default)]
pub struct MemConfigStore {
    pub saved: Option<PumpConfig>,
    pub fail_save: bool,
}

impl ConfigStorePort for MemConfigStore {
    fn load(&self) -> Result<PumpConfig, StoreError> {
        Ok(self.saved.unwrap_or_default())
    }

    fn save(&mut self, config: &PumpConfig) -> Result<(), StoreError> {
        if self.fail_save {
            return Err(StoreError::Io);
        }
        self.saved = Some(*config);
        Ok(())
    }
}

// ── Log store ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MemLogStore {
    streams: HashMap<String, Vec<String>>,
}

impl LogStorePort for MemLogStore {
    fn append_line(&mut self, stream: &str, line: &str) -> Result<(), StoreError> {
        self.streams
            .entry(stream.to_owned())
            .or_default()
            .push(line.to_owned());
        Ok(())
    }

    fn read_lines(&self, stream: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.streams.get(stream).cloned().unwrap_or_default())
    }

    fn line_count(&self, stream: &str) -> Result<usize, StoreError> {
        Ok(self.streams.get(stream).map_or(0, Vec::len))
    }

    fn rotate(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        let lines = self.streams.remove(from).ok_or(StoreError::NotFound)?;
        self.streams.insert(to.to_owned(), lines);
        Ok(())
    }

    fn remove(&mut self, stream: &str) -> Result<(), StoreError> {
        self.streams.remove(stream);
        Ok(())
    }

    fn exists(&self, stream: &str) -> bool {
        self.streams.contains_key(stream)
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct CollectingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl CollectingSink {
    pub fn any(&self, predicate: impl Fn(&AppEvent) -> bool) -> bool {
        self.events.iter().any(predicate)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Remote ────────────────────────────────────────────────────

/// Scriptable remote document store with per-call failure switches.
#[derive(Default)]
pub struct MockRemote {
    pub document: RemoteDocument,
    pub exists: bool,
    pub offline: bool,
    pub fail_clear: bool,
    pub cleared: usize,
    pub pushed_logs: Vec<LogEvent>,
    pub pushed_telemetry: Vec<TelemetrySample>,
    pub last_status: Option<StatusPatch>,
}

impl RemotePort for MockRemote {
    fn ensure_exists(&mut self, defaults: &RemoteDocument) -> Result<(), SyncError> {
        if self.offline {
            return Err(SyncError::Offline);
        }
        if !self.exists {
            self.document = *defaults;
            self.exists = true;
        }
        Ok(())
    }

    fn fetch_document(&mut self) -> Result<RemoteDocument, SyncError> {
        if self.offline {
            return Err(SyncError::Offline);
        }
        Ok(self.document)
    }

    fn patch_status(&mut self, patch: &StatusPatch) -> Result<(), SyncError> {
        if self.offline {
            return Err(SyncError::Offline);
        }
        self.last_status = Some(*patch);
        Ok(())
    }

    fn clear_intent(&mut self) -> Result<(), SyncError> {
        if self.offline || self.fail_clear {
            return Err(SyncError::Timeout);
        }
        self.cleared += 1;
        self.document.force_on = Some(false);
        self.document.force_off = Some(false);
        self.document.clear_manual_override = Some(false);
        Ok(())
    }

    fn push_telemetry(&mut self, sample: &TelemetrySample) -> Result<(), SyncError> {
        if self.offline {
            return Err(SyncError::Offline);
        }
        self.pushed_telemetry.push(*sample);
        Ok(())
    }

    fn push_log_entry(&mut self, entry: &LogEvent) -> Result<(), SyncError> {
        if self.offline {
            return Err(SyncError::Offline);
        }
        self.pushed_logs.push(entry.clone());
        Ok(())
    }
}
