//! Remote reconciliation.
//!
//! Periodically converges local state with a per-device document in a cloud
//! store reachable over an unreliable link. One [`Reconciler::run_cycle`]
//! performs five steps, each independently fallible — a failed step is
//! skipped and retried next cycle, and never touches relay logic:
//!
//! 1. Ensure the remote document exists (first boot creates it from local
//!    defaults).
//! 2. Push a status patch (online, relay state, last fault, timestamp).
//! 3. Fetch the config+control document; apply valid present fields, hand
//!    any control intent to the control loop exactly once.
//! 4. Upload the latest telemetry sample.
//! 5. Drain the pending event-log batch entry-by-entry.
//!
//! The exactly-once intent rule: an intent is applied locally, then cleared
//! remotely. If the clear patch fails, the *next* fetched intent is ignored
//! until the clear succeeds — an intent can be dropped on a crash in the
//! window between apply and clear, but is never applied twice.

use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigStorePort, LogStorePort, RemotePort};
use crate::config::{validate_config, PumpConfig};
use crate::eventlog::{EventCategory, EventLog, LogEvent};
use crate::relay::ControlIntent;
use crate::telemetry::TelemetrySample;

/// The typed remote document. Every field is optional: the store patches
/// fields independently, and a fetch must tolerate documents written by
/// older app versions or a partially-initialised console.
///
/// Field names match the wire schema of the device document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    #[serde(rename = "minVoltage_V", skip_serializing_if = "Option::is_none")]
    pub min_voltage_v: Option<f32>,
    #[serde(rename = "maxVoltage_V", skip_serializing_if = "Option::is_none")]
    pub max_voltage_v: Option<f32>,
    #[serde(rename = "maxCurrent_A", skip_serializing_if = "Option::is_none")]
    pub max_current_a: Option<f32>,
    #[serde(rename = "minCurrent_A", skip_serializing_if = "Option::is_none")]
    pub min_current_a: Option<f32>,
    #[serde(rename = "minPF", skip_serializing_if = "Option::is_none")]
    pub min_power_factor: Option<f32>,

    #[serde(rename = "onHour", skip_serializing_if = "Option::is_none")]
    pub on_hour: Option<u8>,
    #[serde(rename = "onMinute", skip_serializing_if = "Option::is_none")]
    pub on_minute: Option<u8>,
    #[serde(rename = "offHour", skip_serializing_if = "Option::is_none")]
    pub off_hour: Option<u8>,
    #[serde(rename = "offMinute", skip_serializing_if = "Option::is_none")]
    pub off_minute: Option<u8>,
    #[serde(rename = "scheduleEnabled", skip_serializing_if = "Option::is_none")]
    pub schedule_enabled: Option<bool>,
    #[serde(rename = "seasonStartMonth", skip_serializing_if = "Option::is_none")]
    pub season_start_month: Option<u8>,
    #[serde(rename = "seasonEndMonth", skip_serializing_if = "Option::is_none")]
    pub season_end_month: Option<u8>,
    #[serde(rename = "horsepower", skip_serializing_if = "Option::is_none")]
    pub horsepower: Option<f32>,

    #[serde(rename = "forceOn", skip_serializing_if = "Option::is_none")]
    pub force_on: Option<bool>,
    #[serde(rename = "forceOff", skip_serializing_if = "Option::is_none")]
    pub force_off: Option<bool>,
    #[serde(
        rename = "clearManualOverride",
        skip_serializing_if = "Option::is_none"
    )]
    pub clear_manual_override: Option<bool>,
}

impl RemoteDocument {
    /// A fully-populated document from the local config, used to create
    /// the remote document on first contact.
    pub fn from_config(config: &PumpConfig) -> Self {
        Self {
            min_voltage_v: Some(config.thresholds.min_voltage_v),
            max_voltage_v: Some(config.thresholds.max_voltage_v),
            max_current_a: Some(config.thresholds.max_current_a),
            min_current_a: Some(config.thresholds.min_current_a),
            min_power_factor: Some(config.thresholds.min_power_factor),
            on_hour: Some(config.schedule.on_hour),
            on_minute: Some(config.schedule.on_minute),
            off_hour: Some(config.schedule.off_hour),
            off_minute: Some(config.schedule.off_minute),
            schedule_enabled: Some(config.schedule.enabled),
            season_start_month: Some(config.schedule.season_start_month),
            season_end_month: Some(config.schedule.season_end_month),
            horsepower: Some(config.horsepower),
            force_on: Some(false),
            force_off: Some(false),
            clear_manual_override: Some(false),
        }
    }

    /// The control intent carried by this document. Missing flags read as
    /// false.
    pub fn intent(&self) -> ControlIntent {
        ControlIntent {
            force_on: self.force_on.unwrap_or(false),
            force_off: self.force_off.unwrap_or(false),
            clear_manual_override: self.clear_manual_override.unwrap_or(false),
        }
    }
}

/// Status fields pushed to the remote document. Only these fields are
/// overwritten by the patch; config and intent fields stay untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusPatch {
    pub online: bool,
    #[serde(rename = "relayOn")]
    pub relay_on: bool,
    #[serde(rename = "lastFault")]
    pub last_fault: &'static str,
    #[serde(rename = "updatedAt")]
    pub updated_at: u64,
}

/// What one reconciliation cycle produced for the control loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOutcome {
    /// Intent to apply this cycle, already cleared (or queued for clearing)
    /// remotely.
    pub intent: Option<ControlIntent>,
    /// True if remote config fields changed the local configuration.
    pub config_changed: bool,
}

pub struct Reconciler<R: RemotePort> {
    remote: R,
    document_ensured: bool,
    /// A previous intent was applied but its remote clear failed. No new
    /// intent is accepted until the clear goes through.
    pending_clear: bool,
}

impl<R: RemotePort> Reconciler<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            document_ensured: false,
            pending_clear: false,
        }
    }

    /// Access the transport adapter.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    /// Run one reconciliation cycle. `epoch_secs` is 0 while unsynced;
    /// `sample` is the latest genuine telemetry, if any arrived since the
    /// last cycle.
    pub fn run_cycle<C: ConfigStorePort, S: LogStorePort>(
        &mut self,
        status: &StatusPatch,
        sample: Option<&TelemetrySample>,
        config: &mut PumpConfig,
        config_store: &mut C,
        event_log: &mut EventLog<S>,
        epoch_secs: u64,
    ) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        // Step 1: first-contact document creation.
        if !self.document_ensured {
            match self.remote.ensure_exists(&RemoteDocument::from_config(config)) {
                Ok(()) => self.document_ensured = true,
                Err(e) => {
                    log::debug!("sync: ensure_exists failed: {e}");
                    return outcome;
                }
            }
        }

        // Step 2: status patch.
        if let Err(e) = self.remote.patch_status(status) {
            log::warn!("sync: status patch failed: {e}");
        }

        // Step 3a: retry an outstanding intent clear before looking at the
        // document again.
        if self.pending_clear {
            match self.remote.clear_intent() {
                Ok(()) => self.pending_clear = false,
                Err(e) => log::warn!("sync: intent clear retry failed: {e}"),
            }
        }

        // Step 3b: fetch and apply config + intent.
        match self.remote.fetch_document() {
            Ok(doc) => {
                outcome.config_changed =
                    self.apply_config(&doc, config, config_store, event_log, epoch_secs);

                let intent = doc.intent();
                if !intent.is_empty() && !self.pending_clear {
                    outcome.intent = Some(intent);
                    if let Err(e) = self.remote.clear_intent() {
                        log::warn!("sync: intent clear failed, deferring: {e}");
                        self.pending_clear = true;
                    }
                }
            }
            Err(e) => log::warn!("sync: document fetch failed: {e}"),
        }

        // Step 4: telemetry upload.
        if let Some(sample) = sample {
            if let Err(e) = self.remote.push_telemetry(sample) {
                log::warn!("sync: telemetry upload failed: {e}");
            }
        }

        // Step 5: drain the pending log batch.
        self.drain_pending_log(event_log);

        outcome
    }

    /// Overlay present document fields onto the local config, validating
    /// each field in isolation. A rejected field keeps its previous value
    /// and is reported in the event log; the remaining fields still apply.
    fn apply_config<C: ConfigStorePort, S: LogStorePort>(
        &mut self,
        doc: &RemoteDocument,
        config: &mut PumpConfig,
        config_store: &mut C,
        event_log: &mut EventLog<S>,
        epoch_secs: u64,
    ) -> bool {
        let mut working = *config;
        let mut changed = false;
        let mut rejected: heapless::Vec<&'static str, 13> = heapless::Vec::new();

        let mut apply = |name: &'static str, set: &dyn Fn(&mut PumpConfig)| {
            let mut candidate = working;
            set(&mut candidate);
            if candidate == working {
                return;
            }
            if validate_config(&candidate).is_ok() {
                working = candidate;
                changed = true;
            } else {
                let _ = rejected.push(name);
            }
        };

        if let Some(v) = doc.min_voltage_v {
            apply("minVoltage_V", &|c| c.thresholds.min_voltage_v = v);
        }
        if let Some(v) = doc.max_voltage_v {
            apply("maxVoltage_V", &|c| c.thresholds.max_voltage_v = v);
        }
        if let Some(v) = doc.max_current_a {
            apply("maxCurrent_A", &|c| c.thresholds.max_current_a = v);
        }
        if let Some(v) = doc.min_current_a {
            apply("minCurrent_A", &|c| c.thresholds.min_current_a = v);
        }
        if let Some(v) = doc.min_power_factor {
            apply("minPF", &|c| c.thresholds.min_power_factor = v);
        }
        if let Some(v) = doc.on_hour {
            apply("onHour", &|c| c.schedule.on_hour = v);
        }
        if let Some(v) = doc.on_minute {
            apply("onMinute", &|c| c.schedule.on_minute = v);
        }
        if let Some(v) = doc.off_hour {
            apply("offHour", &|c| c.schedule.off_hour = v);
        }
        if let Some(v) = doc.off_minute {
            apply("offMinute", &|c| c.schedule.off_minute = v);
        }
        if let Some(v) = doc.schedule_enabled {
            apply("scheduleEnabled", &|c| c.schedule.enabled = v);
        }
        if let Some(v) = doc.season_start_month {
            apply("seasonStartMonth", &|c| c.schedule.season_start_month = v);
        }
        if let Some(v) = doc.season_end_month {
            apply("seasonEndMonth", &|c| c.schedule.season_end_month = v);
        }
        if let Some(v) = doc.horsepower {
            apply("horsepower", &|c| c.horsepower = v);
        }

        for name in &rejected {
            log::warn!("sync: rejected remote value for {name}");
            let entry = LogEvent::new(
                epoch_secs,
                EventCategory::Cfg,
                format!("rejected remote value for {name}"),
            );
            if let Err(e) = event_log.append(&entry) {
                log::warn!("sync: could not log config rejection: {e}");
            }
        }

        if changed {
            *config = working;
            // Applied in memory even if the persist fails; the store retries
            // on the next change and the failure is visible in the log.
            if let Err(e) = config_store.save(config) {
                log::error!("sync: config persist failed: {e}");
            }
        }
        changed
    }

    /// Upload pending log entries one by one; the batch is deleted only
    /// after every entry was accepted. A partial upload leaves the batch in
    /// place for a full retry (duplicates possible, loss not).
    fn drain_pending_log<S: LogStorePort>(&mut self, event_log: &mut EventLog<S>) {
        if !event_log.has_pending() {
            return;
        }
        let entries = match event_log.pending_entries() {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("sync: cannot read pending log batch: {e}");
                return;
            }
        };

        for entry in &entries {
            if let Err(e) = self.remote.push_log_entry(entry) {
                log::warn!("sync: log upload failed, keeping batch: {e}");
                return;
            }
        }

        if let Err(e) = event_log.clear_pending() {
            log::warn!("sync: could not delete drained batch: {e}");
        }
    }
}
