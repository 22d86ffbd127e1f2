//! Placeholder remote adapter.
//!
//! The REST adapter for the cloud document store lives in the integrating
//! firmware (it owns Wi-Fi bring-up and the auth token lifecycle).
//! [`NullRemote`] stands in wherever no transport is wired up: every call
//! reports offline, which the reconciler already treats as "skip and retry",
//! so the controller runs fully standalone.

use crate::app::ports::RemotePort;
use crate::error::SyncError;
use crate::eventlog::LogEvent;
use crate::sync::{RemoteDocument, StatusPatch};
use crate::telemetry::TelemetrySample;

#[derive(Debug, Default)]
pub struct NullRemote;

impl NullRemote {
    pub fn new() -> Self {
        Self
    }
}

impl RemotePort for NullRemote {
    fn ensure_exists(&mut self, _defaults: &RemoteDocument) -> Result<(), SyncError> {
        Err(SyncError::Offline)
    }

    fn fetch_document(&mut self) -> Result<RemoteDocument, SyncError> {
        Err(SyncError::Offline)
    }

    fn patch_status(&mut self, _patch: &StatusPatch) -> Result<(), SyncError> {
        Err(SyncError::Offline)
    }

    fn clear_intent(&mut self) -> Result<(), SyncError> {
        Err(SyncError::Offline)
    }

    fn push_telemetry(&mut self, _sample: &TelemetrySample) -> Result<(), SyncError> {
        Err(SyncError::Offline)
    }

    fn push_log_entry(&mut self, _entry: &LogEvent) -> Result<(), SyncError> {
        Err(SyncError::Offline)
    }
}
