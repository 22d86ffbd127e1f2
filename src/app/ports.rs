//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (meter, clock, relay, storage, remote service) implement
//! these traits. The [`ControlService`](super::service::ControlService) and
//! the [`Reconciler`](crate::sync::Reconciler) consume them via generics, so
//! the domain core never touches hardware or HTTP directly.
//!
//! ## Safety notes
//!
//! - **ConfigStorePort** implementations MUST range-validate before
//!   persisting. Invalid values are rejected, never silently clamped — a
//!   compromised remote channel must not widen the safety envelope.
//! - **ClockPort**: anti-chatter and lockout timing use `monotonic_ms` only.
//!   Wall-clock jumps (NTP sync, RTC correction) must never shorten an
//!   enforced off-time.
//! - All port errors are typed — callers handle every variant explicitly.

use crate::config::PumpConfig;
use crate::error::{StoreError, SyncError};
use crate::eventlog::LogEvent;
use crate::schedule::WallTime;
use crate::sync::{RemoteDocument, StatusPatch};
use crate::telemetry::TelemetrySample;

// ───────────────────────────────────────────────────────────────
// Meter port (driven adapter: energy meter → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the energy meter.
///
/// `None` means the meter is unavailable this cycle (bus error, warming up).
/// Register decoding and bus framing are the adapter's concern.
pub trait MeterPort {
    fn read_sample(&mut self) -> Option<TelemetrySample>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Time source. Monotonic and wall-clock time are deliberately separate:
/// the relay state machine runs on monotonic milliseconds, the scheduler
/// on civil wall time, and only the latter may be absent.
pub trait ClockPort {
    /// Milliseconds since boot. Never jumps backwards.
    fn monotonic_ms(&self) -> u64;

    /// Civil local time, or `None` until the RTC/NTP source has synced.
    fn wall_time(&self) -> Option<WallTime>;

    /// Unix seconds, or `None` until synced. Used for log timestamps.
    fn epoch_secs(&self) -> Option<u64>;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → relay hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the relay output. Wiring polarity (active-low
/// module vs. direct drive) is the driver's concern, not the domain's.
pub trait RelayPort {
    fn set_output(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Configuration store port
// ───────────────────────────────────────────────────────────────

/// Loads and persists the pump configuration.
///
/// Implementations use a crash-safe per-field layout: a partial write on
/// power loss corrupts at most one field, and a missing field falls back
/// to that field's default on load.
pub trait ConfigStorePort {
    /// Load configuration. Returns `PumpConfig::default()`-based values
    /// for fields that have never been written.
    fn load(&self) -> Result<PumpConfig, StoreError>;

    /// Validate and persist. Rejects out-of-range values with
    /// [`StoreError::ValidationFailed`] naming the offending field.
    fn save(&mut self, config: &PumpConfig) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Log store port (named append-only byte streams)
// ───────────────────────────────────────────────────────────────

/// Persistence for the JSON-lines event log.
///
/// Streams are named append-only line files; `rotate` must be atomic
/// (rename semantics) so a crash never leaves a half-moved batch. The
/// capacity bound is enforced by the core, not here.
pub trait LogStorePort {
    fn append_line(&mut self, stream: &str, line: &str) -> Result<(), StoreError>;

    /// All lines of a stream, in append order. Empty vec if absent.
    fn read_lines(&self, stream: &str) -> Result<Vec<String>, StoreError>;

    fn line_count(&self, stream: &str) -> Result<usize, StoreError>;

    /// Atomically move `from` over `to`, replacing `to` if it exists.
    fn rotate(&mut self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Delete a stream. `Ok(())` even if it did not exist.
    fn remove(&mut self, stream: &str) -> Result<(), StoreError>;

    fn exists(&self, stream: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Remote port (driven adapter: domain → cloud document store)
// ───────────────────────────────────────────────────────────────

/// Typed boundary over the remote per-device document.
///
/// Patch semantics: only fields declared in the patch overwrite remote
/// state. Auth tokens, retries at the HTTP level, and session lifecycle
/// are opaque to the domain; every method is independently fallible and
/// the reconciler treats each failure as "skip, retry next cycle".
pub trait RemotePort {
    /// Create the device document from local defaults if it does not exist.
    fn ensure_exists(&mut self, defaults: &RemoteDocument) -> Result<(), SyncError>;

    /// Fetch the full config+control document.
    fn fetch_document(&mut self) -> Result<RemoteDocument, SyncError>;

    /// Patch the status fields of the document.
    fn patch_status(&mut self, patch: &StatusPatch) -> Result<(), SyncError>;

    /// Reset the remote control-intent flags after local application.
    fn clear_intent(&mut self) -> Result<(), SyncError>;

    /// Upload one telemetry sample as a new immutable record.
    fn push_telemetry(&mut self, sample: &TelemetrySample) -> Result<(), SyncError>;

    /// Upload one event-log entry as a new immutable record.
    fn push_log_entry(&mut self, entry: &LogEvent) -> Result<(), SyncError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go — serial log, display,
/// a BLE characteristic.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
