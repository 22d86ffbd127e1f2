//! Bounded append-only event log.
//!
//! Events are JSON lines in a named active stream. When the active stream
//! hits its entry bound it is rotated — atomically renamed — into the single
//! `pending` slot for the reconciler to drain, and a fresh active stream
//! starts. Rotation **replaces** any unflushed previous batch: offline for
//! long enough, older events are lost in bounded amounts rather than
//! growing the log without limit. At most one pending batch ever exists.
//!
//! Entries are immutable once rotated; the reconciler only ever reads and
//! deletes the pending stream, never appends to it.

use serde::{Deserialize, Serialize};

use crate::app::ports::LogStorePort;
use crate::error::StoreError;

/// Stream names within the log store.
pub const ACTIVE_STREAM: &str = "events.jsonl";
pub const PENDING_STREAM: &str = "events.pending.jsonl";

/// Entry bound of the active stream. Sized for roughly a day of normal
/// operation (runs, button presses, sync notes) in a few KB of flash.
pub const MAX_ACTIVE_ENTRIES: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Net,
    Boot,
    Button,
    Fault,
    Run,
    Health,
    Cfg,
}

/// One log line. `timestamp` is Unix seconds, 0 while the clock is unsynced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: u64,
    pub category: EventCategory,
    pub message: String,
}

impl LogEvent {
    pub fn new(timestamp: u64, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            category,
            message: message.into(),
        }
    }
}

/// Append-side owner of the log streams. Single writer; the reconciler
/// accesses the pending batch through the methods below.
pub struct EventLog<S: LogStorePort> {
    store: S,
    active_count: usize,
}

impl<S: LogStorePort> EventLog<S> {
    /// Attach to the store, recovering the active entry count from a
    /// previous boot.
    pub fn new(store: S) -> Result<Self, StoreError> {
        let active_count = if store.exists(ACTIVE_STREAM) {
            store.line_count(ACTIVE_STREAM)?
        } else {
            0
        };
        Ok(Self {
            store,
            active_count,
        })
    }

    /// Append one event, rotating first if the active stream is full.
    pub fn append(&mut self, event: &LogEvent) -> Result<(), StoreError> {
        if self.active_count >= MAX_ACTIVE_ENTRIES {
            self.rotate()?;
        }

        let line = serde_json::to_string(event).map_err(|_| StoreError::Io)?;
        self.store.append_line(ACTIVE_STREAM, &line)?;
        self.active_count += 1;
        Ok(())
    }

    /// Move the active stream into the pending slot, replacing whatever
    /// was there. A fresh active stream starts on the next append.
    pub fn rotate(&mut self) -> Result<(), StoreError> {
        if !self.store.exists(ACTIVE_STREAM) {
            return Ok(());
        }
        self.store.rotate(ACTIVE_STREAM, PENDING_STREAM)?;
        self.active_count = 0;
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        self.store.exists(PENDING_STREAM)
    }

    /// Parse the pending batch. Corrupt lines are skipped with a warning;
    /// a torn final line from a power cut must not wedge the drain.
    pub fn pending_entries(&self) -> Result<Vec<LogEvent>, StoreError> {
        if !self.store.exists(PENDING_STREAM) {
            return Ok(Vec::new());
        }
        let lines = self.store.read_lines(PENDING_STREAM)?;
        let mut entries = Vec::with_capacity(lines.len());
        for line in &lines {
            match serde_json::from_str::<LogEvent>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::warn!("skipping corrupt log line: {e}"),
            }
        }
        Ok(entries)
    }

    /// Delete the pending batch after the reconciler has drained it.
    pub fn clear_pending(&mut self) -> Result<(), StoreError> {
        self.store.remove(PENDING_STREAM)
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }
}
