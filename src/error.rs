//! Error types for the PumpGuard firmware.
//!
//! All variants are `Copy` so they can be cheaply passed through the control
//! cycle without allocation. Safety faults are deliberately *not* an error
//! variant — they are the [`FaultCode`](crate::fault::FaultCode) outcome of a
//! successful evaluation and flow through the relay controller, not through
//! `Result`.

use core::fmt;

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Requested key or stream does not exist.
    NotFound,
    /// Stored value failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Storage partition is full.
    Full,
    /// Generic I/O error from the storage backend.
    Io,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Corrupted => write!(f, "corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Full => write!(f, "storage full"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation errors
// ---------------------------------------------------------------------------

/// Failures observed per remote call. Each reconciliation step that hits one
/// of these is skipped and retried on the next cycle; none of them may ever
/// influence relay safety logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// No transport available (Wi-Fi down, or the null placeholder adapter).
    Offline,
    /// The call did not complete within the transport's time box.
    Timeout,
    /// The service rejected our credentials or session.
    Auth,
    /// The response could not be parsed into the typed document.
    Malformed,
    /// The service answered with a non-success status.
    Rejected,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Timeout => write!(f, "timeout"),
            Self::Auth => write!(f, "authentication failed"),
            Self::Malformed => write!(f, "malformed response"),
            Self::Rejected => write!(f, "rejected by service"),
        }
    }
}
