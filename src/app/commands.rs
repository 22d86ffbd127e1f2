//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (buttons, the
//! remote reconciler, a provisioning channel) that the
//! [`ControlService`](super::service::ControlService) interprets on its
//! next cycle.

use crate::config::PumpConfig;
use crate::relay::ControlIntent;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy)]
pub enum AppCommand {
    /// Debounced edge from the manual start button.
    StartPressed,

    /// Debounced edge from the manual stop button.
    StopPressed,

    /// One-shot remote intent handed over by the reconciler.
    ApplyIntent(ControlIntent),

    /// Replace the active configuration. The service validates the
    /// candidate and persists it before it takes effect.
    UpdateConfig(PumpConfig),
}
