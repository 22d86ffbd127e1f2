//! GPIO / peripheral pin assignments for the PumpGuard controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers. Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Relay output
// ---------------------------------------------------------------------------

/// Digital output driving the contactor coil module.
pub const RELAY_GPIO: i32 = 4;
/// Common relay modules energise on LOW.
pub const RELAY_ACTIVE_LOW: bool = true;

// ---------------------------------------------------------------------------
// Manual buttons (active-low momentary, external pull-up)
// ---------------------------------------------------------------------------

/// Manual start button.
pub const START_BUTTON_GPIO: i32 = 5;
/// Manual stop button.
pub const STOP_BUTTON_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Energy meter (Modbus-style serial meter on UART1)
// ---------------------------------------------------------------------------

pub const METER_UART_TX_GPIO: i32 = 17;
pub const METER_UART_RX_GPIO: i32 = 18;
pub const METER_UART_BAUD: u32 = 9600;

// ---------------------------------------------------------------------------
// UART debug console
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 43;
pub const UART_RX_GPIO: i32 = 44;
