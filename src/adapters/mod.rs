//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements      | Connects to                   |
//! |-------------|-----------------|-------------------------------|
//! | `nvs`       | ConfigStorePort | NVS / in-memory store         |
//! | `log_store` | LogStorePort    | std::fs (ESP-IDF VFS or host) |
//! | `log_sink`  | EventSink       | Serial log output             |
//! | `time`      | ClockPort       | ESP32 system timer + RTC      |
//! | `remote`    | RemotePort      | Nothing (offline placeholder) |
//!
//! The REST adapter for the cloud document store is supplied by the
//! integrating firmware; `remote::NullRemote` stands in until then.

pub mod log_sink;
pub mod log_store;
pub mod nvs;
pub mod remote;
pub mod time;
