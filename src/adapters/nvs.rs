//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigStorePort`] with a **per-field** layout: every config
//! field is its own postcard blob under a short key. A partial write on
//! power loss corrupts at most one field, and a key that was never written
//! (or fails to decode) falls back to that field's default on load. ESP-IDF
//! commits each key atomically.
//!
//! - **`target_os = "espidf"`** — real NVS flash partition.
//! - **`not(target_os = "espidf")`** — in-memory map for host tests.

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app::ports::ConfigStorePort;
use crate::config::{validate_config, PumpConfig};
use crate::error::StoreError;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NAMESPACE: &str = "pumpguard";

// Short keys, NVS limits keys to 15 chars.
const KEY_MIN_VOLTAGE: &str = "minv";
const KEY_MAX_VOLTAGE: &str = "maxv";
const KEY_MAX_CURRENT: &str = "maxc";
const KEY_MIN_CURRENT: &str = "minc";
const KEY_MIN_PF: &str = "mpf";
const KEY_ON_HOUR: &str = "onh";
const KEY_ON_MINUTE: &str = "onm";
const KEY_OFF_HOUR: &str = "offh";
const KEY_OFF_MINUTE: &str = "offm";
const KEY_SCHED_ENABLED: &str = "sen";
const KEY_SEASON_START: &str = "ssm";
const KEY_SEASON_END: &str = "sem";
const KEY_HORSEPOWER: &str = "hp";

const MAX_FIELD_BLOB: usize = 16;

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<&'static str, Vec<u8>>,
}

impl Default for NvsConfigStore {
    /// A store that skips flash initialisation, for sessions that continue
    /// without persistence after `new()` failed. Reads return defaults and
    /// writes may not survive a reboot.
    fn default() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        }
    }
}

impl NvsConfigStore {
    /// Create the store and initialise NVS flash.
    ///
    /// On first boot or after a partition version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, StoreError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(StoreError::Io);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(StoreError::Io);
                }
            } else if ret != ESP_OK {
                return Err(StoreError::Io);
            }
            info!("NvsConfigStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsConfigStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    /// Read and decode one field; `None` if absent or undecodable.
    fn get_field<T: DeserializeOwned>(&self, key: &'static str) -> Option<T> {
        let bytes = self.read_raw(key)?;
        match postcard::from_bytes(&bytes) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("NvsConfigStore: corrupt blob for '{key}', using default");
                None
            }
        }
    }

    fn put_field<T: Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), StoreError> {
        let mut buf = [0u8; MAX_FIELD_BLOB];
        let bytes = postcard::to_slice(value, &mut buf).map_err(|_| StoreError::Io)?;
        self.write_raw(key, bytes)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&self, key: &'static str) -> Option<Vec<u8>> {
        self.store.get(key).cloned()
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_raw(&mut self, key: &'static str, bytes: &[u8]) -> Result<(), StoreError> {
        self.store.insert(key, bytes.to_vec());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn read_raw(&self, key: &'static str) -> Option<Vec<u8>> {
        Self::with_nvs_handle(false, |handle| {
            let key_cstr = Self::key_cstr(key);
            let mut size: usize = 0;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_cstr.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK || size == 0 || size > MAX_FIELD_BLOB {
                return Err(ret);
            }
            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_cstr.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        })
        .ok()
    }

    #[cfg(target_os = "espidf")]
    fn write_raw(&mut self, key: &'static str, bytes: &[u8]) -> Result<(), StoreError> {
        Self::with_nvs_handle(true, |handle| {
            let key_cstr = Self::key_cstr(key);
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_cstr.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|_| StoreError::Io)
    }

    #[cfg(target_os = "espidf")]
    fn key_cstr(key: &'static str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = key.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open the NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = NAMESPACE.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

impl ConfigStorePort for NvsConfigStore {
    fn load(&self) -> Result<PumpConfig, StoreError> {
        let mut config = PumpConfig::default();

        if let Some(v) = self.get_field(KEY_MIN_VOLTAGE) {
            config.thresholds.min_voltage_v = v;
        }
        if let Some(v) = self.get_field(KEY_MAX_VOLTAGE) {
            config.thresholds.max_voltage_v = v;
        }
        if let Some(v) = self.get_field(KEY_MAX_CURRENT) {
            config.thresholds.max_current_a = v;
        }
        if let Some(v) = self.get_field(KEY_MIN_CURRENT) {
            config.thresholds.min_current_a = v;
        }
        if let Some(v) = self.get_field(KEY_MIN_PF) {
            config.thresholds.min_power_factor = v;
        }
        if let Some(v) = self.get_field(KEY_ON_HOUR) {
            config.schedule.on_hour = v;
        }
        if let Some(v) = self.get_field(KEY_ON_MINUTE) {
            config.schedule.on_minute = v;
        }
        if let Some(v) = self.get_field(KEY_OFF_HOUR) {
            config.schedule.off_hour = v;
        }
        if let Some(v) = self.get_field(KEY_OFF_MINUTE) {
            config.schedule.off_minute = v;
        }
        if let Some(v) = self.get_field(KEY_SCHED_ENABLED) {
            config.schedule.enabled = v;
        }
        if let Some(v) = self.get_field(KEY_SEASON_START) {
            config.schedule.season_start_month = v;
        }
        if let Some(v) = self.get_field(KEY_SEASON_END) {
            config.schedule.season_end_month = v;
        }
        if let Some(v) = self.get_field(KEY_HORSEPOWER) {
            config.horsepower = v;
        }

        // A torn field can leave the combination out of range; fall back
        // wholesale rather than run with a widened envelope.
        if let Err(e) = validate_config(&config) {
            warn!("NvsConfigStore: stored config invalid ({e}), using defaults");
            return Ok(PumpConfig::default());
        }
        Ok(config)
    }

    fn save(&mut self, config: &PumpConfig) -> Result<(), StoreError> {
        validate_config(config)?;

        self.put_field(KEY_MIN_VOLTAGE, &config.thresholds.min_voltage_v)?;
        self.put_field(KEY_MAX_VOLTAGE, &config.thresholds.max_voltage_v)?;
        self.put_field(KEY_MAX_CURRENT, &config.thresholds.max_current_a)?;
        self.put_field(KEY_MIN_CURRENT, &config.thresholds.min_current_a)?;
        self.put_field(KEY_MIN_PF, &config.thresholds.min_power_factor)?;
        self.put_field(KEY_ON_HOUR, &config.schedule.on_hour)?;
        self.put_field(KEY_ON_MINUTE, &config.schedule.on_minute)?;
        self.put_field(KEY_OFF_HOUR, &config.schedule.off_hour)?;
        self.put_field(KEY_OFF_MINUTE, &config.schedule.off_minute)?;
        self.put_field(KEY_SCHED_ENABLED, &config.schedule.enabled)?;
        self.put_field(KEY_SEASON_START, &config.schedule.season_start_month)?;
        self.put_field(KEY_SEASON_END, &config.schedule.season_end_month)?;
        self.put_field(KEY_HORSEPOWER, &config.horsepower)?;
        info!("NvsConfigStore: config saved");
        Ok(())
    }
}
