//! ESP32 time adapter.
//!
//! Implements [`ClockPort`] for the controller.
//!
//! - **`target_os = "espidf"`** — monotonic time wraps `esp_timer_get_time()`
//!   (microsecond precision, immune to wall-clock jumps); wall time comes
//!   from the system clock once SNTP has synced it.
//! - **`not(target_os = "espidf")`** — `std::time::Instant` for host-side
//!   testing; wall time reads as unsynced.
//!
//! Obviously-unsynced wall time (before 2020-01-01) is rejected so the
//! scheduler never acts on the 1970 epoch a cold RTC boots with.

use crate::app::ports::ClockPort;
use crate::schedule::WallTime;

#[cfg(target_os = "espidf")]
const EPOCH_2020: i64 = 1_577_836_800;

pub struct Esp32Clock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32Clock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    #[cfg(target_os = "espidf")]
    fn synced_tv_sec(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return None;
        }
        Some(tv.tv_sec as i64)
    }
}

impl ClockPort for Esp32Clock {
    #[cfg(target_os = "espidf")]
    fn monotonic_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn monotonic_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(target_os = "espidf")]
    fn wall_time(&self) -> Option<WallTime> {
        let secs = self.synced_tv_sec()? as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        if tm.tm_mon < 0 || tm.tm_mon > 11 || tm.tm_hour < 0 || tm.tm_hour > 23 {
            return None;
        }
        Some(WallTime {
            year: (tm.tm_year + 1900) as u16,
            month: (tm.tm_mon + 1) as u8,
            day: tm.tm_mday as u8,
            hour: tm.tm_hour as u8,
            minute: tm.tm_min as u8,
            second: tm.tm_sec as u8,
        })
    }

    /// On non-ESP targets (simulation) the wall clock is never synced.
    #[cfg(not(target_os = "espidf"))]
    fn wall_time(&self) -> Option<WallTime> {
        None
    }

    #[cfg(target_os = "espidf")]
    fn epoch_secs(&self) -> Option<u64> {
        self.synced_tv_sec().map(|s| s as u64)
    }

    #[cfg(not(target_os = "espidf"))]
    fn epoch_secs(&self) -> Option<u64> {
        None
    }
}
