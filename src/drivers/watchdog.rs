//! Task Watchdog Timer (TWDT) driver.
//!
//! A stuck control loop must never leave the pump energised indefinitely,
//! so the loop subscribes to the TWDT and feeds it every iteration. If no
//! feed arrives within the timeout the device panics and reboots; the relay
//! GPIO then re-initialises de-energised.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Feed deadline. Generous against a slow reconciliation turn (the HTTP
/// transport's own timeouts are shorter than this).
#[cfg(target_os = "espidf")]
const TWDT_TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Configure the TWDT and subscribe the current task.
    ///
    /// Failure to subscribe is logged and tolerated; the controller keeps
    /// running without the reboot safety net rather than refusing to start.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self {
            subscribed: Self::subscribe(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        log::info!("Watchdog(sim): no-op");
        Self {}
    }

    #[cfg(target_os = "espidf")]
    fn subscribe() -> bool {
        let cfg = esp_task_wdt_config_t {
            timeout_ms: TWDT_TIMEOUT_MS,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: TWDT calls run from the single main task before the event
        // loop starts; esp_task_wdt_add(null) subscribes the calling task.
        unsafe {
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                // Bootloader may have configured it already.
                log::warn!("Watchdog: reconfigure returned {ret}");
            }
            if esp_task_wdt_add(core::ptr::null_mut()) != ESP_OK {
                log::warn!("Watchdog: subscribe failed, running without TWDT");
                return false;
            }
        }
        log::info!(
            "Watchdog: armed ({}s timeout, panic on trigger)",
            TWDT_TIMEOUT_MS / 1000
        );
        true
    }

    /// Feed the watchdog. Called once per loop iteration.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: reset only touches the subscription made in new().
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
