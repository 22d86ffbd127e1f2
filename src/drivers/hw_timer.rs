//! Hardware timer module using ESP-IDF's esp_timer API.
//!
//! Creates the periodic control-tick timer that pushes events into the
//! lock-free SPSC queue. On simulation targets the main loop drives
//! itself with thread::sleep instead.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call push_event().

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::ControlTick);
}

/// Start the control tick timer at `interval_ms`. The timer runs for the
/// life of the firmware; it is never stopped or deleted, so the handle is
/// dropped after a successful start.
#[cfg(target_os = "espidf")]
pub fn start_timers(interval_ms: u32) {
    // SAFETY: Called once at boot from the single main-task context before
    // any timer callbacks fire. The callback only calls push_event(), which
    // is ISR-safe.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(control_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"control\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        let ret = esp_timer_create(&args, &raw mut handle);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: control timer create failed (rc={}) — continuing without ticks",
                ret
            );
            return;
        }
        let ret = esp_timer_start_periodic(handle, u64::from(interval_ms) * 1_000);
        if ret != ESP_OK {
            log::error!("hw_timer: control timer start failed (rc={})", ret);
            return;
        }

        info!("hw_timer: control tick every {}ms", interval_ms);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(_interval_ms: u32) {
    log::info!("hw_timer(sim): timers not started (events driven by sleep loop)");
}
