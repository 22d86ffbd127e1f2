//! One-shot hardware peripheral initialization.
//!
//! Configures the button inputs and their ISRs using raw ESP-IDF sys
//! calls (the ISR handlers need the raw registration API). The relay
//! output is owned by a `PinDriver` constructed in `main()`, not here.
//! Called once from `main()` before the event loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the event loop; single-threaded.
    unsafe {
        init_button_inputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── Button inputs ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_button_inputs() -> Result<(), HwInitError> {
    for &pin in &[pins::START_BUTTON_GPIO, pins::STOP_BUTTON_GPIO] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }
    info!("hw_init: button inputs configured");
    Ok(())
}

/// ISR for both buttons. `arg` carries the [`ButtonId`] discriminant.
///
/// [`ButtonId`]: crate::drivers::button::ButtonId
#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_isr(arg: *mut core::ffi::c_void) {
    use crate::drivers::button::{record_press, ButtonId};
    use crate::events::{push_event, Event};

    let id = if arg as usize == ButtonId::Start as usize {
        ButtonId::Start
    } else {
        ButtonId::Stop
    };
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u32;
    record_press(id, now_ms);
    push_event(Event::ButtonWake);
}

/// Install the GPIO ISR service and attach the button handlers.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    use crate::drivers::button::ButtonId;

    // SAFETY: Called once from main() after init_peripherals(); the handler
    // only touches atomics and the lock-free event queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        for (pin, id) in [
            (pins::START_BUTTON_GPIO, ButtonId::Start),
            (pins::STOP_BUTTON_GPIO, ButtonId::Stop),
        ] {
            let ret = gpio_isr_handler_add(pin, Some(button_isr), id as usize as *mut _);
            if ret != ESP_OK as i32 {
                return Err(HwInitError::IsrInstallFailed(ret));
            }
        }
    }
    info!("hw_init: button ISRs attached");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    Ok(())
}
