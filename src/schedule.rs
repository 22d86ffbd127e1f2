//! Daily run window with a seasonal month gate.
//!
//! The evaluator is a pure function of (wall-clock time, schedule) and is
//! completely independent of relay state: it answers "should the pump run
//! *now* according to the calendar", nothing else. The relay controller
//! decides whether that wish is actually honoured.
//!
//! Both the daily window and the season range may wrap: a window of
//! 22:00 → 02:00 spans midnight, a season of Nov → Feb spans new year.

use serde::{Deserialize, Serialize};

/// Civil wall-clock time as delivered by the RTC/NTP collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub year: u16,
    /// 1–12.
    pub month: u8,
    /// 1–31.
    pub day: u8,
    /// 0–23.
    pub hour: u8,
    /// 0–59.
    pub minute: u8,
    /// 0–59.
    pub second: u8,
}

/// Daily on/off window plus seasonal month gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Hour the window opens (0–23).
    pub on_hour: u8,
    /// Minute the window opens (0–59).
    pub on_minute: u8,
    /// Hour the window closes (0–23).
    pub off_hour: u8,
    /// Minute the window closes (0–59).
    pub off_minute: u8,
    /// Master enable for automatic operation.
    pub enabled: bool,
    /// First month of the season (1–12, inclusive).
    pub season_start_month: u8,
    /// Last month of the season (1–12, inclusive; wrap-around allowed).
    pub season_end_month: u8,
}

impl Default for Schedule {
    fn default() -> Self {
        // Disabled out of the box: a freshly flashed controller must not
        // start a pump until someone has set a schedule deliberately.
        Self {
            on_hour: 6,
            on_minute: 0,
            off_hour: 6,
            off_minute: 30,
            enabled: false,
            season_start_month: 1,
            season_end_month: 12,
        }
    }
}

impl Schedule {
    /// True if `month` (1–12) falls inside the season range, wrap-around
    /// inclusive on both ends (e.g. Nov–Feb covers 11, 12, 1, 2).
    pub fn in_season(&self, month: u8) -> bool {
        if self.season_start_month <= self.season_end_month {
            month >= self.season_start_month && month <= self.season_end_month
        } else {
            month >= self.season_start_month || month <= self.season_end_month
        }
    }

    /// Should the pump run at `now` according to this schedule?
    ///
    /// `false` when disabled or out of season. The daily window is
    /// half-open `[on, off)`; `on == off` is defined as "never runs".
    pub fn is_within_window(&self, now: &WallTime) -> bool {
        if !self.enabled || !self.in_season(now.month) {
            return false;
        }

        let on = u16::from(self.on_hour) * 60 + u16::from(self.on_minute);
        let off = u16::from(self.off_hour) * 60 + u16::from(self.off_minute);
        let cur = u16::from(now.hour) * 60 + u16::from(now.minute);

        if on == off {
            false
        } else if on < off {
            cur >= on && cur < off
        } else {
            // Wraps past midnight: [on, 24:00) ∪ [00:00, off).
            cur >= on || cur < off
        }
    }
}
