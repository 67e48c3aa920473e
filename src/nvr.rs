//! Battery-backed clock ("NVR") framework.
//!
//! Real-time clock chips on PC compatibles sit behind a small amount of
//! shared machinery: something fetches the host calendar to seed the chip,
//! something knows month lengths for rollover, and the machine's timer
//! subsystem calls back into the chip once per emulated second. This module
//! provides that machinery; the chip itself lives in
//! [`crate::devices::mm58167`].

use chrono::{Datelike, Local, Timelike};

/// A calendar snapshot in the layout clock chips consume.
///
/// Field conventions follow the classic C `struct tm` contract the rest of
/// the emulator speaks: `month0` is 0-11, `weekday0` is 0-6 with Sunday as
/// 0, and `year` is the full calendar year (e.g. 2026).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    pub year: i32,
    pub month0: u8,
    pub day: u8,
    pub weekday0: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Source of the host's current calendar time.
///
/// Devices take this as a trait object so tests can freeze the clock at a
/// known instant.
pub trait HostClock {
    fn now(&self) -> CalendarTime;
}

/// [`HostClock`] backed by the host's local time zone.
pub struct SystemClock;

impl HostClock for SystemClock {
    fn now(&self) -> CalendarTime {
        let now = Local::now();
        CalendarTime {
            year: now.year(),
            month0: now.month0() as u8,
            day: now.day() as u8,
            weekday0: now.weekday().num_days_from_sunday() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
        }
    }
}

/// Lifecycle callbacks of a battery-backed clock chip.
///
/// The embedding machine invokes these: `reset` on a hard reset, `start`
/// when the clock should (re)load the host time, and `tick` exactly once
/// per emulated second of elapsed virtual time. The chip holds no timer of
/// its own; pacing is entirely the caller's job.
pub trait ClockChip {
    /// Clear chip state, then restart timekeeping.
    fn reset(&mut self);

    /// Seed the time registers from the host calendar.
    fn start(&mut self);

    /// Advance the clock by one second.
    fn tick(&mut self);
}

/// Number of days in `month` (1-12) of `year` (full calendar year).
///
/// February honors the Gregorian leap rule: divisible by 4, except
/// centuries not divisible by 400.
pub fn days_in_month(month: u8, year: i32) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
                29
            } else {
                28
            }
        }
        // Out-of-range months only arise from invalid BCD in the month
        // register; 31 keeps the day counter advancing like the hardware.
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_lengths() {
        assert_eq!(days_in_month(1, 2026), 31);
        assert_eq!(days_in_month(4, 2026), 30);
        assert_eq!(days_in_month(9, 2026), 30);
        assert_eq!(days_in_month(12, 2026), 31);
    }

    #[test]
    fn test_february_leap_rule() {
        assert_eq!(days_in_month(2, 2026), 28);
        assert_eq!(days_in_month(2, 2024), 29);
        assert_eq!(days_in_month(2, 2000), 29, "divisible by 400");
        assert_eq!(days_in_month(2, 1900), 28, "century, not by 400");
    }

    #[test]
    fn test_system_clock_in_range() {
        let now = SystemClock.now();
        assert!(now.month0 < 12);
        assert!((1..=31).contains(&now.day));
        assert!(now.weekday0 < 7);
        assert!(now.hour < 24);
        assert!(now.minute < 60);
        assert!(now.second < 60);
    }
}
