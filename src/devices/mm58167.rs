//! Leading Edge Model D real-time clock (MM58167) emulation.
//!
//! The Model D integrates a battery-backed RTC based on the National
//! Semiconductor MM58167 chip, decoded at I/O ports 0x300-0x31F. This is a
//! non-standard location (the IBM AT clock lives at 0x70) and collides with
//! the usual XT-IDE default; historically users had to move XT-IDE to an
//! alternate address. DOS software reached the clock through the CLOCK.SYS
//! or CLKDVR.SYS driver.
//!
//! The chip exposes 32 byte-wide registers: current time in BCD, alarm
//! setpoints in the same layout, a sticky interrupt status register, an
//! interrupt control mask, and a handful of command triggers. One board
//! quirk matters: the Leading Edge stores the *year* in the alarm
//! day-of-month slot, base-80 BCD (stored 0x46 means 1980 + 46 = 2026) —
//! the chip itself has no year counter.
//!
//! Timekeeping is tick-driven: the machine calls [`ClockChip::tick`] once
//! per emulated second and the register file rolls over like the silicon
//! would, instead of re-reading host time on every access.

use log::{debug, trace};

use crate::bcd;
use crate::devices::bus::PortIoDevice;
use crate::devices::InterruptController;
use crate::nvr::{days_in_month, CalendarTime, ClockChip, HostClock};

/// Number of addressable registers (the chip decodes five address bits).
pub const REG_COUNT: usize = 32;

/// MM58167 register indices, numbered as in the datasheet.
pub mod regs {
    /// Milliseconds (not tracked, kept at zero).
    pub const MSEC: usize = 0;
    /// Hundredths/tenths of seconds (not tracked, kept at zero).
    pub const HUNTEN: usize = 1;
    /// Seconds, BCD.
    pub const SEC: usize = 2;
    /// Minutes, BCD.
    pub const MIN: usize = 3;
    /// Hours, BCD, 24-hour.
    pub const HOUR: usize = 4;
    /// Day of the week, BCD 1-7.
    pub const DOW: usize = 5;
    /// Day of the month, BCD.
    pub const DOM: usize = 6;
    /// Month, BCD 1-12.
    pub const MON: usize = 7;
    /// Alarm: milliseconds.
    pub const AL_MSEC: usize = 8;
    /// Alarm: hundredths/tenths.
    pub const AL_HUNTEN: usize = 9;
    /// Alarm: seconds.
    pub const AL_SEC: usize = 10;
    /// Alarm: minutes.
    pub const AL_MIN: usize = 11;
    /// Alarm: hours.
    pub const AL_HOUR: usize = 12;
    /// Alarm: day of the week.
    pub const AL_DOW: usize = 13;
    /// Alarm: day of the month. The Leading Edge repurposes this slot as
    /// the year register.
    pub const AL_DOM: usize = 14;
    /// Alarm: month.
    pub const AL_MON: usize = 15;
    /// Interrupt status; sticky, any write clears it.
    pub const ISTAT: usize = 16;
    /// Interrupt control mask.
    pub const ICTRL: usize = 17;
    /// Command: reset the sub-second counters.
    pub const RSTCTR: usize = 18;
    /// Command: reset RAM and reload the time.
    pub const RSTRAM: usize = 19;
    /// Status bit (placeholder, plain storage).
    pub const STATUS: usize = 20;
    /// Command: GO, reload the time.
    pub const GOCMD: usize = 21;
    /// Standby IRQ (placeholder, plain storage).
    pub const STBYIRQ: usize = 22;
    /// Test mode (placeholder, plain storage).
    pub const TEST: usize = 31;
}

/// Event bits shared by the interrupt status and control registers.
pub mod event {
    /// Alarm compare match.
    pub const COMPARE: u8 = 0x01;
    /// Tenth-of-second (never fires; tenths are not tracked).
    pub const TENTH: u8 = 0x02;
    /// Second rollover.
    pub const SEC: u8 = 0x04;
    /// Minute rollover.
    pub const MIN: u8 = 0x08;
    /// Hour rollover.
    pub const HOUR: u8 = 0x10;
    /// Day rollover.
    pub const DAY: u8 = 0x20;
    /// Week rollover.
    pub const WEEK: u8 = 0x40;
    /// Month rollover.
    pub const MON: u8 = 0x80;
}

/// An alarm field with the top two bits set matches any current value.
pub const ALARM_DONT_CARE: u8 = 0xc0;

/// Static configuration of an MM58167 instance.
#[derive(Debug, Clone, Default)]
pub struct Mm58167Config {
    /// Interrupt line raised when a clock event fires, if one is wired.
    pub irq: Option<u8>,

    /// Register slot holding the year, if the board repurposes one.
    /// `None` disables year tracking entirely: the year never advances and
    /// leap years resolve against 1980.
    pub year_register: Option<usize>,
}

/// MM58167 real-time clock device.
pub struct Mm58167 {
    /// The 32-byte register file.
    regs: [u8; REG_COUNT],
    /// Board-level configuration.
    config: Mm58167Config,
    /// Source of the host calendar for seeding.
    clock: Box<dyn HostClock>,
    /// Interrupt controller the IRQ line feeds into.
    intc: Box<dyn InterruptController>,
}

impl Mm58167 {
    /// Create a new device with zeroed registers.
    ///
    /// Call [`ClockChip::reset`] (or have the guest issue the GO command)
    /// to load the host time once the device is attached.
    pub fn new(
        config: Mm58167Config,
        clock: Box<dyn HostClock>,
        intc: Box<dyn InterruptController>,
    ) -> Self {
        Self {
            regs: [0; REG_COUNT],
            config,
            clock,
            intc,
        }
    }

    /// Device as wired on the Leading Edge Model D: year tracked in the
    /// alarm day-of-month slot, interrupt line not connected.
    pub fn leading_edge(clock: Box<dyn HostClock>, intc: Box<dyn InterruptController>) -> Self {
        Self::new(
            Mm58167Config {
                irq: None,
                year_register: Some(regs::AL_DOM),
            },
            clock,
            intc,
        )
    }

    /// Decode the register file into a calendar snapshot.
    pub fn time(&self) -> CalendarTime {
        CalendarTime {
            year: self.year(),
            month0: bcd::decode(self.regs[regs::MON]).wrapping_sub(1),
            day: bcd::decode(self.regs[regs::DOM]),
            weekday0: bcd::decode(self.regs[regs::DOW]).wrapping_sub(1),
            hour: bcd::decode(self.regs[regs::HOUR]),
            minute: bcd::decode(self.regs[regs::MIN]),
            second: bcd::decode(self.regs[regs::SEC]),
        }
    }

    /// Full calendar year reconstructed from the year register.
    fn year(&self) -> i32 {
        let stored = match self.config.year_register {
            Some(reg) => i32::from(bcd::decode(self.regs[reg])),
            None => 0,
        };
        1980 + stored
    }

    /// Write a calendar snapshot into the time registers.
    fn set_time(&mut self, tm: &CalendarTime) {
        self.regs[regs::MSEC] = 0;
        self.regs[regs::HUNTEN] = 0;
        self.regs[regs::SEC] = bcd::encode(tm.second);
        self.regs[regs::MIN] = bcd::encode(tm.minute);
        self.regs[regs::HOUR] = bcd::encode(tm.hour);
        self.regs[regs::DOW] = bcd::encode(tm.weekday0 + 1);
        self.regs[regs::DOM] = bcd::encode(tm.day);
        self.regs[regs::MON] = bcd::encode(tm.month0 + 1);
        if let Some(reg) = self.config.year_register {
            self.regs[reg] = bcd::encode((tm.year - 1980).rem_euclid(100) as u8);
        }
    }

    /// Whether the alarm field at `alarm_reg` matches the current time.
    ///
    /// A field matches when it equals the corresponding time register or
    /// carries the don't-care marker.
    fn alarm_matches(&self, alarm_reg: usize) -> bool {
        let current = self.regs[alarm_reg - regs::AL_SEC + regs::SEC];
        let alarm = self.regs[alarm_reg];
        current == alarm || alarm & ALARM_DONT_CARE == ALARM_DONT_CARE
    }
}

impl ClockChip for Mm58167 {
    fn reset(&mut self) {
        self.regs = [0; REG_COUNT];
        self.start();
    }

    fn start(&mut self) {
        let now = self.clock.now();
        self.set_time(&now);
        debug!(
            "seeded to {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            now.year,
            now.month0 + 1,
            now.day,
            now.hour,
            now.minute,
            now.second
        );
        trace!(
            "registers: sec={:02x} min={:02x} hour={:02x} dow={:02x} dom={:02x} mon={:02x}",
            self.regs[regs::SEC],
            self.regs[regs::MIN],
            self.regs[regs::HOUR],
            self.regs[regs::DOW],
            self.regs[regs::DOM],
            self.regs[regs::MON]
        );
    }

    fn tick(&mut self) {
        let ictrl = self.regs[regs::ICTRL];
        // One pending event byte, overwritten at each cascade stage: the
        // deepest enabled rollover is the one reported.
        let mut pending: u8 = 0;

        self.regs[regs::SEC] = bcd::increment(self.regs[regs::SEC], 1);
        if ictrl & event::SEC != 0 {
            pending = event::SEC;
        }

        // Roll over at 60 seconds.
        if self.regs[regs::SEC] >= 0x60 {
            self.regs[regs::SEC] = 0x00;
            self.regs[regs::MIN] = bcd::increment(self.regs[regs::MIN], 1);
            if ictrl & event::MIN != 0 {
                pending = event::MIN;
            }

            // Roll over at 60 minutes.
            if self.regs[regs::MIN] >= 0x60 {
                self.regs[regs::MIN] = 0x00;
                self.regs[regs::HOUR] = bcd::increment(self.regs[regs::HOUR], 1);
                if ictrl & event::HOUR != 0 {
                    pending = event::HOUR;
                }

                // Roll over at 24 hours.
                if self.regs[regs::HOUR] >= 0x24 {
                    self.regs[regs::HOUR] = 0x00;
                    self.regs[regs::DOW] = bcd::increment(self.regs[regs::DOW], 1);
                    if ictrl & event::DAY != 0 {
                        pending = event::DAY;
                    }

                    // Day of the week wraps 7 -> 1.
                    if self.regs[regs::DOW] > 0x07 {
                        self.regs[regs::DOW] = 0x01;
                        if ictrl & event::WEEK != 0 {
                            pending = event::WEEK;
                        }
                    }

                    // Day of the month, resolved against the real month
                    // length so February and leap years come out right.
                    self.regs[regs::DOM] = bcd::increment(self.regs[regs::DOM], 1);
                    let month = bcd::decode(self.regs[regs::MON]);
                    let year = self.year();
                    if bcd::decode(self.regs[regs::DOM]) > days_in_month(month, year) {
                        self.regs[regs::DOM] = 0x01;
                        self.regs[regs::MON] = bcd::increment(self.regs[regs::MON], 1);
                        if ictrl & event::MON != 0 {
                            pending = event::MON;
                        }

                        // Roll over at 12 months. The BCD increment wraps
                        // 99 -> 0, which is the whole century handling.
                        if self.regs[regs::MON] > 0x12 {
                            self.regs[regs::MON] = 0x01;
                            if let Some(reg) = self.config.year_register {
                                self.regs[reg] = bcd::increment(self.regs[reg], 1);
                            }
                        }
                    }
                }
            }
        }

        // Alarm compare. The chip walks seconds, minutes, hours, day of
        // month and month; day of the week is not part of the compare.
        // Unlike the rollover events this is not gated by the control mask.
        if self.alarm_matches(regs::AL_SEC)
            && self.alarm_matches(regs::AL_MIN)
            && self.alarm_matches(regs::AL_HOUR)
            && self.alarm_matches(regs::AL_DOM)
            && self.alarm_matches(regs::AL_MON)
        {
            pending |= event::COMPARE;
        }

        if pending != 0 {
            self.regs[regs::ISTAT] |= pending;
            if let Some(line) = self.config.irq {
                self.intc.raise(1 << line);
            }
        }
    }
}

impl PortIoDevice for Mm58167 {
    fn read(&mut self, offset: u16) -> u8 {
        // Five address bits are decoded; wider offsets alias back into the
        // register file.
        let reg = usize::from(offset) & (REG_COUNT - 1);
        let value = self.regs[reg];
        trace!("read reg {reg:#04x} -> {value:#04x}");
        value
    }

    fn write(&mut self, offset: u16, value: u8) {
        let reg = usize::from(offset) & (REG_COUNT - 1);
        trace!("write reg {reg:#04x} <- {value:#04x}");

        match reg {
            regs::RSTCTR => {
                // Clears only the sub-second counters.
                debug!("reset counters command");
                self.regs[regs::MSEC] = 0;
                self.regs[regs::HUNTEN] = 0;
            }
            regs::RSTRAM => {
                debug!("reset RAM command");
                self.reset();
            }
            regs::GOCMD => {
                debug!("go command");
                self.start();
            }
            regs::ISTAT => {
                // Write-to-clear; the written value is ignored.
                self.regs[regs::ISTAT] = 0;
            }
            regs::ICTRL => self.regs[regs::ICTRL] = value,
            _ => self.regs[reg] = value,
        }
    }
}
