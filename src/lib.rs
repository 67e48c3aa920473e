//! Emulation of the Leading Edge Model D real-time clock.
//!
//! The Model D has an integrated battery-backed clock based on the
//! National Semiconductor MM58167, decoded at I/O ports 0x300-0x31F. This
//! crate models the chip's 32-register file, the second-by-second rollover
//! cascade, alarm comparison, and the interrupt status/control pair, all
//! driven by an external once-per-second tick.
//!
//! - [`devices::Mm58167`] — the chip: register dispatch, tick engine,
//!   lifecycle hooks.
//! - [`devices::PortIoBus`] — routes port reads/writes to registered
//!   devices; unmapped ports read as open bus.
//! - [`nvr`] — host-calendar plumbing and the [`nvr::ClockChip`] lifecycle
//!   trait the machine drives.
//! - [`bcd`] — the packed-BCD arithmetic everything above leans on.

pub mod bcd;
pub mod devices;
pub mod nvr;
