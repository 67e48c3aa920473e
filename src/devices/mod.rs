//! Device emulation: the RTC and the port bus it hangs off.

pub mod bus;
pub mod mm58167;

pub use bus::{BusError, PortIoBus, PortIoDevice};
pub use mm58167::{Mm58167, Mm58167Config};

/// Base of the RTC's decoded port range on the Leading Edge Model D.
///
/// 0x300 is non-standard (the IBM AT clock lives at 0x70) and conflicts
/// with the common XT-IDE default; kept for hardware fidelity.
pub const RTC_PORT_BASE: u16 = 0x300;

/// Number of consecutive ports the RTC decodes.
pub const RTC_PORT_COUNT: u16 = 32;

/// Sink for a device's interrupt line.
///
/// `raise` carries `1 << line` and is fire-and-forget: the device never
/// waits for an acknowledgment, and re-raising before the guest clears the
/// device's status register is normal.
pub trait InterruptController {
    fn raise(&mut self, mask: u16);
}

/// Interrupt controller for boards where the line is not wired up.
pub struct NullInterruptController;

impl InterruptController for NullInterruptController {
    fn raise(&mut self, _mask: u16) {}
}
