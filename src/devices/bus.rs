//! Port I/O bus for x86-style peripherals.
//!
//! This module routes 8-bit port accesses to the device that owns the
//! decoded range. Devices register a `[base, base + len)` span; accesses
//! outside every registered span read as open bus (0xFF) and ignore
//! writes, which is what real ISA hardware does for unpopulated addresses.
//!
//! Devices are held as `Rc<RefCell<..>>` handles because the embedding
//! machine usually keeps its own handle to tick or inspect a device after
//! registering it. The whole emulation loop is single-threaded, so no
//! locking is involved.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;
use thiserror::Error;

/// Errors from port range bookkeeping.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BusError {
    /// A registration collided with a range already on the bus.
    #[error("port range at {base:#06x} (+{len}) overlaps an existing device")]
    Overlap { base: u16, len: u16 },

    /// Deregistration named a base port with no registered device.
    #[error("no device registered at base port {0:#06x}")]
    NotRegistered(u16),
}

/// Trait for devices that respond to port I/O.
///
/// `offset` is relative to the base port the device was registered at.
/// Reads take `&mut self` because some peripherals clear state on read;
/// the bus makes no assumption either way.
pub trait PortIoDevice {
    /// Handle a byte read at the given offset.
    fn read(&mut self, offset: u16) -> u8;

    /// Handle a byte write at the given offset.
    fn write(&mut self, offset: u16, value: u8);
}

/// A registered device on the port bus.
struct PortRange {
    /// First port of the decoded span.
    base: u16,
    /// Number of consecutive ports.
    len: u16,
    /// The device implementation.
    device: Rc<RefCell<dyn PortIoDevice>>,
}

impl PortRange {
    fn contains(&self, port: u16) -> bool {
        port >= self.base && u32::from(port) < u32::from(self.base) + u32::from(self.len)
    }

    fn overlaps(&self, base: u16, len: u16) -> bool {
        let a_end = u32::from(self.base) + u32::from(self.len);
        let b_end = u32::from(base) + u32::from(len);
        u32::from(self.base) < b_end && u32::from(base) < a_end
    }
}

/// Port bus that routes accesses to registered devices.
pub struct PortIoBus {
    /// Registered ranges sorted by base port.
    ranges: Vec<PortRange>,
}

impl PortIoBus {
    /// Create a new empty bus.
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Register a device over `len` consecutive ports starting at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Overlap`] if the span intersects a range that is
    /// already registered.
    pub fn register(
        &mut self,
        base: u16,
        len: u16,
        device: Rc<RefCell<dyn PortIoDevice>>,
    ) -> Result<(), BusError> {
        if self.ranges.iter().any(|r| r.overlaps(base, len)) {
            return Err(BusError::Overlap { base, len });
        }
        self.ranges.push(PortRange { base, len, device });
        // Keep sorted by base port so routing walks in address order.
        self.ranges.sort_by_key(|r| r.base);
        Ok(())
    }

    /// Remove the device registered at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotRegistered`] if no range starts at `base`.
    pub fn deregister(&mut self, base: u16) -> Result<(), BusError> {
        let index = self
            .ranges
            .iter()
            .position(|r| r.base == base)
            .ok_or(BusError::NotRegistered(base))?;
        self.ranges.remove(index);
        Ok(())
    }

    /// Handle a port read.
    ///
    /// Unmapped ports read as open bus (0xFF).
    pub fn read(&self, port: u16) -> u8 {
        for range in &self.ranges {
            if range.contains(port) {
                return range.device.borrow_mut().read(port - range.base);
            }
        }
        trace!("unmapped port read {port:#06x} -> 0xff");
        0xff
    }

    /// Handle a port write.
    ///
    /// Writes to unmapped ports are silently dropped.
    pub fn write(&self, port: u16, value: u8) {
        for range in &self.ranges {
            if range.contains(port) {
                range.device.borrow_mut().write(port - range.base, value);
                return;
            }
        }
        trace!("unmapped port write {port:#06x} <- {value:#04x}");
    }
}

impl Default for PortIoBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockDevice {
        last_offset: u16,
        value: u8,
    }

    impl PortIoDevice for MockDevice {
        fn read(&mut self, offset: u16) -> u8 {
            self.last_offset = offset;
            self.value
        }

        fn write(&mut self, offset: u16, value: u8) {
            self.last_offset = offset;
            self.value = value;
        }
    }

    fn mock() -> Rc<RefCell<MockDevice>> {
        Rc::new(RefCell::new(MockDevice {
            last_offset: 0,
            value: 0x42,
        }))
    }

    #[test]
    fn test_routing_uses_base_relative_offsets() {
        let mut bus = PortIoBus::new();
        let dev = mock();
        bus.register(0x300, 32, dev.clone()).unwrap();

        assert_eq!(bus.read(0x300), 0x42);
        assert_eq!(dev.borrow().last_offset, 0);

        bus.write(0x31f, 0x55);
        assert_eq!(dev.borrow().last_offset, 31);
        assert_eq!(bus.read(0x31f), 0x55);
    }

    #[test]
    fn test_unmapped_read_is_open_bus() {
        let mut bus = PortIoBus::new();
        bus.register(0x300, 32, mock()).unwrap();

        assert_eq!(bus.read(0x2ff), 0xff);
        assert_eq!(bus.read(0x320), 0xff);
    }

    #[test]
    fn test_unmapped_write_is_dropped() {
        let mut bus = PortIoBus::new();
        let dev = mock();
        bus.register(0x300, 32, dev.clone()).unwrap();

        bus.write(0x320, 0x99);
        assert_eq!(dev.borrow().value, 0x42, "device state unchanged");
    }

    #[test]
    fn test_overlap_rejected() {
        let mut bus = PortIoBus::new();
        bus.register(0x300, 32, mock()).unwrap();

        let err = bus.register(0x310, 16, mock()).unwrap_err();
        assert_eq!(
            err,
            BusError::Overlap {
                base: 0x310,
                len: 16
            }
        );
    }

    #[test]
    fn test_deregister_stops_routing() {
        let mut bus = PortIoBus::new();
        bus.register(0x300, 32, mock()).unwrap();

        assert_eq!(bus.read(0x300), 0x42);
        bus.deregister(0x300).unwrap();
        assert_eq!(bus.read(0x300), 0xff);

        assert_eq!(bus.deregister(0x300), Err(BusError::NotRegistered(0x300)));
    }
}
