//! Register access trait for the flash controller
//!
//! The writer never dereferences addresses itself. Everything goes through
//! a [`ControllerBus`], which is backed by volatile MMIO on hardware
//! ([`crate::MmioBus`]) and by a simulator in tests.

use crate::regs::FSTAT;
use crate::status::ControllerStatus;

/// Byte-wide access to the controller register block
///
/// Offsets are relative to the controller base address. Implementations
/// must perform each access exactly once and in program order; the
/// command launch relies on every command object write having landed
/// before the FSTAT write that starts it.
pub trait ControllerBus {
    /// Read the 8-bit register at `offset`
    fn read8(&mut self, offset: usize) -> u8;

    /// Write the 8-bit register at `offset`
    fn write8(&mut self, offset: usize, value: u8);

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Read and decode FSTAT
    fn read_status(&mut self) -> ControllerStatus {
        ControllerStatus::from_raw(self.read8(FSTAT))
    }

    /// Write `flags` to FSTAT
    ///
    /// Error flags are write-1-to-clear and CCIF is write-1-to-launch, so
    /// only the bits being acted on may be set in `flags`.
    fn write_status(&mut self, flags: ControllerStatus) {
        self.write8(FSTAT, flags.bits())
    }
}

impl<T: ControllerBus + ?Sized> ControllerBus for &mut T {
    fn read8(&mut self, offset: usize) -> u8 {
        (**self).read8(offset)
    }

    fn write8(&mut self, offset: usize, value: u8) {
        (**self).write8(offset, value)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
