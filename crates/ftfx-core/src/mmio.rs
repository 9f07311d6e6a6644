//! Memory-mapped access to the flash controller
//!
//! # Safety
//!
//! The register block must be mapped at the given base address and must not
//! be touched by anything else while an [`MmioBus`] for it exists. The
//! constructor is `unsafe` because neither can be checked.

use core::sync::atomic::{compiler_fence, Ordering};

use crate::bus::ControllerBus;
use crate::regs::REG_BLOCK_SIZE;

/// Volatile byte access to the FTFx register block
///
/// `D` supplies the delay used between status polls, typically a HAL
/// delay or a calibrated busy loop.
pub struct MmioBus<D> {
    /// Pointer to the register block
    base: *mut u8,
    /// Microsecond delay provider
    delay: D,
}

impl<D: FnMut(u32)> MmioBus<D> {
    /// Create a bus for the register block at `base`
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `base` is the address of an FTFx register block
    /// - No other code accesses the block while this bus is alive
    pub unsafe fn new(base: usize, delay: D) -> Self {
        Self {
            base: base as *mut u8,
            delay,
        }
    }

    /// Address of the register block
    pub fn base(&self) -> usize {
        self.base as usize
    }
}

impl<D: FnMut(u32)> ControllerBus for MmioBus<D> {
    #[inline]
    fn read8(&mut self, offset: usize) -> u8 {
        debug_assert!(offset < REG_BLOCK_SIZE);
        // SAFETY: base maps the register block (see new()) and offset is in range
        unsafe { core::ptr::read_volatile(self.base.add(offset)) }
    }

    #[inline]
    fn write8(&mut self, offset: usize, value: u8) {
        debug_assert!(offset < REG_BLOCK_SIZE);
        // SAFETY: base maps the register block (see new()) and offset is in range
        unsafe {
            core::ptr::write_volatile(self.base.add(offset), value);
        }
        compiler_fence(Ordering::SeqCst);
    }

    #[inline]
    fn delay_us(&mut self, us: u32) {
        (self.delay)(us)
    }
}

// The bus is the sole owner of the register block (see new()), so moving it
// to another context is fine as long as the delay provider can move too.
unsafe impl<D: Send> Send for MmioBus<D> {}
