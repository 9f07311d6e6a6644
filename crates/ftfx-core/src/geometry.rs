//! Flash geometry and board configuration

use crate::error::{Error, Result};
use crate::regs::{KL25Z_PFLASH_BASE, KL25Z_PFLASH_SIZE, KL25Z_REG_BASE, LONGWORD_SIZE};

/// Immutable description of the program flash region being written
///
/// Constructed once at start-up. The exclusive end of the region always
/// fits in 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashGeometry {
    controller_base: u32,
    flash_base: u32,
    flash_size: u32,
}

impl FlashGeometry {
    /// FRDM-KL25Z: controller at 0x4002_0000, 128 KiB of P-Flash at 0
    pub const KL25Z: FlashGeometry = FlashGeometry {
        controller_base: KL25Z_REG_BASE,
        flash_base: KL25Z_PFLASH_BASE,
        flash_size: KL25Z_PFLASH_SIZE,
    };

    /// Create a geometry, checking that the region is non-empty,
    /// longword aligned, and does not wrap the address space
    pub const fn new(controller_base: u32, flash_base: u32, flash_size: u32) -> Result<Self> {
        if flash_size == 0 || flash_base % LONGWORD_SIZE != 0 || flash_size % LONGWORD_SIZE != 0 {
            return Err(Error::InvalidGeometry);
        }
        if flash_base.checked_add(flash_size).is_none() {
            return Err(Error::InvalidGeometry);
        }
        Ok(Self {
            controller_base,
            flash_base,
            flash_size,
        })
    }

    /// Address of the controller register block
    pub const fn controller_base(&self) -> u32 {
        self.controller_base
    }

    /// First programmable address
    pub const fn flash_base(&self) -> u32 {
        self.flash_base
    }

    /// Size of the programmable region in bytes
    pub const fn flash_size(&self) -> u32 {
        self.flash_size
    }

    /// Exclusive upper bound of the programmable region
    pub const fn flash_end(&self) -> u32 {
        // Cannot overflow: checked in new()
        self.flash_base + self.flash_size
    }

    /// Returns true if `addr` lies in `[flash_base, flash_end)`
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.flash_base && addr < self.flash_end()
    }

    /// Address of the last longword in the region
    pub const fn last_word(&self) -> u32 {
        self.flash_end() - LONGWORD_SIZE
    }
}

impl Default for FlashGeometry {
    fn default() -> Self {
        Self::KL25Z
    }
}

/// Flash driver configuration
///
/// Mirrors the SSD configuration structure of the vendor flash driver.
/// Only the P-Flash fields shape the [`FlashGeometry`]; the D-Flash and
/// EERAM fields and `debug_enable` are carried for boards that use them
/// but are not consulted when programming a P-Flash word. When set,
/// `callback` runs once per idle poll while waiting on the controller,
/// e.g. to service a watchdog.
#[derive(Debug, Clone, Copy)]
pub struct FlashConfig {
    /// Flash memory module register base address
    pub controller_base: u32,
    /// P-Flash base address
    pub pflash_base: u32,
    /// P-Flash size in bytes
    pub pflash_size: u32,
    /// D-Flash base address (0 if absent)
    pub dflash_base: u32,
    /// D-Flash size in bytes (0 if absent)
    pub dflash_size: u32,
    /// EERAM base address (0 if absent)
    pub eeram_base: u32,
    /// EERAM size in bytes (0 if absent)
    pub eeram_size: u32,
    /// Enable debug breakpoints in the driver
    pub debug_enable: bool,
    /// Called between polls of the controller
    pub callback: Option<fn()>,
}

impl FlashConfig {
    /// Configuration for the FRDM-KL25Z
    pub const KL25Z: FlashConfig = FlashConfig {
        controller_base: KL25Z_REG_BASE,
        pflash_base: KL25Z_PFLASH_BASE,
        pflash_size: KL25Z_PFLASH_SIZE,
        dflash_base: 0,
        dflash_size: 0,
        eeram_base: 0,
        eeram_size: 0,
        debug_enable: false,
        callback: None,
    };

    /// Validate the P-Flash fields and build the geometry
    pub const fn geometry(&self) -> Result<FlashGeometry> {
        FlashGeometry::new(self.controller_base, self.pflash_base, self.pflash_size)
    }
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self::KL25Z
    }
}
