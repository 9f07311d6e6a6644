//! ftfx-sim - In-memory FTFx flash controller simulator
//!
//! This crate provides a simulated flash memory module that implements
//! [`ControllerBus`]. It keeps a register file and a P-Flash array, executes
//! program-longword commands when CCIF is written, and records every
//! register write in order. It is useful for testing drivers and for
//! experimenting without real hardware.
//!
//! Modeled behavior:
//! - ACCERR, FPVIOL and RDCOLERR are write-1-to-clear
//! - Writing CCIF launches the command in FCCOB; the launch is ignored while
//!   ACCERR or FPVIOL is still set
//! - Writing FCCOB while a command is running sets ACCERR
//! - Flash bits can only be programmed from 1 to 0; a longword that does not
//!   read back as written sets MGSTAT0
//! - FPROT0-3 split P-Flash into 32 regions, a cleared bit protects a region

use ftfx_core::regs::{
    byte_lane, is_command_object, register_name, ADDR_LANES, CMD_PROGRAM_LONGWORD, DATA_LANES,
    FCCOB0, FPROT_LANES, FSTAT, FSTAT_ACCERR, FSTAT_CCIF, FSTAT_FPVIOL, FSTAT_MGSTAT0,
    FSTAT_W1C_MASK, LONGWORD_SIZE, PROT_REGIONS, REG_BLOCK_SIZE,
};
use ftfx_core::{ControllerBus, ControllerStatus, FlashGeometry};

/// Configuration for the simulated controller
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// P-Flash layout
    pub geometry: FlashGeometry,
    /// FSTAT reads that report busy after each launch
    pub busy_polls: u32,
    /// Protection bitmap, bit n = region n unprotected (FPROT reset value)
    pub fprot: u32,
    /// Initial content of every flash byte
    pub erased_value: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            geometry: FlashGeometry::KL25Z,
            busy_polls: 0,
            fprot: u32::MAX,
            erased_value: 0xFF,
        }
    }
}

/// A register write observed by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    /// Register offset
    pub offset: usize,
    /// Value written
    pub value: u8,
}

impl std::fmt::Display for RegWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match register_name(self.offset) {
            Some(name) => write!(f, "{:<7} (0x{:02X}) <- 0x{:02X}", name, self.offset, self.value),
            None => write!(f, "0x{:02X}            <- 0x{:02X}", self.offset, self.value),
        }
    }
}

/// Simulated FTFx flash memory module
pub struct SimController {
    config: SimConfig,
    regs: [u8; REG_BLOCK_SIZE],
    flash: Vec<u8>,
    writes: Vec<RegWrite>,
    reads: usize,
    delayed_us: u64,
    busy_remaining: u32,
    wedged: bool,
    launched: usize,
}

impl SimController {
    /// Create a simulator with the given configuration
    pub fn new(config: SimConfig) -> Self {
        let mut regs = [0u8; REG_BLOCK_SIZE];
        regs[FSTAT] = FSTAT_CCIF;
        for (i, &offset) in FPROT_LANES.iter().enumerate() {
            regs[offset] = byte_lane(config.fprot, i);
        }
        let flash = vec![config.erased_value; config.geometry.flash_size() as usize];
        Self {
            config,
            regs,
            flash,
            writes: Vec::new(),
            reads: 0,
            delayed_us: 0,
            busy_remaining: 0,
            wedged: false,
            launched: 0,
        }
    }

    /// Create a simulator of the KL25Z P-Flash
    pub fn new_default() -> Self {
        Self::new(SimConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Raise status flags as if an earlier command had failed
    pub fn inject(&mut self, flags: ControllerStatus) {
        self.regs[FSTAT] |= flags.bits() & !FSTAT_CCIF;
    }

    /// Make the controller stop reporting command complete
    pub fn set_wedged(&mut self, wedged: bool) {
        self.wedged = wedged;
        if wedged {
            self.regs[FSTAT] &= !FSTAT_CCIF;
        } else if self.busy_remaining == 0 {
            self.regs[FSTAT] |= FSTAT_CCIF;
        }
    }

    /// Set the number of busy polls after each launch
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.config.busy_polls = polls;
    }

    /// Clear the FPROT bit of `region`, protecting it
    pub fn protect_region(&mut self, region: u32) {
        if region >= PROT_REGIONS {
            return;
        }
        let lane = (region / 8) as usize;
        self.regs[FPROT_LANES[lane]] &= !(1 << (region % 8));
    }

    /// Current FSTAT without counting as a bus read
    pub fn fstat(&self) -> ControllerStatus {
        ControllerStatus::from_raw(self.regs[FSTAT])
    }

    /// Peek at a register without counting as a bus read
    pub fn reg(&self, offset: usize) -> u8 {
        self.regs.get(offset).copied().unwrap_or(0)
    }

    /// All register writes so far, in order
    pub fn writes(&self) -> &[RegWrite] {
        &self.writes
    }

    /// Number of bus reads so far
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Total microseconds requested through `delay_us`
    pub fn delayed_us(&self) -> u64 {
        self.delayed_us
    }

    /// Number of commands launched
    pub fn commands_launched(&self) -> usize {
        self.launched
    }

    /// Forget recorded accesses
    pub fn clear_trace(&mut self) {
        self.writes.clear();
        self.reads = 0;
        self.delayed_us = 0;
    }

    /// Read the longword at `addr`, little-endian
    pub fn flash_word(&self, addr: u32) -> Option<u32> {
        let geometry = &self.config.geometry;
        if !geometry.contains(addr) || addr % LONGWORD_SIZE != 0 {
            return None;
        }
        let off = (addr - geometry.flash_base()) as usize;
        let bytes = self.flash.get(off..off + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn is_running(&self) -> bool {
        self.regs[FSTAT] & FSTAT_CCIF == 0
    }

    fn write_fstat(&mut self, value: u8) {
        self.regs[FSTAT] &= !(value & FSTAT_W1C_MASK);

        if value & FSTAT_CCIF == 0 {
            return;
        }
        if self.is_running() {
            log::trace!("sim: CCIF written while busy, ignored");
            return;
        }
        if self.fstat().intersects(ControllerStatus::LAUNCH_BLOCKING) {
            log::warn!("sim: launch ignored, ACCERR/FPVIOL still set");
            return;
        }
        self.launch();
    }

    fn launch(&mut self) {
        self.launched += 1;
        self.regs[FSTAT] &= !(FSTAT_CCIF | FSTAT_MGSTAT0);

        if self.wedged {
            log::debug!("sim: command launched on wedged controller");
            return;
        }

        self.busy_remaining = self.config.busy_polls;
        if self.busy_remaining == 0 {
            self.complete();
        }
    }

    fn complete(&mut self) {
        let fault = self.execute();
        self.regs[FSTAT] |= fault | FSTAT_CCIF;
    }

    /// Run the command in FCCOB and return the status bits it raises
    fn execute(&mut self) -> u8 {
        match self.regs[FCCOB0] {
            CMD_PROGRAM_LONGWORD => self.program_longword(),
            other => {
                log::debug!("sim: unsupported command 0x{:02X}", other);
                FSTAT_ACCERR
            }
        }
    }

    fn program_longword(&mut self) -> u8 {
        let addr = ADDR_LANES
            .iter()
            .enumerate()
            .fold(0u32, |acc, (lane, &off)| acc | (self.regs[off] as u32) << (lane * 8));
        let data = DATA_LANES
            .iter()
            .enumerate()
            .fold(0u32, |acc, (lane, &off)| acc | (self.regs[off] as u32) << (lane * 8));

        let geometry = self.config.geometry;
        if !geometry.contains(addr) || addr % LONGWORD_SIZE != 0 {
            log::debug!("sim: program longword at invalid address 0x{:06X}", addr);
            return FSTAT_ACCERR;
        }

        if self.is_protected(addr) {
            log::debug!("sim: program longword at protected address 0x{:06X}", addr);
            return FSTAT_FPVIOL;
        }

        let off = (addr - geometry.flash_base()) as usize;
        for (byte, value) in self.flash[off..off + 4].iter_mut().zip(data.to_le_bytes()) {
            *byte &= value;
        }

        log::trace!("sim: programmed 0x{:08X} at 0x{:06X}", data, addr);

        if self.flash_word(addr) != Some(data) {
            return FSTAT_MGSTAT0;
        }
        0
    }

    fn is_protected(&self, addr: u32) -> bool {
        let geometry = &self.config.geometry;
        let region_size = (geometry.flash_size() / PROT_REGIONS).max(1);
        let region = ((addr - geometry.flash_base()) / region_size).min(PROT_REGIONS - 1);
        let lane = (region / 8) as usize;
        self.regs[FPROT_LANES[lane]] & (1 << (region % 8)) == 0
    }
}

impl ControllerBus for SimController {
    fn read8(&mut self, offset: usize) -> u8 {
        self.reads += 1;

        if offset == FSTAT && self.busy_remaining > 0 && !self.wedged {
            self.busy_remaining -= 1;
            if self.busy_remaining == 0 {
                self.complete();
            }
        }

        self.regs.get(offset).copied().unwrap_or(0)
    }

    fn write8(&mut self, offset: usize, value: u8) {
        let write = RegWrite { offset, value };
        log::trace!("sim: {}", write);
        self.writes.push(write);

        if offset >= REG_BLOCK_SIZE {
            return;
        }

        if offset == FSTAT {
            self.write_fstat(value);
        } else if is_command_object(offset) && self.is_running() {
            log::debug!("sim: FCCOB written while command running");
            self.regs[FSTAT] |= FSTAT_ACCERR;
        } else {
            self.regs[offset] = value;
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.delayed_us += u64::from(us);
    }
}
