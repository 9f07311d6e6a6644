//! Longword programming
//!
//! [`FlashWriter::program_word`] runs the FTFx program-longword sequence:
//!
//! 1. Reject a null address, then an address outside program flash, then
//!    a misaligned address. None of these touch the controller.
//! 2. Poll FSTAT until CCIF reports the controller idle, giving up after
//!    the configured timeout.
//! 3. Read FSTAT once more. A pending ACCERR (or else FPVIOL) is cleared
//!    and reported. These flags belong to the *previous* command.
//! 4. Load the command object: opcode, three address bytes, four data
//!    bytes.
//! 5. Launch by writing CCIF.
//!
//! By default the call returns right after the launch and the caller waits
//! with [`FlashWriter::wait_idle`] before relying on the data. With
//! [`CompletionMode::WaitForCompletion`] the writer also waits and reports
//! faults raised by the command it just launched.

use crate::bus::ControllerBus;
use crate::error::{Error, Result};
use crate::geometry::{FlashConfig, FlashGeometry};
use crate::regs::{byte_lane, ADDR_LANES, CMD_PROGRAM_LONGWORD, DATA_LANES, FCCOB0, LONGWORD_SIZE};
use crate::status::ControllerStatus;

/// Default time to wait for CCIF, in microseconds
pub const DEFAULT_TIMEOUT_US: u32 = 100_000;

/// Default delay between FSTAT polls, in microseconds
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10;

/// What `program_word` does after launching the command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Return as soon as the command is launched
    #[default]
    LaunchOnly,
    /// Wait for CCIF and report faults raised by this command
    WaitForCompletion,
}

/// Polling behavior of a [`FlashWriter`]
#[derive(Debug, Clone, Copy)]
pub struct WriterConfig {
    /// Give up waiting for CCIF after this many microseconds
    pub timeout_us: u32,
    /// Delay between FSTAT polls
    pub poll_interval_us: u32,
    /// Post-launch behavior
    pub completion: CompletionMode,
    /// Called before each delay while waiting for CCIF
    pub on_poll: Option<fn()>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            timeout_us: DEFAULT_TIMEOUT_US,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            completion: CompletionMode::LaunchOnly,
            on_poll: None,
        }
    }
}

/// A single longword program request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramRequest {
    /// Target address, `None` for a null pointer
    pub address: Option<u32>,
    /// Value to program
    pub data: u32,
}

impl ProgramRequest {
    /// Request to program `data` at `address`
    pub const fn new(address: u32, data: u32) -> Self {
        Self {
            address: Some(address),
            data,
        }
    }

    /// Request to program `data` at the word `ptr` points to
    ///
    /// A null pointer yields a request that fails with
    /// [`Error::NullAddress`]. Pointers above 4 GiB (host builds only)
    /// saturate to `u32::MAX`, which no geometry contains.
    pub fn from_ptr(ptr: *const u32, data: u32) -> Self {
        let address = if ptr.is_null() {
            None
        } else {
            Some(u32::try_from(ptr as usize).unwrap_or(u32::MAX))
        };
        Self { address, data }
    }
}

/// Programs longwords into P-Flash through a [`ControllerBus`]
///
/// The writer holds no state between calls beyond its configuration; the
/// controller registers are the only persistent state. Methods take
/// `&mut self`, so one writer can never interleave two sequences. Use
/// [`crate::SharedFlashWriter`] when the controller is shared with
/// interrupt handlers.
pub struct FlashWriter<B> {
    bus: B,
    geometry: FlashGeometry,
    config: WriterConfig,
}

impl<B: ControllerBus> FlashWriter<B> {
    /// Create a writer with the default polling configuration
    pub fn new(bus: B, geometry: FlashGeometry) -> Self {
        Self::with_config(bus, geometry, WriterConfig::default())
    }

    /// Create a writer with an explicit polling configuration
    pub fn with_config(bus: B, geometry: FlashGeometry, config: WriterConfig) -> Self {
        Self {
            bus,
            geometry,
            config,
        }
    }

    /// Create a writer from a driver configuration
    ///
    /// The configuration's callback becomes the poll hook.
    pub fn from_flash_config(
        bus: B,
        flash: &FlashConfig,
        mut config: WriterConfig,
    ) -> Result<Self> {
        let geometry = flash.geometry()?;
        if flash.callback.is_some() {
            config.on_poll = flash.callback;
        }
        Ok(Self::with_config(bus, geometry, config))
    }

    /// Get the flash geometry
    pub fn geometry(&self) -> &FlashGeometry {
        &self.geometry
    }

    /// Get the polling configuration
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Get a reference to the bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Get a mutable reference to the bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consume the writer and return the bus
    pub fn release(self) -> B {
        self.bus
    }

    /// Read FSTAT once
    pub fn status(&mut self) -> ControllerStatus {
        self.bus.read_status()
    }

    /// Wait until CCIF is set or the timeout expires
    pub fn wait_idle(&mut self) -> Result<()> {
        let step = self.config.poll_interval_us.max(1);
        let mut remaining = self.config.timeout_us;

        loop {
            if self.bus.read_status().is_idle() {
                return Ok(());
            }

            if remaining == 0 {
                log::warn!(
                    "Flash controller still busy after {} us",
                    self.config.timeout_us
                );
                return Err(Error::Timeout);
            }

            if let Some(hook) = self.config.on_poll {
                hook();
            }

            let delay = step.min(remaining);
            self.bus.delay_us(delay);
            remaining -= delay;
        }
    }

    /// Program `data` at `address`
    pub fn program(&mut self, address: u32, data: u32) -> Result<()> {
        self.program_word(ProgramRequest::new(address, data))
    }

    /// Program one longword
    ///
    /// Check order is part of the contract: null, range, alignment, idle
    /// wait, then pending controller faults. An `AccessError` or
    /// `ProtectionViolation` reported here before the launch belongs to an
    /// earlier command; the flag is cleared and nothing is launched.
    pub fn program_word(&mut self, request: ProgramRequest) -> Result<()> {
        let address = self.validate(request)?;

        self.wait_idle()?;

        let status = self.bus.read_status();
        if let Err(e) = self.clear_fault(status) {
            log::warn!("Pending fault from an earlier command: {} ({})", e, status);
            return Err(e);
        }

        self.load_command(address, request.data);
        self.bus.write_status(ControllerStatus::CCIF);
        log::debug!(
            "Launched program longword 0x{:08X} at 0x{:08X}",
            request.data,
            address
        );

        match self.config.completion {
            CompletionMode::LaunchOnly => Ok(()),
            CompletionMode::WaitForCompletion => self.check_completion(),
        }
    }

    fn validate(&self, request: ProgramRequest) -> Result<u32> {
        let addr = request.address.ok_or(Error::NullAddress)?;

        if !self.geometry.contains(addr) {
            return Err(Error::OutOfRange { addr });
        }

        if addr % LONGWORD_SIZE != 0 {
            return Err(Error::Misaligned { addr });
        }

        Ok(addr)
    }

    /// Clear and report ACCERR, else FPVIOL
    fn clear_fault(&mut self, status: ControllerStatus) -> Result<()> {
        match status.pending_fault() {
            Some((flag, err)) => {
                self.bus.write_status(flag);
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn load_command(&mut self, address: u32, data: u32) {
        self.bus.write8(FCCOB0, CMD_PROGRAM_LONGWORD);
        for (lane, &offset) in ADDR_LANES.iter().enumerate() {
            self.bus.write8(offset, byte_lane(address, lane));
        }
        for (lane, &offset) in DATA_LANES.iter().enumerate() {
            self.bus.write8(offset, byte_lane(data, lane));
        }
    }

    fn check_completion(&mut self) -> Result<()> {
        self.wait_idle()?;

        let status = self.bus.read_status();
        self.clear_fault(status)?;

        // MGSTAT0 is read-only and resets on the next launch
        if status.contains(ControllerStatus::MGSTAT0) {
            return Err(Error::CommandFailed);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Access {
        Read(usize),
        Write(usize, u8),
        Delay(u32),
    }

    /// Register file that completes every command instantly
    struct MockController {
        regs: [u8; REG_BLOCK_SIZE],
        log: Vec<Access>,
        /// FSTAT reads that still report busy
        busy_reads: u32,
        /// FSTAT never reports CCIF
        stuck: bool,
        /// Flags raised by the next launch
        fault_on_launch: u8,
    }

    impl MockController {
        fn new() -> Self {
            let mut regs = [0u8; REG_BLOCK_SIZE];
            regs[FSTAT] = FSTAT_CCIF;
            Self {
                regs,
                log: Vec::new(),
                busy_reads: 0,
                stuck: false,
                fault_on_launch: 0,
            }
        }

        fn with_fstat(fstat: u8) -> Self {
            let mut mock = Self::new();
            mock.regs[FSTAT] = fstat;
            mock
        }

        fn writes(&self) -> Vec<(usize, u8)> {
            self.log
                .iter()
                .filter_map(|a| match *a {
                    Access::Write(off, val) => Some((off, val)),
                    _ => None,
                })
                .collect()
        }

        fn reads(&self) -> usize {
            self.log
                .iter()
                .filter(|a| matches!(a, Access::Read(_)))
                .count()
        }

        fn delayed(&self) -> u32 {
            self.log
                .iter()
                .map(|a| match *a {
                    Access::Delay(us) => us,
                    _ => 0,
                })
                .sum()
        }
    }

    impl ControllerBus for MockController {
        fn read8(&mut self, offset: usize) -> u8 {
            self.log.push(Access::Read(offset));
            let value = self.regs[offset];
            if offset == FSTAT {
                if self.stuck {
                    return value & !FSTAT_CCIF;
                }
                if self.busy_reads > 0 {
                    self.busy_reads -= 1;
                    return value & !FSTAT_CCIF;
                }
            }
            value
        }

        fn write8(&mut self, offset: usize, value: u8) {
            self.log.push(Access::Write(offset, value));
            if offset == FSTAT {
                self.regs[FSTAT] &= !(value & FSTAT_W1C_MASK);
                if value & FSTAT_CCIF != 0 {
                    self.regs[FSTAT] &= !FSTAT_MGSTAT0;
                    self.regs[FSTAT] |= self.fault_on_launch;
                }
            } else {
                self.regs[offset] = value;
            }
        }

        fn delay_us(&mut self, us: u32) {
            self.log.push(Access::Delay(us));
        }
    }

    fn small_geometry() -> FlashGeometry {
        FlashGeometry::new(KL25Z_REG_BASE, 0x1000, 0x400).unwrap()
    }

    fn writer(mock: MockController) -> FlashWriter<MockController> {
        FlashWriter::new(mock, FlashGeometry::KL25Z)
    }

    #[test]
    fn test_null_address_touches_nothing() {
        let mut w = writer(MockController::new());
        let req = ProgramRequest::from_ptr(core::ptr::null(), 0x1234_5678);

        assert_eq!(w.program_word(req), Err(Error::NullAddress));
        assert!(w.bus().log.is_empty());
    }

    #[test]
    fn test_out_of_range_touches_nothing() {
        let mut w = FlashWriter::new(MockController::new(), small_geometry());

        for addr in [0, 0x0FFC, 0x1400, 0x1404, 0xFFFF_FFFC] {
            assert_eq!(w.program(addr, 0), Err(Error::OutOfRange { addr }));
        }
        assert!(w.bus().log.is_empty());
    }

    #[test]
    fn test_region_boundaries() {
        let geom = small_geometry();
        let mut w = FlashWriter::new(MockController::new(), geom);

        assert_eq!(w.program(geom.flash_end(), 0), Err(Error::OutOfRange { addr: 0x1400 }));
        assert!(w.bus().log.is_empty());

        assert_eq!(w.program(geom.flash_end() - 4, 0xCAFE_F00D), Ok(()));
        assert_eq!(w.program(geom.flash_base(), 0xCAFE_F00D), Ok(()));
    }

    #[test]
    fn test_misaligned_rejected_after_range() {
        let mut w = FlashWriter::new(MockController::new(), small_geometry());

        assert_eq!(w.program(0x1002, 0), Err(Error::Misaligned { addr: 0x1002 }));
        // Range is checked first
        assert_eq!(w.program(0x1401, 0), Err(Error::OutOfRange { addr: 0x1401 }));
        assert!(w.bus().log.is_empty());
    }

    #[test]
    fn test_pending_access_error_cleared() {
        let mut w = writer(MockController::with_fstat(FSTAT_CCIF | FSTAT_ACCERR));

        assert_eq!(w.program(0x100, 0x1), Err(Error::AccessError));
        assert_eq!(w.bus().regs[FSTAT], FSTAT_CCIF);
        assert_eq!(w.bus().writes(), vec![(FSTAT, FSTAT_ACCERR)]);
    }

    #[test]
    fn test_pending_protection_violation_cleared() {
        let mut w = writer(MockController::with_fstat(FSTAT_CCIF | FSTAT_FPVIOL));

        assert_eq!(w.program(0x100, 0x1), Err(Error::ProtectionViolation));
        assert_eq!(w.bus().regs[FSTAT], FSTAT_CCIF);
        assert_eq!(w.bus().writes(), vec![(FSTAT, FSTAT_FPVIOL)]);
    }

    #[test]
    fn test_access_error_reported_before_protection_violation() {
        let mut w = writer(MockController::with_fstat(
            FSTAT_CCIF | FSTAT_ACCERR | FSTAT_FPVIOL,
        ));

        assert_eq!(w.program(0x100, 0x1), Err(Error::AccessError));
        assert_eq!(w.bus().regs[FSTAT], FSTAT_CCIF | FSTAT_FPVIOL);

        assert_eq!(w.program(0x100, 0x1), Err(Error::ProtectionViolation));
        assert_eq!(w.bus().regs[FSTAT], FSTAT_CCIF);

        assert_eq!(w.program(0x100, 0x1), Ok(()));
    }

    #[test]
    fn test_command_object_loaded() {
        let mut w = writer(MockController::new());

        assert_eq!(w.program(0x0000_0000, 0xA5A5_A5A5), Ok(()));

        let regs = &w.bus().regs;
        assert_eq!(regs[FCCOB0], CMD_PROGRAM_LONGWORD);
        assert_eq!([regs[FCCOB1], regs[FCCOB2], regs[FCCOB3]], [0x00, 0x00, 0x00]);
        assert_eq!(
            [regs[FCCOB4], regs[FCCOB5], regs[FCCOB6], regs[FCCOB7]],
            [0xA5, 0xA5, 0xA5, 0xA5]
        );
        assert_eq!(w.bus().writes().last(), Some(&(FSTAT, FSTAT_CCIF)));
    }

    #[test]
    fn test_byte_lanes_low_to_high() {
        let mut w = writer(MockController::new());

        assert_eq!(w.program(0x0001_2344, 0x1122_3344), Ok(()));

        let regs = &w.bus().regs;
        // Address bits 0-7, 8-15, 16-23
        assert_eq!(regs[FCCOB1], 0x44);
        assert_eq!(regs[FCCOB2], 0x23);
        assert_eq!(regs[FCCOB3], 0x01);
        // Data bits 0-7 .. 24-31
        assert_eq!(regs[FCCOB4], 0x44);
        assert_eq!(regs[FCCOB5], 0x33);
        assert_eq!(regs[FCCOB6], 0x22);
        assert_eq!(regs[FCCOB7], 0x11);
    }

    #[test]
    fn test_launch_follows_command_object() {
        let mut w = writer(MockController::new());

        assert_eq!(w.program(0x200, 0xDEAD_BEEF), Ok(()));

        let writes = w.bus().writes();
        assert_eq!(writes.len(), 9);
        assert_eq!(writes[0], (FCCOB0, CMD_PROGRAM_LONGWORD));
        assert!(writes[..8].iter().all(|(off, _)| is_command_object(*off)));
        assert_eq!(writes[8], (FSTAT, FSTAT_CCIF));
    }

    #[test]
    fn test_waits_for_idle_before_loading() {
        let mut mock = MockController::new();
        mock.busy_reads = 3;
        let mut w = writer(mock);

        assert_eq!(w.program(0x200, 0), Ok(()));

        let log = &w.bus().log;
        let first_write = log
            .iter()
            .position(|a| matches!(a, Access::Write(..)))
            .unwrap();
        // 3 busy polls, 1 idle poll, 1 status inspection
        assert_eq!(
            log[..first_write]
                .iter()
                .filter(|a| matches!(a, Access::Read(FSTAT)))
                .count(),
            5
        );
        assert_eq!(w.bus().delayed(), 3 * DEFAULT_POLL_INTERVAL_US);
    }

    #[test]
    fn test_timeout_on_stuck_controller() {
        let mut mock = MockController::new();
        mock.stuck = true;
        let config = WriterConfig {
            timeout_us: 100,
            poll_interval_us: 10,
            ..Default::default()
        };
        let mut w = FlashWriter::with_config(mock, FlashGeometry::KL25Z, config);

        assert_eq!(w.program(0x200, 0), Err(Error::Timeout));
        assert!(w.bus().writes().is_empty());
        assert_eq!(w.bus().delayed(), 100);
        assert_eq!(w.bus().reads(), 11);
    }

    #[test]
    fn test_timeout_interval_not_multiple() {
        let mut mock = MockController::new();
        mock.stuck = true;
        let config = WriterConfig {
            timeout_us: 25,
            poll_interval_us: 10,
            ..Default::default()
        };
        let mut w = FlashWriter::with_config(mock, FlashGeometry::KL25Z, config);

        assert_eq!(w.wait_idle(), Err(Error::Timeout));
        assert_eq!(w.bus().delayed(), 25);
    }

    #[test]
    fn test_wait_for_completion_reports_new_fault() {
        let mut mock = MockController::new();
        mock.fault_on_launch = FSTAT_FPVIOL;
        let config = WriterConfig {
            completion: CompletionMode::WaitForCompletion,
            ..Default::default()
        };
        let mut w = FlashWriter::with_config(mock, FlashGeometry::KL25Z, config);

        assert_eq!(w.program(0x200, 0), Err(Error::ProtectionViolation));
        assert_eq!(w.bus().regs[FSTAT], FSTAT_CCIF);
        assert_eq!(w.bus().writes().last(), Some(&(FSTAT, FSTAT_FPVIOL)));
    }

    #[test]
    fn test_wait_for_completion_reports_mgstat0() {
        let mut mock = MockController::new();
        mock.fault_on_launch = FSTAT_MGSTAT0;
        let config = WriterConfig {
            completion: CompletionMode::WaitForCompletion,
            ..Default::default()
        };
        let mut w = FlashWriter::with_config(mock, FlashGeometry::KL25Z, config);

        assert_eq!(w.program(0x200, 0), Err(Error::CommandFailed));
    }

    #[test]
    fn test_launch_only_defers_fault_to_next_call() {
        let mut mock = MockController::new();
        mock.fault_on_launch = FSTAT_ACCERR;
        let mut w = writer(mock);

        assert_eq!(w.program(0x200, 0), Ok(()));

        w.bus_mut().fault_on_launch = 0;
        assert_eq!(w.program(0x204, 0), Err(Error::AccessError));
        assert_eq!(w.program(0x204, 0), Ok(()));
    }

    static POLLS: AtomicU32 = AtomicU32::new(0);

    fn count_poll() {
        POLLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_config_callback_runs_per_poll() {
        let mut mock = MockController::new();
        mock.busy_reads = 2;
        let flash = FlashConfig {
            callback: Some(count_poll),
            ..FlashConfig::KL25Z
        };
        let mut w =
            FlashWriter::from_flash_config(mock, &flash, WriterConfig::default()).unwrap();

        assert_eq!(w.program(0x200, 0), Ok(()));
        assert_eq!(POLLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_flash_config_rejects_bad_geometry() {
        let flash = FlashConfig {
            pflash_size: 0,
            ..FlashConfig::KL25Z
        };
        let result =
            FlashWriter::from_flash_config(MockController::new(), &flash, WriterConfig::default());
        assert!(matches!(result, Err(Error::InvalidGeometry)));
    }

    #[test]
    fn test_request_from_ptr() {
        let word = 0u32;
        let req = ProgramRequest::from_ptr(&word, 7);
        assert!(req.address.is_some());
        assert_eq!(req.data, 7);
        assert_eq!(ProgramRequest::from_ptr(core::ptr::null(), 7).address, None);
    }
}
